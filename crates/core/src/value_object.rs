//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity: two package dimensions of 40×30×20 cm are the
/// same value regardless of which product they describe. They are immutable;
/// "changing" one means building a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Dimensions { length_cm: f64, width_cm: f64, height_cm: f64 }
///
/// impl ValueObject for Dimensions {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
