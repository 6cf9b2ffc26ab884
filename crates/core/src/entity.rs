//! Entity traits: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Entity whose rows are guarded by optimistic concurrency.
///
/// Stores bump the version on every successful write; callers pass the version
/// they read back as an [`ExpectedVersion`](crate::ExpectedVersion) so that two
/// writers racing on the same row cannot both win.
pub trait Versioned: Entity {
    fn version(&self) -> u64;
}
