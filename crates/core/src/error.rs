//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is recoverable at the caller boundary and maps to a distinct,
/// user-actionable message. Infrastructure concerns (storage, locks) belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed or missing required input (e.g. missing evidence reference).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity is not in the state required by the requested transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A lot does not hold enough units for the requested decrement.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// No vehicle or driver satisfies the availability predicate.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// A pre-departure safety gate failed.
    #[error("safety violation: {0}")]
    SafetyViolation(String),

    /// A child entity was submitted under a parent it does not belong to.
    #[error("ownership mismatch: {0}")]
    Ownership(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: impl core::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id}"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_stock(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    pub fn safety(msg: impl Into<String>) -> Self {
        Self::SafetyViolation(msg.into())
    }

    pub fn ownership(msg: impl Into<String>) -> Self {
        Self::Ownership(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Stable machine-readable code for adapters (HTTP, CLI) to switch on.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::Validation(_) => "validation_error",
            DomainError::Conflict(_) => "conflict",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::ResourceUnavailable(_) => "resource_unavailable",
            DomainError::SafetyViolation(_) => "safety_violation",
            DomainError::Ownership(_) => "ownership_mismatch",
            DomainError::InvalidId(_) => "invalid_id",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_missing_entity() {
        let err = DomainError::not_found("supplier", "abc");
        assert_eq!(err.to_string(), "not found: supplier abc");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn insufficient_stock_reports_both_quantities() {
        let err = DomainError::insufficient_stock(12, 7);
        assert_eq!(
            err.to_string(),
            "insufficient stock: requested 12, available 7"
        );
    }
}
