//! Error types shared by the store ports and the workflows.

use thiserror::Error;

use wareflow_core::DomainError;

use crate::saga::{AssignmentReport, CancellationReport};

/// Store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, uniqueness) as
/// opposed to domain errors. Lookups never fail on absence; they return `None`.
///
/// ## Error Categories
///
/// - **Concurrency**: a conditional write lost against a newer version
/// - **Duplicate**: a unique key (id, document number, plate) already exists
/// - **Missing**: an update targeted a row that was never inserted
/// - **Backend**: anything else the adapter could not do (including lock poisoning)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("row not found: {0}")]
    Missing(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Backend("lock poisoned".to_string())
    }
}

/// Workflow error returned by every [`Engine`](crate::Engine) operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule rejection (deterministic, user-actionable).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence failure that is not a business conflict.
    #[error(transparent)]
    Store(StoreError),

    /// A multi-entity write sequence stopped midway; the report says where.
    #[error("route assignment partially applied: {0}")]
    PartiallyApplied(Box<AssignmentReport>),

    /// The order is cancelled but some reserved units were not returned.
    #[error("order cancellation partially applied: {0}")]
    ReturnsPending(Box<CancellationReport>),
}

impl EngineError {
    /// The domain error behind this failure, if it is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            EngineError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => EngineError::Domain(DomainError::Conflict(msg)),
            StoreError::Missing(what) => EngineError::Domain(DomainError::NotFound(what)),
            other => EngineError::Store(other),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_conditional_write_is_a_conflict() {
        let err: EngineError = StoreError::Concurrency("vehicle v1".into()).into();
        assert!(matches!(err.domain(), Some(DomainError::Conflict(_))));
    }

    #[test]
    fn backend_failures_stay_store_errors() {
        let err: EngineError = StoreError::poisoned().into();
        assert!(matches!(err, EngineError::Store(StoreError::Backend(_))));
        assert!(err.domain().is_none());
    }
}
