//! Optimistic concurrency guard for conditional store writes.

use crate::error::{DomainError, DomainResult};

/// Version expectation attached to a conditional update.
///
/// Read-modify-write sequences (claiming a vehicle, decrementing a lot) must
/// carry the version observed at read time. A store that sees a different
/// current version rejects the write instead of silently overwriting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (seeding reference data, migrations).
    Any,
    /// Require the row to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
