//! Fulfillment engine: the workflows that tie the domain crates together.
//!
//! The domain crates hold the rules; this crate sequences them against
//! injected store ports, records audit entries and logs outcomes.
//!
//! ```text
//! reception ─► lots (IN) ─► order planner (FEFO, OUT) ─► route assignment
//!                 ▲                                          │
//!        ledger: damage, expiry, cycle counts        fleet: maintenance,
//!                                                    pre-departure gate
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod numbering;
pub mod saga;
pub mod store;
pub mod workflows;

pub use audit::{AuditError, AuditRecord, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, Stores};
pub use error::{EngineError, EngineResult, StoreError};
pub use numbering::DocumentKind;
pub use saga::{AssignmentReport, AssignmentStep, CancellationReport, PendingReturn};
pub use workflows::*;
