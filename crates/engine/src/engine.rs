//! The fulfillment engine: injected stores plus the workflow entry points.
//!
//! ## Operation Flow
//!
//! Every workflow method follows the same shape:
//!
//! ```text
//! Command (actor + occurred_at)
//!   ↓
//! 1. Load the rows it needs (missing → NotFound)
//!   ↓
//! 2. Apply the domain rule on owned copies (pure, may reject)
//!   ↓
//! 3. Write back through the store ports (version-guarded where it matters)
//!   ↓
//! 4. Record an audit entry (best-effort) and log the outcome
//! ```
//!
//! The engine holds no state of its own beyond its collaborators; it is
//! `Send + Sync` and can be shared behind an `Arc`.

use std::fmt::Display;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use wareflow_core::DomainError;

use crate::audit::{AuditRecord, AuditSink};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::numbering::DocumentKind;
use crate::store::{
    CatalogStore, FleetStore, InMemoryCatalogStore, InMemoryFleetStore, InMemoryInventoryStore,
    InMemoryOrderStore, InMemoryReceptionStore, InMemorySequenceStore, InventoryStore, OrderStore,
    ReceptionStore, SequenceStore,
};

/// Store ports the engine runs against.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub reception: Arc<dyn ReceptionStore>,
    pub orders: Arc<dyn OrderStore>,
    pub fleet: Arc<dyn FleetStore>,
    pub sequences: Arc<dyn SequenceStore>,
}

impl Stores {
    /// Fresh, empty in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            catalog: Arc::new(InMemoryCatalogStore::new()),
            inventory: Arc::new(InMemoryInventoryStore::new()),
            reception: Arc::new(InMemoryReceptionStore::new()),
            orders: Arc::new(InMemoryOrderStore::new()),
            fleet: Arc::new(InMemoryFleetStore::new()),
            sequences: Arc::new(InMemorySequenceStore::new()),
        }
    }
}

pub struct Engine {
    pub(crate) stores: Stores,
    audit: Arc<dyn AuditSink>,
    pub(crate) config: EngineConfig,
}

impl Engine {
    pub fn new(stores: Stores, audit: Arc<dyn AuditSink>, config: EngineConfig) -> Self {
        Self {
            stores,
            audit,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Best-effort audit write. Failures are logged and swallowed.
    pub(crate) fn audit(&self, record: AuditRecord) {
        let action = record.action.clone();
        let entity_id = record.entity_id.clone();
        if let Err(err) = self.audit.record(record) {
            warn!(%action, %entity_id, error = %err, "audit record dropped");
        }
    }

    /// Draw a document number and run `insert` with it, drawing again while
    /// the store reports the number as taken.
    pub(crate) fn insert_numbered<T>(
        &self,
        kind: DocumentKind,
        date: NaiveDate,
        mut insert: impl FnMut(String) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let attempts = self.config.number_retry_attempts.max(1);
        for attempt in 1..=attempts {
            let sequence = self.stores.sequences.next_value(kind.prefix(), date)?;
            let number = kind.format(date, sequence);
            match insert(number.clone()) {
                Err(EngineError::Store(StoreError::Duplicate(what))) => {
                    debug!(%number, attempt, %what, "document number taken, drawing again");
                }
                other => return other,
            }
        }
        Err(DomainError::conflict(format!(
            "no free {} number after {attempts} attempts",
            kind.prefix()
        ))
        .into())
    }
}

/// Turn a lookup miss into `NotFound`.
pub(crate) fn require<T>(found: Option<T>, entity: &str, id: impl Display) -> EngineResult<T> {
    found.ok_or_else(|| DomainError::not_found(entity, id).into())
}
