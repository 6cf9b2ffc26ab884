use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_catalog::ProductId;
use wareflow_core::{Entity, EntityId, UserId};

use crate::cycle_count::CycleCountId;
use crate::lot::LotId;

wareflow_core::typed_id!(
    /// Movement identifier.
    MovementId
);

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjust,
    Damage,
    Return,
    Transfer,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjust => "ADJUST",
            MovementType::Damage => "DAMAGE",
            MovementType::Return => "RETURN",
            MovementType::Transfer => "TRANSFER",
        }
    }
}

/// Entity that caused a movement.
///
/// Held as raw [`EntityId`]s for entities owned by downstream crates so the
/// ledger does not depend on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MovementReference {
    ReceptionOrder(EntityId),
    Order(EntityId),
    CycleCount(CycleCountId),
    /// Customer return; carries the return record id.
    CustomerReturn(EntityId),
    /// Damage report, identified by its evidence reference.
    DamageReport(String),
}

/// Immutable ledger entry against one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    /// Signed quantity change.
    pub delta: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub reference: Option<MovementReference>,
    pub reason: Option<String>,
    pub evidence_ref: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Context shared by every movement a command produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementContext {
    pub reference: Option<MovementReference>,
    pub reason: Option<String>,
    pub evidence_ref: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl MovementContext {
    pub fn new(actor: UserId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            reference: None,
            reason: None,
            evidence_ref: None,
            actor,
            occurred_at,
        }
    }

    pub fn with_reference(mut self, reference: MovementReference) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_evidence(mut self, evidence_ref: impl Into<String>) -> Self {
        self.evidence_ref = Some(evidence_ref.into());
        self
    }
}

/// Quantity a lot must hold given its full movement history.
pub fn replay_quantity<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> i64 {
    movements.into_iter().map(|m| m.delta).sum()
}
