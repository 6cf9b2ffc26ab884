use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_catalog::ProductId;
use wareflow_core::{DomainError, DomainResult, Entity, UserId};
use wareflow_inventory::{LotId, LotStatus, NewLot};

use crate::order::ProductCondition;

wareflow_core::typed_id!(
    /// Customer return identifier.
    ReturnId
);

/// Location returned goods are held in until inspected.
pub const QUARANTINE_LOCATION: &str = "QUARANTINE";

/// Where returned goods end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnDisposition {
    Quarantine,
    Scrapped,
}

/// Goods sent back by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerReturn {
    pub id: ReturnId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub condition: ProductCondition,
    pub disposition: ReturnDisposition,
    pub reason: String,
    pub evidence_ref: Option<String>,
    /// Quarantine lot opened for the goods, if any.
    pub lot_id: Option<LotId>,
    pub registered_by: UserId,
    pub registered_at: DateTime<Utc>,
}

impl CustomerReturn {
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        id: ReturnId,
        product_id: ProductId,
        quantity: i64,
        condition: ProductCondition,
        reason: &str,
        evidence_ref: Option<String>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("return quantity must be positive"));
        }
        if reason.trim().is_empty() {
            return Err(DomainError::validation("return reason cannot be empty"));
        }
        let disposition = match condition {
            ProductCondition::Scrap => ReturnDisposition::Scrapped,
            ProductCondition::Fit | ProductCondition::Quarantine => ReturnDisposition::Quarantine,
        };
        Ok(Self {
            id,
            product_id,
            quantity,
            condition,
            disposition,
            reason: reason.trim().to_string(),
            evidence_ref: evidence_ref.filter(|e| !e.trim().is_empty()),
            lot_id: None,
            registered_by: actor,
            registered_at: occurred_at,
        })
    }

    /// Lot to open for quarantined goods; `None` for scrap.
    pub fn quarantine_lot(&self) -> Option<NewLot> {
        (self.disposition == ReturnDisposition::Quarantine).then(|| NewLot {
            product_id: self.product_id,
            lot_number: format!(
                "RET-{}-{}",
                self.registered_at.format("%Y%m%d"),
                short_id(&self.id)
            ),
            expiration_date: None,
            location: QUARANTINE_LOCATION.to_string(),
            status: LotStatus::Quarantine,
        })
    }
}

impl Entity for CustomerReturn {
    type Id = ReturnId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn short_id(id: &ReturnId) -> String {
    let simple = id.0.as_uuid().simple().to_string();
    simple[simple.len() - 6..].to_uppercase()
}
