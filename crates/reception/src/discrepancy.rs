use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_catalog::ProductId;
use wareflow_core::{DomainError, DomainResult, Entity, UserId};

use crate::order::{ReceptionLine, ReceptionLineId, ReceptionOrderId};

wareflow_core::typed_id!(
    /// Discrepancy identifier.
    DiscrepancyId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyStatus {
    Detected,
    InReview,
    Resolved,
    Accepted,
}

impl DiscrepancyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscrepancyStatus::Resolved | DiscrepancyStatus::Accepted)
    }
}

/// Mismatch between expected and counted quantity on one reception line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: DiscrepancyId,
    pub reception_order_id: ReceptionOrderId,
    pub line_id: ReceptionLineId,
    pub product_id: ProductId,
    pub expected_quantity: i64,
    pub counted_quantity: i64,
    /// counted - expected.
    pub difference: i64,
    pub status: DiscrepancyStatus,
    pub resolution_notes: Option<String>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Discrepancy {
    pub(crate) fn detect(
        id: DiscrepancyId,
        reception_order_id: ReceptionOrderId,
        line: &ReceptionLine,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let counted = line.counted_quantity.unwrap_or_default();
        Self {
            id,
            reception_order_id,
            line_id: line.id,
            product_id: line.product_id,
            expected_quantity: line.expected_quantity,
            counted_quantity: counted,
            difference: counted - line.expected_quantity,
            status: DiscrepancyStatus::Detected,
            resolution_notes: None,
            resolved_by: None,
            resolved_at: None,
            created_at: occurred_at,
        }
    }

    /// DETECTED -> IN_REVIEW -> RESOLVED | ACCEPTED. Terminal states are frozen.
    pub fn resolve(
        &mut self,
        status: DiscrepancyStatus,
        notes: impl Into<String>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "discrepancy {} is already {:?}",
                self.id, self.status
            )));
        }
        match status {
            DiscrepancyStatus::Detected => {
                return Err(DomainError::validation(
                    "a discrepancy cannot be moved back to DETECTED",
                ));
            }
            DiscrepancyStatus::InReview if self.status == DiscrepancyStatus::InReview => {
                return Err(DomainError::conflict(format!(
                    "discrepancy {} is already in review",
                    self.id
                )));
            }
            _ => {}
        }

        let notes = notes.into();
        if !notes.trim().is_empty() {
            self.resolution_notes = Some(notes.trim().to_string());
        }
        self.status = status;
        if status.is_terminal() {
            self.resolved_by = Some(actor);
            self.resolved_at = Some(occurred_at);
        }
        Ok(())
    }
}

impl Entity for Discrepancy {
    type Id = DiscrepancyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ProductCondition;

    fn detected() -> Discrepancy {
        let line = ReceptionLine {
            id: ReceptionLineId::generate(),
            product_id: ProductId::generate(),
            expected_quantity: 12,
            counted_quantity: Some(15),
            lot_number: "L1".into(),
            expiration_date: None,
            location: "RECEIVING".into(),
            condition: ProductCondition::Fit,
            counted_by: None,
            counted_at: None,
        };
        Discrepancy::detect(
            DiscrepancyId::generate(),
            ReceptionOrderId::generate(),
            &line,
            Utc::now(),
        )
    }

    #[test]
    fn surplus_has_positive_difference() {
        assert_eq!(detected().difference, 3);
    }

    #[test]
    fn review_then_resolve_stamps_resolver() {
        let mut d = detected();
        let who = UserId::new();
        d.resolve(DiscrepancyStatus::InReview, "", who, Utc::now()).unwrap();
        assert!(d.resolved_by.is_none());
        d.resolve(DiscrepancyStatus::Resolved, "supplier credited", who, Utc::now())
            .unwrap();
        assert_eq!(d.resolved_by, Some(who));
        assert_eq!(d.resolution_notes.as_deref(), Some("supplier credited"));
    }

    #[test]
    fn terminal_states_are_frozen() {
        let mut d = detected();
        d.resolve(DiscrepancyStatus::Accepted, "ok", UserId::new(), Utc::now())
            .unwrap();
        let err = d
            .resolve(DiscrepancyStatus::Resolved, "again", UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
