use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wareflow_catalog::ProductId;
use wareflow_core::{DomainError, DomainResult, Entity, Versioned};

use crate::movement::{Movement, MovementContext, MovementId, MovementType};

wareflow_core::typed_id!(
    /// Lot identifier.
    LotId
);

/// Lot status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Available,
    Reserved,
    Blocked,
    Quarantine,
    Expired,
}

impl LotStatus {
    /// Statuses whose quantity counts toward a product's aggregate stock.
    pub fn counts_as_stock(&self) -> bool {
        matches!(self, LotStatus::Available | LotStatus::Reserved)
    }
}

/// Input for opening a lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLot {
    pub product_id: ProductId,
    pub lot_number: String,
    pub expiration_date: Option<NaiveDate>,
    pub location: String,
    pub status: LotStatus,
}

/// A dated batch of one product.
///
/// Quantity only changes through [`Lot::apply_movement`], which hands back the
/// ledger entry describing the change. Callers persist both together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub product_id: ProductId,
    pub lot_number: String,
    pub expiration_date: Option<NaiveDate>,
    pub quantity: i64,
    pub status: LotStatus,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub last_movement_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Lot {
    /// Open a lot with its first movement (IN for receptions, RETURN for
    /// customer returns).
    pub fn open(
        id: LotId,
        input: NewLot,
        quantity: i64,
        movement_type: MovementType,
        ctx: MovementContext,
    ) -> DomainResult<(Self, Movement)> {
        if input.lot_number.trim().is_empty() {
            return Err(DomainError::validation("lot_number cannot be empty"));
        }
        if quantity <= 0 {
            return Err(DomainError::validation(
                "opening quantity must be positive",
            ));
        }
        if input.status == LotStatus::Expired {
            return Err(DomainError::validation("cannot open an expired lot"));
        }

        let mut lot = Self {
            id,
            product_id: input.product_id,
            lot_number: input.lot_number.trim().to_string(),
            expiration_date: input.expiration_date,
            quantity: 0,
            status: input.status,
            location: input.location,
            created_at: ctx.occurred_at,
            last_movement_at: None,
            version: 0,
        };
        let movement = lot.apply_movement(movement_type, quantity, ctx)?;
        Ok((lot, movement))
    }

    /// Apply a signed quantity change and return the matching ledger entry.
    ///
    /// Fails with `InsufficientStock` rather than letting quantity go negative.
    pub fn apply_movement(
        &mut self,
        movement_type: MovementType,
        delta: i64,
        ctx: MovementContext,
    ) -> DomainResult<Movement> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_quantity = self.quantity + delta;
        if new_quantity < 0 {
            return Err(DomainError::insufficient_stock(-delta, self.quantity));
        }

        let movement = Movement {
            id: MovementId::generate(),
            lot_id: self.id,
            product_id: self.product_id,
            movement_type,
            delta,
            previous_quantity: self.quantity,
            new_quantity,
            reference: ctx.reference,
            reason: ctx.reason,
            evidence_ref: ctx.evidence_ref,
            actor: ctx.actor,
            occurred_at: ctx.occurred_at,
        };
        self.quantity = new_quantity;
        self.last_movement_at = Some(movement.occurred_at);
        Ok(movement)
    }

    /// Write off damaged units (merma).
    ///
    /// The evidence reference is checked before anything else.
    pub fn register_damage(
        &mut self,
        quantity: i64,
        reason: &str,
        evidence_ref: &str,
        ctx: MovementContext,
    ) -> DomainResult<Movement> {
        if evidence_ref.trim().is_empty() {
            return Err(DomainError::validation(
                "evidence reference is required to register damage",
            ));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("damage quantity must be positive"));
        }
        if reason.trim().is_empty() {
            return Err(DomainError::validation("damage reason cannot be empty"));
        }
        if self.quantity < quantity {
            return Err(DomainError::insufficient_stock(quantity, self.quantity));
        }
        let ctx = ctx.with_reason(reason.trim()).with_evidence(evidence_ref.trim());
        self.apply_movement(MovementType::Damage, -quantity, ctx)
    }

    /// Move between non-expired statuses. Expired lots stay expired.
    pub fn change_status(&mut self, status: LotStatus) -> DomainResult<()> {
        if self.status == LotStatus::Expired {
            return Err(DomainError::conflict(format!(
                "lot {} is expired",
                self.lot_number
            )));
        }
        if status == LotStatus::Expired {
            return Err(DomainError::validation(
                "lots expire through the expiration sweep",
            ));
        }
        self.status = status;
        Ok(())
    }

    /// Flag an available lot as expired when its date is before `as_of`.
    ///
    /// Returns whether the lot changed. Quantity is untouched.
    pub fn expire_if_due(&mut self, as_of: NaiveDate) -> bool {
        match self.expiration_date {
            Some(date) if self.status == LotStatus::Available && date < as_of => {
                self.status = LotStatus::Expired;
                true
            }
            _ => false,
        }
    }

    pub fn is_allocatable(&self) -> bool {
        self.status == LotStatus::Available && self.quantity > 0
    }

    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiration_date.map(|date| (date - today).num_days())
    }
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for Lot {
    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::replay_quantity;
    use proptest::prelude::*;
    use wareflow_core::UserId;

    fn ctx() -> MovementContext {
        MovementContext::new(UserId::new(), Utc::now())
    }

    fn opened(quantity: i64) -> (Lot, Movement) {
        Lot::open(
            LotId::generate(),
            NewLot {
                product_id: ProductId::generate(),
                lot_number: "L-001".to_string(),
                expiration_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                location: "A-01-02".to_string(),
                status: LotStatus::Available,
            },
            quantity,
            MovementType::In,
            ctx(),
        )
        .unwrap()
    }

    #[test]
    fn open_writes_the_first_movement() {
        let (lot, movement) = opened(40);
        assert_eq!(lot.quantity, 40);
        assert_eq!(movement.movement_type, MovementType::In);
        assert_eq!(movement.previous_quantity, 0);
        assert_eq!(movement.new_quantity, 40);
    }

    #[test]
    fn damage_without_evidence_fails_before_quantity_check() {
        let (mut lot, _) = opened(5);
        let err = lot.register_damage(500, "crushed", "  ", ctx()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(lot.quantity, 5);
    }

    #[test]
    fn damage_exceeding_quantity_fails_without_clamping() {
        let (mut lot, _) = opened(5);
        let err = lot
            .register_damage(6, "crushed", "photos/1.jpg", ctx())
            .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(6, 5));
        assert_eq!(lot.quantity, 5);
    }

    #[test]
    fn damage_writes_negative_delta() {
        let (mut lot, _) = opened(5);
        let movement = lot
            .register_damage(2, "crushed", "photos/1.jpg", ctx())
            .unwrap();
        assert_eq!(movement.delta, -2);
        assert_eq!(movement.movement_type, MovementType::Damage);
        assert_eq!(movement.evidence_ref.as_deref(), Some("photos/1.jpg"));
        assert_eq!(lot.quantity, 3);
    }

    #[test]
    fn expiry_sweep_only_touches_available_lots() {
        let (mut lot, _) = opened(5);
        assert!(!lot.expire_if_due(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()));
        assert!(lot.expire_if_due(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()));
        assert_eq!(lot.status, LotStatus::Expired);
        assert_eq!(lot.quantity, 5);
        assert!(lot.change_status(LotStatus::Available).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: quantity always equals the sum of movement deltas and never
        /// goes negative, whatever sequence of changes is attempted.
        #[test]
        fn movements_sum_to_quantity(
            opening in 1i64..500,
            deltas in prop::collection::vec(-200i64..200, 0..40),
        ) {
            let (mut lot, first) = opened(opening);
            let mut ledger = vec![first];

            for delta in deltas {
                let before = lot.quantity;
                match lot.apply_movement(MovementType::Adjust, delta, ctx()) {
                    Ok(m) => ledger.push(m),
                    Err(_) => prop_assert_eq!(lot.quantity, before),
                }
                prop_assert!(lot.quantity >= 0);
                prop_assert_eq!(replay_quantity(&ledger), lot.quantity);
            }
        }
    }
}
