use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use wareflow_catalog::ProductId;
use wareflow_core::{DomainError, DomainResult, Entity, UserId, Versioned};

use crate::lot::{Lot, LotId};

wareflow_core::typed_id!(
    /// Cycle count identifier.
    CycleCountId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleCountStatus {
    Pending,
    Completed,
}

/// Sampled physical audit of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCount {
    pub id: CycleCountId,
    pub product_id: ProductId,
    pub location: String,
    pub scheduled_date: NaiveDate,
    pub expected_quantity: i64,
    pub counted_quantity: Option<i64>,
    pub variance: Option<i64>,
    pub counted_by: Option<UserId>,
    pub counted_at: Option<DateTime<Utc>>,
    pub status: CycleCountStatus,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl CycleCount {
    pub fn schedule(
        id: CycleCountId,
        product_id: ProductId,
        location: impl Into<String>,
        expected_quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            product_id,
            location: location.into(),
            scheduled_date: occurred_at.date_naive(),
            expected_quantity,
            counted_quantity: None,
            variance: None,
            counted_by: None,
            counted_at: None,
            status: CycleCountStatus::Pending,
            created_at: occurred_at,
            version: 0,
        }
    }

    /// Record the physical count and return the variance (counted - expected).
    pub fn perform(
        &mut self,
        counted: i64,
        counter: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<i64> {
        if self.status != CycleCountStatus::Pending {
            return Err(DomainError::conflict(format!(
                "cycle count {} is already completed",
                self.id
            )));
        }
        if counted < 0 {
            return Err(DomainError::validation("counted quantity cannot be negative"));
        }
        let variance = counted - self.expected_quantity;
        self.counted_quantity = Some(counted);
        self.variance = Some(variance);
        self.counted_by = Some(counter);
        self.counted_at = Some(occurred_at);
        self.status = CycleCountStatus::Completed;
        Ok(variance)
    }
}

impl Entity for CycleCount {
    type Id = CycleCountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for CycleCount {
    fn version(&self) -> u64 {
        self.version
    }
}

/// Time-seeded generator, so two runs on different instants draw differently.
pub fn seeded_rng(occurred_at: DateTime<Utc>) -> StdRng {
    StdRng::seed_from_u64(occurred_at.timestamp_micros() as u64)
}

/// Draw up to `size` distinct products uniformly at random.
pub fn sample_products<R: Rng + ?Sized>(
    candidates: &[ProductId],
    size: usize,
    rng: &mut R,
) -> Vec<ProductId> {
    candidates.choose_multiple(rng, size).copied().collect()
}

/// Per-lot deltas that apply a cycle-count variance.
///
/// `lots` must be the product's stock-bearing lots in creation order. A surplus
/// lands entirely on the first lot; a shortage drains the first lot, then the
/// next ones, so no lot goes negative. Fails if the lots cannot absorb it.
pub fn plan_variance_adjustment(lots: &[Lot], variance: i64) -> DomainResult<Vec<(LotId, i64)>> {
    if variance == 0 {
        return Ok(Vec::new());
    }
    let Some(first) = lots.first() else {
        return Ok(Vec::new());
    };
    if variance > 0 {
        return Ok(vec![(first.id, variance)]);
    }

    let mut shortage = -variance;
    let mut plan = Vec::new();
    for lot in lots {
        if shortage == 0 {
            break;
        }
        let take = lot.quantity.min(shortage);
        if take > 0 {
            plan.push((lot.id, -take));
            shortage -= take;
        }
    }
    if shortage > 0 {
        let available: i64 = lots.iter().map(|lot| lot.quantity).sum();
        return Err(DomainError::insufficient_stock(-variance, available));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lot::LotStatus;
    use rand::rngs::mock::StepRng;

    fn count(expected: i64) -> CycleCount {
        CycleCount::schedule(
            CycleCountId::generate(),
            ProductId::generate(),
            "B-03",
            expected,
            Utc::now(),
        )
    }

    fn lot(quantity: i64) -> Lot {
        Lot {
            id: LotId::generate(),
            product_id: ProductId::generate(),
            lot_number: "L".to_string(),
            expiration_date: None,
            quantity,
            status: LotStatus::Available,
            location: "B-03".to_string(),
            created_at: Utc::now(),
            last_movement_at: None,
            version: 1,
        }
    }

    #[test]
    fn perform_computes_variance_once() {
        let mut cc = count(100);
        assert_eq!(cc.perform(94, UserId::new(), Utc::now()).unwrap(), -6);
        assert_eq!(cc.status, CycleCountStatus::Completed);
        assert!(matches!(
            cc.perform(100, UserId::new(), Utc::now()),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn sample_is_capped_by_catalog_size() {
        let products: Vec<ProductId> = (0..3).map(|_| ProductId::generate()).collect();
        let mut rng = StepRng::new(0, 1);
        let picked = sample_products(&products, 5, &mut rng);
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn same_seed_draws_the_same_sample() {
        let products: Vec<ProductId> = (0..20).map(|_| ProductId::generate()).collect();
        let at = Utc::now();
        let a = sample_products(&products, 5, &mut seeded_rng(at));
        let b = sample_products(&products, 5, &mut seeded_rng(at));
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn surplus_goes_to_first_lot() {
        let lots = vec![lot(2), lot(50)];
        let plan = plan_variance_adjustment(&lots, 7).unwrap();
        assert_eq!(plan, vec![(lots[0].id, 7)]);
    }

    #[test]
    fn shortage_spills_over_in_creation_order() {
        let lots = vec![lot(2), lot(50)];
        let plan = plan_variance_adjustment(&lots, -5).unwrap();
        assert_eq!(plan, vec![(lots[0].id, -2), (lots[1].id, -3)]);
    }

    #[test]
    fn shortage_beyond_stock_is_rejected() {
        let lots = vec![lot(2)];
        assert_eq!(
            plan_variance_adjustment(&lots, -5).unwrap_err(),
            DomainError::insufficient_stock(5, 2)
        );
    }
}
