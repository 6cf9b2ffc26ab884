//! Inventory ledger: damage write-offs, FEFO reads, stock views, expiration
//! sweep and cycle counts.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use wareflow_catalog::{Brand, ProductId};
use wareflow_core::{DomainError, ExpectedVersion, UserId};
use wareflow_inventory::{
    CycleCount, CycleCountId, FefoLotView, Lot, LotId, Movement, MovementContext,
    MovementReference, MovementType, StockLevel, fefo_view, plan_variance_adjustment,
    sample_products,
};

use crate::audit::AuditRecord;
use crate::engine::{Engine, require};
use crate::error::{EngineError, EngineResult, StoreError};
use crate::store::{LotWrite, ProductFilter};

/// Location recorded on a cycle count for a product with no lots yet.
pub const UNASSIGNED_LOCATION: &str = "UNASSIGNED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDamage {
    pub lot_id: LotId,
    pub quantity: i64,
    pub reason: String,
    pub evidence_ref: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFilter {
    pub brand: Option<Brand>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireLots {
    pub as_of: NaiveDate,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateCycleCounts {
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformCycleCount {
    pub count_id: CycleCountId,
    pub counted_quantity: i64,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleCountOutcome {
    pub count: CycleCount,
    /// ADJUST movements written for the variance; empty when it was zero.
    pub adjustments: Vec<Movement>,
}

impl Engine {
    /// Write off damaged units. The evidence reference is mandatory.
    pub fn register_damage(&self, cmd: RegisterDamage) -> EngineResult<Movement> {
        if cmd.evidence_ref.trim().is_empty() {
            return Err(DomainError::validation(
                "evidence reference is required to register damage",
            )
            .into());
        }
        let mut lot = require(self.stores.inventory.lot(cmd.lot_id)?, "lot", cmd.lot_id)?;
        let ctx = MovementContext::new(cmd.actor, cmd.occurred_at)
            .with_reference(MovementReference::DamageReport(cmd.evidence_ref.trim().to_string()));
        let movement = lot.register_damage(cmd.quantity, &cmd.reason, &cmd.evidence_ref, ctx)?;
        let lot = self
            .stores
            .inventory
            .write_lot(LotWrite::guarded(lot, Some(movement.clone())))?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "REGISTER_DAMAGE",
                "lot",
                lot.id,
                cmd.occurred_at,
            )
            .after(&movement),
        );
        info!(
            lot_id = %lot.id,
            quantity = cmd.quantity,
            remaining = lot.quantity,
            "damage registered"
        );
        Ok(movement)
    }

    /// Allocatable lots of a product in FEFO order.
    pub fn find_available_lots_fefo(&self, product_id: ProductId) -> EngineResult<Vec<Lot>> {
        Ok(self.stores.inventory.find_lots_fefo(product_id)?)
    }

    /// FEFO list annotated with days-until-expiry and an alert level.
    pub fn fefo_lots(
        &self,
        product_id: ProductId,
        today: NaiveDate,
    ) -> EngineResult<Vec<FefoLotView>> {
        require(
            self.stores.catalog.product(product_id)?,
            "product",
            product_id,
        )?;
        let lots = self.stores.inventory.lots_by_product(product_id)?;
        Ok(fefo_view(lots, today, &self.config.stock_thresholds()))
    }

    /// Per-product stock summary for active products, ordered by SKU.
    pub fn stock_levels(
        &self,
        filter: &StockFilter,
        today: NaiveDate,
    ) -> EngineResult<Vec<StockLevel>> {
        let products = self.stores.catalog.list_products(&ProductFilter {
            brand: filter.brand.clone(),
            category: filter.category.clone(),
            active_only: true,
        })?;
        let thresholds = self.config.stock_thresholds();
        products
            .iter()
            .map(|product| -> EngineResult<StockLevel> {
                let lots = self.stores.inventory.lots_by_product(product.id)?;
                Ok(StockLevel::summarize(product, &lots, today, &thresholds))
            })
            .collect()
    }

    /// A lot's movement ledger, oldest first.
    pub fn lot_movements(&self, lot_id: LotId) -> EngineResult<Vec<Movement>> {
        require(self.stores.inventory.lot(lot_id)?, "lot", lot_id)?;
        Ok(self.stores.inventory.movements_for_lot(lot_id)?)
    }

    /// Flag AVAILABLE lots dated before `as_of` as EXPIRED.
    pub fn expire_lots(&self, cmd: ExpireLots) -> EngineResult<Vec<Lot>> {
        let writes: Vec<LotWrite> = self
            .stores
            .inventory
            .list_lots()?
            .into_iter()
            .filter_map(|mut lot| lot.expire_if_due(cmd.as_of).then(|| LotWrite::guarded(lot, None)))
            .collect();
        if writes.is_empty() {
            debug!(as_of = %cmd.as_of, "no lots due to expire");
            return Ok(Vec::new());
        }
        let expired = self.stores.inventory.write_lots(writes)?;

        for lot in &expired {
            self.audit(
                AuditRecord::new(cmd.actor, "EXPIRE_LOT", "lot", lot.id, cmd.occurred_at)
                    .after(&lot.status),
            );
        }
        info!(as_of = %cmd.as_of, expired = expired.len(), "expiration sweep done");
        Ok(expired)
    }

    /// Schedule today's cycle counts for a random sample of active products.
    ///
    /// Production callers pass `wareflow_inventory::seeded_rng(cmd.occurred_at)`.
    pub fn generate_daily_cycle_counts<R: Rng + ?Sized>(
        &self,
        cmd: GenerateCycleCounts,
        rng: &mut R,
    ) -> EngineResult<Vec<CycleCount>> {
        let candidates: Vec<ProductId> = self
            .stores
            .catalog
            .list_products(&ProductFilter::active())?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let picked = sample_products(&candidates, self.config.cycle_count_sample_size, rng);

        let mut counts = Vec::with_capacity(picked.len());
        for product_id in picked {
            let lots = self.stores.inventory.lots_by_product(product_id)?;
            let location = lots
                .iter()
                .find(|lot| lot.status.counts_as_stock())
                .or(lots.first())
                .map_or_else(|| UNASSIGNED_LOCATION.to_string(), |lot| lot.location.clone());
            let expected = self.stores.inventory.aggregate_stock(product_id)?;
            let count = CycleCount::schedule(
                CycleCountId::generate(),
                product_id,
                location,
                expected,
                cmd.occurred_at,
            );
            counts.push(self.stores.inventory.insert_cycle_count(count)?);
        }

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "GENERATE_CYCLE_COUNTS",
                "cycle_count",
                cmd.occurred_at.date_naive(),
                cmd.occurred_at,
            )
            .after(&counts.iter().map(|c| c.id).collect::<Vec<_>>()),
        );
        info!(
            candidates = candidates.len(),
            scheduled = counts.len(),
            "daily cycle counts generated"
        );
        Ok(counts)
    }

    /// Record a physical count and book the variance as ADJUST movements.
    ///
    /// The variance lands on the product's stock-bearing lots in creation
    /// order (not FEFO): a surplus on the first lot, a shortage drained from
    /// the first lot onward. The count is claimed (PENDING -> COMPLETED,
    /// version-guarded) before any lot is written, so only one caller books
    /// the variance. If the adjustment cannot land, the claim is released and
    /// the count is PENDING again.
    pub fn perform_cycle_count(&self, cmd: PerformCycleCount) -> EngineResult<CycleCountOutcome> {
        let pending = require(
            self.stores.inventory.cycle_count(cmd.count_id)?,
            "cycle count",
            cmd.count_id,
        )?;
        let mut count = pending.clone();
        let variance = count.perform(cmd.counted_quantity, cmd.actor, cmd.occurred_at)?;
        let count = self
            .stores
            .inventory
            .update_cycle_count(count, ExpectedVersion::Exact(pending.version))?;

        let adjustments = match self.book_variance(&count, variance, cmd.actor, cmd.occurred_at) {
            Ok(adjustments) => adjustments,
            Err(err) => {
                self.reopen_cycle_count(pending, &count, &err);
                return Err(err);
            }
        };

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "PERFORM_CYCLE_COUNT",
                "cycle_count",
                count.id,
                cmd.occurred_at,
            )
            .after(&count),
        );
        info!(
            count_id = %count.id,
            expected = count.expected_quantity,
            counted = cmd.counted_quantity,
            variance,
            adjusted_lots = adjustments.len(),
            "cycle count performed"
        );
        Ok(CycleCountOutcome { count, adjustments })
    }

    /// Write the variance onto fresh lots, re-planning when a lot moved
    /// between the read and the write.
    fn book_variance(
        &self,
        count: &CycleCount,
        variance: i64,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> EngineResult<Vec<Movement>> {
        if variance == 0 {
            return Ok(Vec::new());
        }
        let attempts = self.config.stock_write_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let lots: Vec<Lot> = self
                .stores
                .inventory
                .lots_by_product(count.product_id)?
                .into_iter()
                .filter(|lot| lot.status.counts_as_stock())
                .collect();
            let plan = plan_variance_adjustment(&lots, variance)?;
            if plan.is_empty() {
                warn!(
                    count_id = %count.id,
                    product_id = %count.product_id,
                    variance,
                    "no stock-bearing lot to adjust; variance recorded only"
                );
                return Ok(Vec::new());
            }

            let mut writes = Vec::with_capacity(plan.len());
            for (lot_id, delta) in plan {
                let Some(mut lot) = lots.iter().find(|l| l.id == lot_id).cloned() else {
                    continue;
                };
                let ctx = MovementContext::new(actor, occurred_at)
                    .with_reference(MovementReference::CycleCount(count.id))
                    .with_reason(format!("cycle count variance {variance:+}"));
                let movement = lot.apply_movement(MovementType::Adjust, delta, ctx)?;
                writes.push(LotWrite::guarded(lot, Some(movement)));
            }
            let adjustments: Vec<Movement> =
                writes.iter().filter_map(|w| w.movement.clone()).collect();
            match self.stores.inventory.write_lots(writes) {
                Ok(_) => return Ok(adjustments),
                Err(StoreError::Concurrency(msg)) if attempt < attempts => {
                    debug!(count_id = %count.id, attempt, %msg, "lot moved under a cycle count, re-planning");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Put a claimed count back to PENDING after its adjustment failed.
    fn reopen_cycle_count(&self, pending: CycleCount, claimed: &CycleCount, cause: &EngineError) {
        let expected = ExpectedVersion::Exact(claimed.version);
        match self.stores.inventory.update_cycle_count(pending, expected) {
            Ok(_) => warn!(count_id = %claimed.id, error = %cause, "cycle count reopened"),
            Err(err) => error!(
                count_id = %claimed.id,
                error = %err,
                cause = %cause,
                "cycle count left COMPLETED without its adjustments"
            ),
        }
    }
}
