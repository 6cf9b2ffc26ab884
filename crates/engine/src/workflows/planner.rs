//! Outbound order planning: FEFO reservation, load metrics and the order
//! lifecycle up to dispatch.
//!
//! ## Reservation
//!
//! ```text
//! requested lines
//!   ↓
//! 1. first-fit against a local FEFO copy per product (decremented as lines
//!    claim units, so two lines never count the same units twice)
//!   ↓
//! 2. plan + insert the DRAFT order under a fresh ORD- number
//!   ↓
//! 3. take each reserved line's units with an OUT movement (version-guarded)
//!   ↓  a line whose lot moved underneath is downgraded, never fails the order
//! 4. persist the downgrades
//! ```

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use wareflow_catalog::{CustomerId, ProductId};
use wareflow_core::{DomainError, DomainResult, ExpectedVersion, UserId};
use wareflow_inventory::{
    Lot, LotId, MovementContext, MovementReference, MovementType, Reservation, first_fit,
};
use wareflow_orders::{Order, OrderId, OrderLine, PlannedLine};

use crate::audit::AuditRecord;
use crate::engine::{Engine, require};
use crate::error::{EngineError, EngineResult, StoreError};
use crate::numbering::DocumentKind;
use crate::saga::{CancellationReport, PendingReturn};
use crate::store::LotWrite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub customer_id: CustomerId,
    pub lines: Vec<RequestedLine>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Lifecycle command on one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCommand {
    pub order_id: OrderId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Engine {
    /// Build a DRAFT order, reserving FEFO lots where a single lot can cover a
    /// line. Reservation shortfalls never block creation.
    pub fn create_order(&self, cmd: CreateOrder) -> EngineResult<Order> {
        let customer = require(
            self.stores.catalog.customer(cmd.customer_id)?,
            "customer",
            cmd.customer_id,
        )?;
        if !customer.can_transact() {
            return Err(DomainError::conflict(format!("customer {} is inactive", customer.id)).into());
        }
        if let Some(idx) = cmd.lines.iter().position(|l| l.quantity <= 0) {
            return Err(DomainError::validation(format!(
                "line {}: quantity must be positive",
                idx + 1
            ))
            .into());
        }

        let mut pools: HashMap<ProductId, Vec<Lot>> = HashMap::new();
        let mut planned = Vec::with_capacity(cmd.lines.len());
        for requested in &cmd.lines {
            let product = require(
                self.stores.catalog.product(requested.product_id)?,
                "product",
                requested.product_id,
            )?;
            let pool = match pools.entry(product.id) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    e.insert(self.stores.inventory.find_lots_fefo(product.id)?)
                }
            };
            let reservation = first_fit(pool, requested.quantity);
            match reservation {
                Reservation::Reserved { lot_id } => {
                    if let Some(lot) = pool.iter_mut().find(|lot| lot.id == lot_id) {
                        lot.quantity -= requested.quantity;
                    }
                }
                _ => warn!(
                    product_id = %product.id,
                    requested = requested.quantity,
                    ?reservation,
                    "order line left unreserved"
                ),
            }
            planned.push(PlannedLine {
                product,
                quantity: requested.quantity,
                reservation,
            });
        }

        let id = OrderId::generate();
        let order = self.insert_numbered(DocumentKind::Order, cmd.occurred_at.date_naive(), |number| {
            let order = Order::plan(
                id,
                number,
                &customer,
                planned.clone(),
                self.config.heavy_item_threshold_kg,
                cmd.actor,
                cmd.occurred_at,
            )?;
            Ok(self.stores.orders.insert_order(order)?)
        })?;

        let order = self.take_reserved_stock(order, cmd.actor, cmd.occurred_at)?;

        self.audit(
            AuditRecord::new(cmd.actor, "CREATE_ORDER", "order", order.id, cmd.occurred_at)
                .after(&order),
        );
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            lines = order.lines.len(),
            reserved = order.reserved_lots().count(),
            total_volume_m3 = order.total_volume_m3,
            suggested_vehicle = order.suggested_vehicle.as_str(),
            loading_efficiency = order.loading_efficiency,
            multi_brand = order.brands_mixed(),
            "order created"
        );
        Ok(order)
    }

    pub fn order(&self, order_id: OrderId) -> EngineResult<Order> {
        require(self.stores.orders.order(order_id)?, "order", order_id)
    }

    /// DRAFT -> CONFIRMED.
    pub fn confirm_order(&self, cmd: OrderCommand) -> EngineResult<Order> {
        self.advance_order(cmd, "CONFIRM_ORDER", Order::confirm)
    }

    /// CONFIRMED -> PREPARING.
    pub fn start_preparation(&self, cmd: OrderCommand) -> EngineResult<Order> {
        self.advance_order(cmd, "START_PREPARATION", Order::start_preparation)
    }

    /// PREPARING -> READY.
    pub fn mark_ready(&self, cmd: OrderCommand) -> EngineResult<Order> {
        self.advance_order(cmd, "MARK_READY", Order::mark_ready)
    }

    /// Cancel before dispatch and put reserved units back on their lots.
    ///
    /// The order row is written first: its version guard is what stops two
    /// concurrent cancellations from returning the same units twice. Units
    /// that still cannot be returned come back as
    /// [`EngineError::ReturnsPending`].
    pub fn cancel_order(&self, cmd: OrderCommand) -> EngineResult<Order> {
        let mut order = self.order(cmd.order_id)?;
        let before = order.status;
        let expected = ExpectedVersion::Exact(order.version);
        let released = order.cancel(cmd.occurred_at)?;
        let order = self.stores.orders.update_order(order, expected)?;

        // Lines sharing a lot go back as one movement.
        let mut per_lot: BTreeMap<LotId, i64> = BTreeMap::new();
        for (lot_id, quantity) in released {
            *per_lot.entry(lot_id).or_default() += quantity;
        }
        let returned = self.return_stock(&order, &per_lot, cmd.actor, cmd.occurred_at)?;

        self.audit(
            AuditRecord::new(cmd.actor, "CANCEL_ORDER", "order", order.id, cmd.occurred_at)
                .before(&before)
                .after(&order.status),
        );
        info!(order_id = %order.id, lots_returned = returned, "order cancelled");
        Ok(order)
    }

    /// CONFIRMED / PREPARING orders older than the threshold (config default
    /// when `None`), oldest first.
    pub fn find_stuck_orders(
        &self,
        threshold_hours: Option<i64>,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Order>> {
        let hours = threshold_hours.unwrap_or(self.config.stuck_order_threshold_hours);
        if hours <= 0 {
            return Err(DomainError::validation("threshold must be a positive number of hours").into());
        }
        Ok(self.stores.orders.find_stuck_orders(hours, now)?)
    }

    fn advance_order(
        &self,
        cmd: OrderCommand,
        action: &'static str,
        step: impl FnOnce(&mut Order, DateTime<Utc>) -> DomainResult<()>,
    ) -> EngineResult<Order> {
        let mut order = self.order(cmd.order_id)?;
        let before = order.status;
        let expected = ExpectedVersion::Exact(order.version);
        step(&mut order, cmd.occurred_at)?;
        let order = self.stores.orders.update_order(order, expected)?;

        self.audit(
            AuditRecord::new(cmd.actor, action, "order", order.id, cmd.occurred_at)
                .before(&before)
                .after(&order.status),
        );
        info!(order_id = %order.id, from = ?before, to = ?order.status, "order advanced");
        Ok(order)
    }

    /// Write RETURN movements for `per_lot`, re-reading the lots each time a
    /// version check is lost. Returns the number of lots written.
    fn return_stock(
        &self,
        order: &Order,
        per_lot: &BTreeMap<LotId, i64>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> EngineResult<usize> {
        if per_lot.is_empty() {
            return Ok(0);
        }
        let attempts = self.config.stock_write_attempts.max(1);
        let mut attempt = 0;
        let failure = loop {
            attempt += 1;
            let writes = match self.return_writes(order, per_lot, actor, occurred_at) {
                Ok(writes) if writes.is_empty() => return Ok(0),
                Ok(writes) => writes,
                Err(err) => break err.to_string(),
            };
            let count = writes.len();
            match self.stores.inventory.write_lots(writes) {
                Ok(_) => return Ok(count),
                Err(StoreError::Concurrency(msg)) if attempt < attempts => {
                    debug!(order_id = %order.id, attempt, %msg, "lot moved under a stock return, retrying");
                }
                Err(err) => break err.to_string(),
            }
        };

        let report = CancellationReport {
            order_id: order.id,
            attempts: attempt,
            pending: per_lot
                .iter()
                .map(|(&lot_id, &quantity)| PendingReturn { lot_id, quantity })
                .collect(),
            failure,
        };
        error!(%report, "cancelled order kept its stock");
        Err(EngineError::ReturnsPending(Box::new(report)))
    }

    fn return_writes(
        &self,
        order: &Order,
        per_lot: &BTreeMap<LotId, i64>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> EngineResult<Vec<LotWrite>> {
        let mut writes = Vec::with_capacity(per_lot.len());
        for (&lot_id, &quantity) in per_lot {
            let Some(mut lot) = self.stores.inventory.lot(lot_id)? else {
                warn!(order_id = %order.id, %lot_id, "reserved lot vanished; units not returned");
                continue;
            };
            let ctx = MovementContext::new(actor, occurred_at)
                .with_reference(MovementReference::Order(order.id.0))
                .with_reason("order cancelled");
            let movement = lot.apply_movement(MovementType::Return, quantity, ctx)?;
            writes.push(LotWrite::guarded(lot, Some(movement)));
        }
        Ok(writes)
    }

    /// Consume every reserved line; downgrade the ones whose lot can no
    /// longer cover them.
    fn take_reserved_stock(
        &self,
        mut order: Order,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> EngineResult<Order> {
        let reserved: Vec<OrderLine> = order
            .lines
            .iter()
            .filter(|line| line.reservation.is_reserved())
            .cloned()
            .collect();

        let mut downgraded = false;
        for line in reserved {
            let Some(lot_id) = line.lot_id() else { continue };
            let ctx = MovementContext::new(actor, occurred_at)
                .with_reference(MovementReference::Order(order.id.0));
            if let Err(err) = self.take_from_lot(lot_id, line.quantity, ctx) {
                let best = self
                    .stores
                    .inventory
                    .find_lots_fefo(line.product_id)?
                    .iter()
                    .map(|lot| lot.quantity)
                    .max()
                    .unwrap_or(0);
                warn!(
                    order_id = %order.id,
                    line_no = line.line_no,
                    %lot_id,
                    error = %err,
                    "reserved lot could not be taken; line unreserved"
                );
                order.unreserve_line(line.line_no, best)?;
                downgraded = true;
            }
        }

        if downgraded {
            let expected = ExpectedVersion::Exact(order.version);
            order = self.stores.orders.update_order(order, expected)?;
        }
        Ok(order)
    }

    fn take_from_lot(
        &self,
        lot_id: LotId,
        quantity: i64,
        ctx: MovementContext,
    ) -> EngineResult<()> {
        let mut lot = require(self.stores.inventory.lot(lot_id)?, "lot", lot_id)?;
        if !lot.is_allocatable() {
            return Err(EngineError::Domain(DomainError::conflict(format!(
                "lot {} is {:?}",
                lot.lot_number, lot.status
            ))));
        }
        let movement = lot.apply_movement(MovementType::Out, -quantity, ctx)?;
        self.stores
            .inventory
            .write_lot(LotWrite::guarded(lot, Some(movement)))?;
        Ok(())
    }
}
