use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use wareflow_catalog::{Brand, Customer, CustomerId, Product, ProductId};
use wareflow_core::{DomainError, DomainResult, Entity, UserId, Versioned};
use wareflow_inventory::{LotId, Reservation};

use crate::planning::{LoadPlan, LoadingAlert, VehicleClass};

wareflow_core::typed_id!(
    /// Outbound order identifier.
    OrderId
);

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Preparing,
    Ready,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses a route can be assigned from.
    pub fn is_dispatchable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Draft | OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::Ready
        )
    }

    /// Statuses the stuck-order report watches.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Preparing)
    }
}

/// One product line to plan, with the reservation already decided.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product: Product,
    pub quantity: i64,
    pub reservation: Reservation,
}

/// Order line: product, quantity, unit price and the lot that satisfied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub reservation: Reservation,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub subtotal: u64,
}

impl OrderLine {
    pub fn lot_id(&self) -> Option<LotId> {
        self.reservation.lot_id()
    }
}

/// Outbound order with its load-planning results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
    pub total_cost: u64,
    pub suggested_vehicle: VehicleClass,
    pub has_fragile_items: bool,
    pub has_heavy_items: bool,
    pub loading_alert: Option<LoadingAlert>,
    pub loading_efficiency: f64,
    pub brands: Vec<Brand>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    /// Build a DRAFT order. Reservation failures never block creation.
    #[allow(clippy::too_many_arguments)]
    pub fn plan(
        id: OrderId,
        order_number: String,
        customer: &Customer,
        lines: Vec<PlannedLine>,
        heavy_threshold_kg: f64,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !customer.can_transact() {
            return Err(DomainError::conflict(format!(
                "customer {} is inactive",
                customer.id
            )));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("an order needs at least one line"));
        }

        let mut load = LoadPlan::default();
        let mut built = Vec::with_capacity(lines.len());
        for (idx, line) in lines.into_iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be positive",
                    idx + 1
                )));
            }
            if !line.product.active {
                return Err(DomainError::validation(format!(
                    "product {} is inactive",
                    line.product.sku
                )));
            }
            let subtotal = load.add(&line.product, line.quantity, heavy_threshold_kg);
            built.push(OrderLine {
                line_no: (idx + 1) as u32,
                product_id: line.product.id,
                reservation: line.reservation,
                quantity: line.quantity,
                unit_price: line.product.unit_price,
                subtotal,
            });
        }

        Ok(Self {
            id,
            order_number,
            customer_id: customer.id,
            status: OrderStatus::Draft,
            lines: built,
            total_weight_kg: load.total_weight_kg,
            total_volume_m3: load.total_volume_m3,
            total_cost: load.total_cost,
            suggested_vehicle: load.suggested_vehicle(),
            has_fragile_items: load.has_fragile,
            has_heavy_items: load.has_heavy,
            loading_alert: load.loading_alert(),
            loading_efficiency: load.loading_efficiency(),
            brands: load.brands.into_iter().collect(),
            created_by: actor,
            created_at: occurred_at,
            updated_at: occurred_at,
            version: 0,
        })
    }

    pub fn brands_mixed(&self) -> bool {
        self.brands.len() > 1
    }

    /// Lines holding a lot, as (lot, quantity).
    pub fn reserved_lots(&self) -> impl Iterator<Item = (LotId, i64)> + '_ {
        self.lines
            .iter()
            .filter_map(|l| l.lot_id().map(|lot| (lot, l.quantity)))
    }

    /// Drop a line's reservation after its stock could not be taken.
    pub fn unreserve_line(&mut self, line_no: u32, best_available: i64) -> DomainResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.line_no == line_no)
            .ok_or_else(|| DomainError::not_found("order line", line_no))?;
        line.reservation = if best_available > 0 {
            Reservation::PartiallyReserved { best_available }
        } else {
            Reservation::Unavailable
        };
        Ok(())
    }

    pub fn confirm(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Draft, OrderStatus::Confirmed, occurred_at)
    }

    pub fn start_preparation(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Confirmed, OrderStatus::Preparing, occurred_at)
    }

    pub fn mark_ready(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Preparing, OrderStatus::Ready, occurred_at)
    }

    /// Put the order on the road; returns the status it left.
    pub fn dispatch(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<OrderStatus> {
        if !self.status.is_dispatchable() {
            return Err(DomainError::conflict(format!(
                "order {} cannot be dispatched from {:?}",
                self.order_number, self.status
            )));
        }
        let previous = self.status;
        self.status = OrderStatus::InTransit;
        self.updated_at = occurred_at;
        Ok(previous)
    }

    pub fn deliver(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::InTransit, OrderStatus::Delivered, occurred_at)
    }

    /// Undo a dispatch when its route is cancelled.
    pub fn recall(&mut self, previous: OrderStatus, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        if !previous.is_dispatchable() {
            return Err(DomainError::validation(format!(
                "{previous:?} is not a pre-dispatch status"
            )));
        }
        self.transition(OrderStatus::InTransit, previous, occurred_at)
    }

    /// Cancel before dispatch. Returns the lots whose units must go back.
    pub fn cancel(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<Vec<(LotId, i64)>> {
        if !self.status.is_dispatchable() {
            return Err(DomainError::conflict(format!(
                "order {} cannot be cancelled from {:?}",
                self.order_number, self.status
            )));
        }
        self.status = OrderStatus::Cancelled;
        self.updated_at = occurred_at;
        Ok(self.reserved_lots().collect())
    }

    /// CONFIRMED / PREPARING and created more than `threshold_hours` before `now`.
    pub fn is_stuck(&self, threshold_hours: i64, now: DateTime<Utc>) -> bool {
        self.status.is_in_progress() && self.created_at < now - Duration::hours(threshold_hours)
    }

    fn transition(
        &mut self,
        from: OrderStatus,
        to: OrderStatus,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != from {
            return Err(DomainError::conflict(format!(
                "order {} must be {from:?} to move to {to:?} (is {:?})",
                self.order_number, self.status
            )));
        }
        self.status = to;
        self.updated_at = occurred_at;
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for Order {
    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wareflow_catalog::{ContactInfo, Dimensions, NewProduct};

    fn customer(active: bool) -> Customer {
        let mut c = Customer::register(
            CustomerId::generate(),
            "Tienda Sol",
            "TSO010101AAA",
            "Calle 5",
            ContactInfo::default(),
            0,
        )
        .unwrap();
        c.active = active;
        c
    }

    fn product(fragile: bool, weight_kg: f64) -> Product {
        Product::register(
            ProductId::generate(),
            NewProduct {
                sku: "SKU-1".into(),
                name: "Mermelada 500g".into(),
                brand: Brand::new("jumex").unwrap(),
                category: "conservas".into(),
                barcode: None,
                dimensions: Dimensions::new(20.0, 10.0, 10.0).unwrap(),
                weight_kg,
                is_fragile: fragile,
                unit_price: 3_500,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn draft(reservation: Reservation) -> Order {
        Order::plan(
            OrderId::generate(),
            "ORD-20260105-0001".into(),
            &customer(true),
            vec![PlannedLine {
                product: product(true, 1.0),
                quantity: 4,
                reservation,
            }],
            10.0,
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn plan_computes_totals_and_alert() {
        let order = draft(Reservation::Unavailable);
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.total_cost, 14_000);
        assert!((order.total_volume_m3 - 0.008).abs() < 1e-12);
        assert_eq!(order.suggested_vehicle, VehicleClass::Van);
        assert_eq!(order.loading_alert, Some(LoadingAlert::FragileCaution));
        assert!(!order.brands_mixed());
    }

    #[test]
    fn inactive_customer_is_rejected() {
        let err = Order::plan(
            OrderId::generate(),
            "ORD-1".into(),
            &customer(false),
            vec![PlannedLine {
                product: product(false, 1.0),
                quantity: 1,
                reservation: Reservation::Unavailable,
            }],
            10.0,
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn lifecycle_in_order() {
        let mut order = draft(Reservation::Unavailable);
        let now = Utc::now();
        assert!(order.start_preparation(now).is_err());
        order.confirm(now).unwrap();
        order.start_preparation(now).unwrap();
        order.mark_ready(now).unwrap();
        assert_eq!(order.dispatch(now).unwrap(), OrderStatus::Ready);
        order.deliver(now).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.cancel(now).is_err());
    }

    #[test]
    fn recall_restores_previous_status() {
        let mut order = draft(Reservation::Unavailable);
        let now = Utc::now();
        order.confirm(now).unwrap();
        let previous = order.dispatch(now).unwrap();
        order.recall(previous, now).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn cancel_hands_back_reserved_lots() {
        let lot_id = LotId::generate();
        let mut order = draft(Reservation::Reserved { lot_id });
        assert_eq!(order.cancel(Utc::now()).unwrap(), vec![(lot_id, 4)]);
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn stuck_only_when_in_progress_and_old() {
        let mut order = draft(Reservation::Unavailable);
        let later = order.created_at + Duration::hours(30);
        assert!(!order.is_stuck(24, later));
        order.confirm(later).unwrap();
        assert!(order.is_stuck(24, later));
        assert!(!order.is_stuck(48, later));
    }
}
