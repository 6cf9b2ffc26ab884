//! Persistence boundary.
//!
//! Each bounded context gets one store port. Workflows only talk to these
//! traits; [`in_memory`] provides the adapters used by tests and local runs.
//!
//! ## Consistency contract
//!
//! - Every method is one atomic call. Nothing spans two calls.
//! - Versioned rows (lots, cycle counts, orders, vehicles, drivers) are written with an
//!   [`ExpectedVersion`]; a mismatch fails with [`StoreError::Concurrency`]
//!   and writes nothing. A successful write bumps the stored version by one.
//! - Inserts of versioned rows store them at version 1.
//! - Unique keys (ids, document numbers, plates) fail with
//!   [`StoreError::Duplicate`].

pub mod in_memory;

use chrono::{DateTime, NaiveDate, Utc};

use wareflow_catalog::{Brand, Customer, CustomerId, Product, ProductId, Supplier, SupplierId};
use wareflow_core::ExpectedVersion;
use wareflow_fleet::{
    ChecklistId, Driver, DriverId, Maintenance, MaintenanceId, PreDepartureChecklist, Route,
    RouteId, Vehicle, VehicleId,
};
use wareflow_inventory::{CycleCount, CycleCountId, Lot, LotId, Movement, fefo_lots};
use wareflow_orders::{Order, OrderId};
use wareflow_reception::{
    CustomerReturn, Discrepancy, DiscrepancyId, ReceptionLineId, ReceptionOrder,
    ReceptionOrderId, ReturnId,
};

use crate::error::StoreError;

pub use in_memory::{
    InMemoryCatalogStore, InMemoryFleetStore, InMemoryInventoryStore, InMemoryOrderStore,
    InMemoryReceptionStore, InMemorySequenceStore,
};

/// Product listing filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub brand: Option<Brand>,
    pub category: Option<String>,
    pub active_only: bool,
}

impl ProductFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        (!self.active_only || product.active)
            && self.brand.as_ref().is_none_or(|b| *b == product.brand)
            && self
                .category
                .as_deref()
                .is_none_or(|c| c.eq_ignore_ascii_case(&product.category))
    }
}

/// Reference data: products and trading parties.
pub trait CatalogStore: Send + Sync {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    fn supplier(&self, id: SupplierId) -> Result<Option<Supplier>, StoreError>;
    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    /// Matching products ordered by SKU.
    fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError>;

    /// Insert or replace. SKUs are unique across products.
    fn save_product(&self, product: Product) -> Result<(), StoreError>;
    fn save_supplier(&self, supplier: Supplier) -> Result<(), StoreError>;
    fn save_customer(&self, customer: Customer) -> Result<(), StoreError>;
}

/// One conditional lot write, optionally with the movement that caused it.
#[derive(Debug, Clone)]
pub struct LotWrite {
    pub lot: Lot,
    pub expected: ExpectedVersion,
    pub movement: Option<Movement>,
}

impl LotWrite {
    /// Guard on the version the lot was read at.
    pub fn guarded(lot: Lot, movement: Option<Movement>) -> Self {
        let expected = ExpectedVersion::Exact(lot.version);
        Self {
            lot,
            expected,
            movement,
        }
    }
}

/// Lots, their movement ledger, and cycle counts.
pub trait InventoryStore: Send + Sync {
    fn lot(&self, id: LotId) -> Result<Option<Lot>, StoreError>;

    /// Every lot of the product, any status, in creation order.
    fn lots_by_product(&self, product_id: ProductId) -> Result<Vec<Lot>, StoreError>;

    /// Every lot in the warehouse, in creation order.
    fn list_lots(&self) -> Result<Vec<Lot>, StoreError>;

    /// Open a lot together with its opening movement.
    fn insert_lot(&self, lot: Lot, opening: Movement) -> Result<Lot, StoreError>;

    /// Apply every write or none of them. Returns the stored lots in input order.
    fn write_lots(&self, writes: Vec<LotWrite>) -> Result<Vec<Lot>, StoreError>;

    /// A lot's ledger in append order.
    fn movements_for_lot(&self, lot_id: LotId) -> Result<Vec<Movement>, StoreError>;

    fn insert_cycle_count(&self, count: CycleCount) -> Result<CycleCount, StoreError>;
    fn cycle_count(&self, id: CycleCountId) -> Result<Option<CycleCount>, StoreError>;
    fn update_cycle_count(
        &self,
        count: CycleCount,
        expected: ExpectedVersion,
    ) -> Result<CycleCount, StoreError>;

    fn write_lot(&self, write: LotWrite) -> Result<Lot, StoreError> {
        self.write_lots(vec![write])?
            .pop()
            .ok_or_else(|| StoreError::Backend("lot write returned no row".to_string()))
    }

    /// Allocatable lots (AVAILABLE, quantity > 0) in FEFO order.
    fn find_lots_fefo(&self, product_id: ProductId) -> Result<Vec<Lot>, StoreError> {
        Ok(fefo_lots(self.lots_by_product(product_id)?))
    }

    /// Units held in stock-bearing lots (AVAILABLE or RESERVED).
    fn aggregate_stock(&self, product_id: ProductId) -> Result<i64, StoreError> {
        Ok(self
            .lots_by_product(product_id)?
            .iter()
            .filter(|lot| lot.status.counts_as_stock())
            .map(|lot| lot.quantity)
            .sum())
    }
}

/// Reception orders, their discrepancies, and customer returns.
pub trait ReceptionStore: Send + Sync {
    /// Fails with `Duplicate` when the order number is taken.
    fn insert_order(&self, order: ReceptionOrder) -> Result<(), StoreError>;
    fn order(&self, id: ReceptionOrderId) -> Result<Option<ReceptionOrder>, StoreError>;
    fn order_of_line(&self, line_id: ReceptionLineId)
    -> Result<Option<ReceptionOrderId>, StoreError>;
    fn update_order(&self, order: ReceptionOrder) -> Result<(), StoreError>;

    /// Store a counted order and the discrepancies it raised in one call.
    fn record_count(
        &self,
        order: ReceptionOrder,
        discrepancies: Vec<Discrepancy>,
    ) -> Result<(), StoreError>;

    fn discrepancy(&self, id: DiscrepancyId) -> Result<Option<Discrepancy>, StoreError>;
    fn discrepancies_for_order(
        &self,
        order_id: ReceptionOrderId,
    ) -> Result<Vec<Discrepancy>, StoreError>;
    fn update_discrepancy(&self, discrepancy: Discrepancy) -> Result<(), StoreError>;

    fn insert_return(&self, customer_return: CustomerReturn) -> Result<(), StoreError>;
    fn customer_return(&self, id: ReturnId) -> Result<Option<CustomerReturn>, StoreError>;
}

/// Outbound orders.
pub trait OrderStore: Send + Sync {
    /// Fails with `Duplicate` when the id or order number is taken.
    fn insert_order(&self, order: Order) -> Result<Order, StoreError>;
    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
    fn update_order(&self, order: Order, expected: ExpectedVersion) -> Result<Order, StoreError>;

    /// Every order, oldest first.
    fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// CONFIRMED / PREPARING orders created more than `threshold_hours` before
    /// `now`, oldest first.
    fn find_stuck_orders(
        &self,
        threshold_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .list_orders()?
            .into_iter()
            .filter(|order| order.is_stuck(threshold_hours, now))
            .collect())
    }
}

/// Vehicles, drivers, routes and their maintenance / checklist records.
pub trait FleetStore: Send + Sync {
    /// Fails with `Duplicate` when the id or plate is taken.
    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError>;
    fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, StoreError>;
    fn update_vehicle(
        &self,
        vehicle: Vehicle,
        expected: ExpectedVersion,
    ) -> Result<Vehicle, StoreError>;
    /// Every vehicle ordered by plate.
    fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError>;

    /// Fails with `Duplicate` when the id or license number is taken.
    fn insert_driver(&self, driver: Driver) -> Result<Driver, StoreError>;
    fn driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError>;
    fn update_driver(&self, driver: Driver, expected: ExpectedVersion)
    -> Result<Driver, StoreError>;
    /// Every driver in registration order.
    fn list_drivers(&self) -> Result<Vec<Driver>, StoreError>;

    /// Fails with `Duplicate` when the route number is taken.
    fn insert_route(&self, route: Route) -> Result<(), StoreError>;
    fn route(&self, id: RouteId) -> Result<Option<Route>, StoreError>;
    fn update_route(&self, route: Route) -> Result<(), StoreError>;

    fn insert_maintenance(&self, maintenance: Maintenance) -> Result<(), StoreError>;
    fn maintenance(&self, id: MaintenanceId) -> Result<Option<Maintenance>, StoreError>;
    fn update_maintenance(&self, maintenance: Maintenance) -> Result<(), StoreError>;

    fn insert_checklist(&self, checklist: PreDepartureChecklist) -> Result<(), StoreError>;
    fn checklist(&self, id: ChecklistId) -> Result<Option<PreDepartureChecklist>, StoreError>;

    fn list_available_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        Ok(self
            .list_vehicles()?
            .into_iter()
            .filter(Vehicle::is_available_for_route)
            .collect())
    }

    fn list_available_drivers(&self, today: NaiveDate) -> Result<Vec<Driver>, StoreError> {
        Ok(self
            .list_drivers()?
            .into_iter()
            .filter(|driver| driver.is_available_for_route(today))
            .collect())
    }
}

/// Per-prefix, per-day counters backing document numbers.
pub trait SequenceStore: Send + Sync {
    /// Next value (starting at 1) for `prefix` on `date`.
    fn next_value(&self, prefix: &str, date: NaiveDate) -> Result<u32, StoreError>;
}
