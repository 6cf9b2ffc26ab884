//! In-memory store adapters.
//!
//! Intended for tests/dev. Each store keeps its tables behind one `RwLock`, so
//! every trait call is atomic with respect to the others on the same store.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use chrono::NaiveDate;

use wareflow_catalog::{Customer, CustomerId, Product, ProductId, Supplier, SupplierId};
use wareflow_core::{ExpectedVersion, Versioned};
use wareflow_fleet::{
    ChecklistId, Driver, DriverId, Maintenance, MaintenanceId, PreDepartureChecklist, Route,
    RouteId, Vehicle, VehicleId,
};
use wareflow_inventory::{CycleCount, CycleCountId, Lot, LotId, Movement};
use wareflow_orders::{Order, OrderId};
use wareflow_reception::{
    CustomerReturn, Discrepancy, DiscrepancyId, ReceptionLineId, ReceptionOrder,
    ReceptionOrderId, ReturnId,
};

use super::{
    CatalogStore, FleetStore, InventoryStore, LotWrite, OrderStore, ProductFilter,
    ReceptionStore, SequenceStore,
};
use crate::error::StoreError;

/// Fail unless `expected` matches the stored row's version.
fn check_version<T: Versioned>(
    kind: &str,
    current: &T,
    expected: ExpectedVersion,
) -> Result<(), StoreError>
where
    T::Id: core::fmt::Display,
{
    if expected.matches(current.version()) {
        Ok(())
    } else {
        Err(StoreError::Concurrency(format!(
            "{kind} {} (expected: {expected:?}, actual: {})",
            current.id(),
            current.version()
        )))
    }
}

#[derive(Debug, Default)]
struct CatalogTables {
    products: HashMap<ProductId, Product>,
    suppliers: HashMap<SupplierId, Supplier>,
    customers: HashMap<CustomerId, Customer>,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<CatalogTables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.products.get(&id).cloned())
    }

    fn supplier(&self, id: SupplierId) -> Result<Option<Supplier>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.suppliers.get(&id).cloned())
    }

    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.customers.get(&id).cloned())
    }

    fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(products)
    }

    fn save_product(&self, product: Product) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables
            .products
            .values()
            .any(|p| p.sku == product.sku && p.id != product.id)
        {
            return Err(StoreError::Duplicate(format!("product sku {}", product.sku)));
        }
        tables.products.insert(product.id, product);
        Ok(())
    }

    fn save_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        tables.suppliers.insert(supplier.id, supplier);
        Ok(())
    }

    fn save_customer(&self, customer: Customer) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        tables.customers.insert(customer.id, customer);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InventoryTables {
    lots: HashMap<LotId, Lot>,
    /// Insertion order; lots opened in the same instant still list stably.
    lot_order: Vec<LotId>,
    movements: HashMap<LotId, Vec<Movement>>,
    cycle_counts: HashMap<CycleCountId, CycleCount>,
}

impl InventoryTables {
    fn lots_in_creation_order(&self, keep: impl Fn(&Lot) -> bool) -> Vec<Lot> {
        self.lot_order
            .iter()
            .filter_map(|id| self.lots.get(id))
            .filter(|lot| keep(lot))
            .cloned()
            .collect()
    }
}

/// Lots and their append-only movement ledger.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    inner: RwLock<InventoryTables>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn lot(&self, id: LotId) -> Result<Option<Lot>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.lots.get(&id).cloned())
    }

    fn lots_by_product(&self, product_id: ProductId) -> Result<Vec<Lot>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.lots_in_creation_order(|l| l.product_id == product_id))
    }

    fn list_lots(&self) -> Result<Vec<Lot>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.lots_in_creation_order(|_| true))
    }

    fn insert_lot(&self, mut lot: Lot, opening: Movement) -> Result<Lot, StoreError> {
        if opening.lot_id != lot.id {
            return Err(StoreError::Backend(format!(
                "opening movement targets lot {}, not {}",
                opening.lot_id, lot.id
            )));
        }
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.lots.contains_key(&lot.id) {
            return Err(StoreError::Duplicate(format!("lot {}", lot.id)));
        }
        lot.version = 1;
        tables.movements.insert(lot.id, vec![opening]);
        tables.lot_order.push(lot.id);
        tables.lots.insert(lot.id, lot.clone());
        Ok(lot)
    }

    fn write_lots(&self, writes: Vec<LotWrite>) -> Result<Vec<Lot>, StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;

        // Validate the whole batch before touching anything.
        for write in &writes {
            let current = tables
                .lots
                .get(&write.lot.id)
                .ok_or_else(|| StoreError::Missing(format!("lot {}", write.lot.id)))?;
            check_version("lot", current, write.expected)?;
            if let Some(movement) = &write.movement {
                if movement.lot_id != write.lot.id {
                    return Err(StoreError::Backend(format!(
                        "movement targets lot {}, not {}",
                        movement.lot_id, write.lot.id
                    )));
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        if !writes.iter().all(|w| seen.insert(w.lot.id)) {
            return Err(StoreError::Backend("lot written twice in one batch".to_string()));
        }

        let mut stored = Vec::with_capacity(writes.len());
        for LotWrite { mut lot, movement, .. } in writes {
            let version = tables.lots.get(&lot.id).map_or(0, |l| l.version);
            lot.version = version + 1;
            if let Some(movement) = movement {
                tables.movements.entry(lot.id).or_default().push(movement);
            }
            tables.lots.insert(lot.id, lot.clone());
            stored.push(lot);
        }
        Ok(stored)
    }

    fn movements_for_lot(&self, lot_id: LotId) -> Result<Vec<Movement>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.movements.get(&lot_id).cloned().unwrap_or_default())
    }

    fn insert_cycle_count(&self, mut count: CycleCount) -> Result<CycleCount, StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.cycle_counts.contains_key(&count.id) {
            return Err(StoreError::Duplicate(format!("cycle count {}", count.id)));
        }
        count.version = 1;
        tables.cycle_counts.insert(count.id, count.clone());
        Ok(count)
    }

    fn cycle_count(&self, id: CycleCountId) -> Result<Option<CycleCount>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.cycle_counts.get(&id).cloned())
    }

    fn update_cycle_count(
        &self,
        mut count: CycleCount,
        expected: ExpectedVersion,
    ) -> Result<CycleCount, StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let current = tables
            .cycle_counts
            .get(&count.id)
            .ok_or_else(|| StoreError::Missing(format!("cycle count {}", count.id)))?;
        check_version("cycle count", current, expected)?;
        count.version = current.version + 1;
        tables.cycle_counts.insert(count.id, count.clone());
        Ok(count)
    }
}

#[derive(Debug, Default)]
struct ReceptionTables {
    orders: HashMap<ReceptionOrderId, ReceptionOrder>,
    discrepancies: HashMap<DiscrepancyId, Discrepancy>,
    returns: HashMap<ReturnId, CustomerReturn>,
}

#[derive(Debug, Default)]
pub struct InMemoryReceptionStore {
    inner: RwLock<ReceptionTables>,
}

impl InMemoryReceptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReceptionStore for InMemoryReceptionStore {
    fn insert_order(&self, order: ReceptionOrder) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(format!("reception order {}", order.id)));
        }
        if tables
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::Duplicate(format!(
                "reception order number {}",
                order.order_number
            )));
        }
        tables.orders.insert(order.id, order);
        Ok(())
    }

    fn order(&self, id: ReceptionOrderId) -> Result<Option<ReceptionOrder>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.orders.get(&id).cloned())
    }

    fn order_of_line(
        &self,
        line_id: ReceptionLineId,
    ) -> Result<Option<ReceptionOrderId>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables
            .orders
            .values()
            .find(|o| o.line(line_id).is_some())
            .map(|o| o.id))
    }

    fn update_order(&self, order: ReceptionOrder) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        match tables.orders.get_mut(&order.id) {
            Some(row) => {
                *row = order;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("reception order {}", order.id))),
        }
    }

    fn record_count(
        &self,
        order: ReceptionOrder,
        discrepancies: Vec<Discrepancy>,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if !tables.orders.contains_key(&order.id) {
            return Err(StoreError::Missing(format!("reception order {}", order.id)));
        }
        // One discrepancy per line at most.
        for d in &discrepancies {
            if tables.discrepancies.values().any(|x| x.line_id == d.line_id) {
                return Err(StoreError::Duplicate(format!(
                    "discrepancy for line {}",
                    d.line_id
                )));
            }
        }
        for d in discrepancies {
            tables.discrepancies.insert(d.id, d);
        }
        tables.orders.insert(order.id, order);
        Ok(())
    }

    fn discrepancy(&self, id: DiscrepancyId) -> Result<Option<Discrepancy>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.discrepancies.get(&id).cloned())
    }

    fn discrepancies_for_order(
        &self,
        order_id: ReceptionOrderId,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut found: Vec<Discrepancy> = tables
            .discrepancies
            .values()
            .filter(|d| d.reception_order_id == order_id)
            .cloned()
            .collect();
        found.sort_by_key(|d| d.id);
        Ok(found)
    }

    fn update_discrepancy(&self, discrepancy: Discrepancy) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        match tables.discrepancies.get_mut(&discrepancy.id) {
            Some(row) => {
                *row = discrepancy;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("discrepancy {}", discrepancy.id))),
        }
    }

    fn insert_return(&self, customer_return: CustomerReturn) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.returns.contains_key(&customer_return.id) {
            return Err(StoreError::Duplicate(format!(
                "customer return {}",
                customer_return.id
            )));
        }
        tables.returns.insert(customer_return.id, customer_return);
        Ok(())
    }

    fn customer_return(&self, id: ReturnId) -> Result<Option<CustomerReturn>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.returns.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert_order(&self, mut order: Order) -> Result<Order, StoreError> {
        let mut orders = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(format!("order {}", order.id)));
        }
        if orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::Duplicate(format!(
                "order number {}",
                order.order_number
            )));
        }
        order.version = 1;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(orders.get(&id).cloned())
    }

    fn update_order(&self, mut order: Order, expected: ExpectedVersion) -> Result<Order, StoreError> {
        let mut orders = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let current = orders
            .get(&order.id)
            .ok_or_else(|| StoreError::Missing(format!("order {}", order.id)))?;
        check_version("order", current, expected)?;
        order.version = current.version + 1;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

#[derive(Debug, Default)]
struct FleetTables {
    vehicles: HashMap<VehicleId, Vehicle>,
    drivers: HashMap<DriverId, Driver>,
    routes: HashMap<RouteId, Route>,
    maintenance: HashMap<MaintenanceId, Maintenance>,
    checklists: HashMap<ChecklistId, PreDepartureChecklist>,
}

#[derive(Debug, Default)]
pub struct InMemoryFleetStore {
    inner: RwLock<FleetTables>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FleetStore for InMemoryFleetStore {
    fn insert_vehicle(&self, mut vehicle: Vehicle) -> Result<Vehicle, StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.vehicles.contains_key(&vehicle.id) {
            return Err(StoreError::Duplicate(format!("vehicle {}", vehicle.id)));
        }
        if tables
            .vehicles
            .values()
            .any(|v| v.plate_number == vehicle.plate_number)
        {
            return Err(StoreError::Duplicate(format!(
                "plate {}",
                vehicle.plate_number
            )));
        }
        vehicle.version = 1;
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.vehicles.get(&id).cloned())
    }

    fn update_vehicle(
        &self,
        mut vehicle: Vehicle,
        expected: ExpectedVersion,
    ) -> Result<Vehicle, StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let current = tables
            .vehicles
            .get(&vehicle.id)
            .ok_or_else(|| StoreError::Missing(format!("vehicle {}", vehicle.id)))?;
        check_version("vehicle", current, expected)?;
        vehicle.version = current.version + 1;
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut all: Vec<Vehicle> = tables.vehicles.values().cloned().collect();
        all.sort_by(|a, b| a.plate_number.cmp(&b.plate_number));
        Ok(all)
    }

    fn insert_driver(&self, mut driver: Driver) -> Result<Driver, StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.drivers.contains_key(&driver.id) {
            return Err(StoreError::Duplicate(format!("driver {}", driver.id)));
        }
        if tables
            .drivers
            .values()
            .any(|d| d.license_number == driver.license_number)
        {
            return Err(StoreError::Duplicate(format!(
                "license {}",
                driver.license_number
            )));
        }
        driver.version = 1;
        tables.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    fn driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.drivers.get(&id).cloned())
    }

    fn update_driver(
        &self,
        mut driver: Driver,
        expected: ExpectedVersion,
    ) -> Result<Driver, StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let current = tables
            .drivers
            .get(&driver.id)
            .ok_or_else(|| StoreError::Missing(format!("driver {}", driver.id)))?;
        check_version("driver", current, expected)?;
        driver.version = current.version + 1;
        tables.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    fn list_drivers(&self) -> Result<Vec<Driver>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut all: Vec<Driver> = tables.drivers.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    fn insert_route(&self, route: Route) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.routes.contains_key(&route.id) {
            return Err(StoreError::Duplicate(format!("route {}", route.id)));
        }
        if tables
            .routes
            .values()
            .any(|r| r.route_number == route.route_number)
        {
            return Err(StoreError::Duplicate(format!(
                "route number {}",
                route.route_number
            )));
        }
        tables.routes.insert(route.id, route);
        Ok(())
    }

    fn route(&self, id: RouteId) -> Result<Option<Route>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.routes.get(&id).cloned())
    }

    fn update_route(&self, route: Route) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        match tables.routes.get_mut(&route.id) {
            Some(row) => {
                *row = route;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("route {}", route.id))),
        }
    }

    fn insert_maintenance(&self, maintenance: Maintenance) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.maintenance.contains_key(&maintenance.id) {
            return Err(StoreError::Duplicate(format!("maintenance {}", maintenance.id)));
        }
        tables.maintenance.insert(maintenance.id, maintenance);
        Ok(())
    }

    fn maintenance(&self, id: MaintenanceId) -> Result<Option<Maintenance>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.maintenance.get(&id).cloned())
    }

    fn update_maintenance(&self, maintenance: Maintenance) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        match tables.maintenance.get_mut(&maintenance.id) {
            Some(row) => {
                *row = maintenance;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("maintenance {}", maintenance.id))),
        }
    }

    fn insert_checklist(&self, checklist: PreDepartureChecklist) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if tables.checklists.contains_key(&checklist.id) {
            return Err(StoreError::Duplicate(format!("checklist {}", checklist.id)));
        }
        tables.checklists.insert(checklist.id, checklist);
        Ok(())
    }

    fn checklist(&self, id: ChecklistId) -> Result<Option<PreDepartureChecklist>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(tables.checklists.get(&id).cloned())
    }
}

/// Counters keyed by (prefix, day).
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    counters: Mutex<HashMap<(String, NaiveDate), u32>>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn next_value(&self, prefix: &str, date: NaiveDate) -> Result<u32, StoreError> {
        let mut counters = self.counters.lock().map_err(|_| StoreError::poisoned())?;
        let counter = counters.entry((prefix.to_string(), date)).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend(format!("{prefix} sequence exhausted")))?;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wareflow_catalog::{Brand, Dimensions, NewProduct};
    use wareflow_core::UserId;
    use wareflow_inventory::{LotStatus, MovementContext, MovementType, NewLot};

    fn product(sku: &str) -> Product {
        Product::register(
            ProductId::generate(),
            NewProduct {
                sku: sku.into(),
                name: format!("Product {sku}"),
                brand: Brand::new("Acme").unwrap(),
                category: "beverages".into(),
                barcode: None,
                dimensions: Dimensions::new(10.0, 10.0, 10.0).unwrap(),
                weight_kg: 1.0,
                is_fragile: false,
                unit_price: 100,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn open_lot(store: &InMemoryInventoryStore, product_id: ProductId, qty: i64) -> Lot {
        let (lot, movement) = Lot::open(
            LotId::generate(),
            NewLot {
                product_id,
                lot_number: "L-1".into(),
                expiration_date: None,
                location: "A-01".into(),
                status: LotStatus::Available,
            },
            qty,
            MovementType::In,
            MovementContext::new(UserId::new(), Utc::now()),
        )
        .unwrap();
        store.insert_lot(lot, movement).unwrap()
    }

    #[test]
    fn sku_is_unique() {
        let store = InMemoryCatalogStore::new();
        store.save_product(product("SKU-1")).unwrap();
        let err = store.save_product(product("SKU-1")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn stale_lot_write_is_rejected_and_batch_is_atomic() {
        let store = InMemoryInventoryStore::new();
        let product_id = ProductId::generate();
        let a = open_lot(&store, product_id, 10);
        let b = open_lot(&store, product_id, 10);
        assert_eq!(a.version, 1);

        let ctx = || MovementContext::new(UserId::new(), Utc::now());
        let mut a2 = a.clone();
        let ma = a2.apply_movement(MovementType::Out, -4, ctx()).unwrap();
        let mut b2 = b.clone();
        let mb = b2.apply_movement(MovementType::Out, -4, ctx()).unwrap();
        let mut stale_b = b2.clone();
        stale_b.version = 7;

        let err = store
            .write_lots(vec![
                LotWrite::guarded(a2.clone(), Some(ma.clone())),
                LotWrite::guarded(stale_b, Some(mb)),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(store.lot(a.id).unwrap().unwrap().quantity, 10);
        assert_eq!(store.movements_for_lot(a.id).unwrap().len(), 1);

        let stored = store.write_lot(LotWrite::guarded(a2, Some(ma))).unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.quantity, 6);
        assert_eq!(store.movements_for_lot(a.id).unwrap().len(), 2);
    }

    #[test]
    fn aggregate_stock_ignores_non_stock_lots() {
        let store = InMemoryInventoryStore::new();
        let product_id = ProductId::generate();
        open_lot(&store, product_id, 5);
        let mut blocked = open_lot(&store, product_id, 7);
        blocked.change_status(LotStatus::Quarantine).unwrap();
        store.write_lot(LotWrite::guarded(blocked, None)).unwrap();

        assert_eq!(store.aggregate_stock(product_id).unwrap(), 5);
        assert_eq!(store.find_lots_fefo(product_id).unwrap().len(), 1);
    }

    #[test]
    fn stale_cycle_count_update_is_rejected() {
        let store = InMemoryInventoryStore::new();
        let pending = store
            .insert_cycle_count(CycleCount::schedule(
                CycleCountId::generate(),
                ProductId::generate(),
                "A-01",
                10,
                Utc::now(),
            ))
            .unwrap();
        assert_eq!(pending.version, 1);

        let mut first = pending.clone();
        first.perform(9, UserId::new(), Utc::now()).unwrap();
        let stored = store
            .update_cycle_count(first, ExpectedVersion::Exact(pending.version))
            .unwrap();
        assert_eq!(stored.version, 2);

        let mut second = pending.clone();
        second.perform(8, UserId::new(), Utc::now()).unwrap();
        let err = store
            .update_cycle_count(second, ExpectedVersion::Exact(pending.version))
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(
            store.cycle_count(pending.id).unwrap().unwrap().counted_quantity,
            Some(9)
        );
    }

    #[test]
    fn sequences_are_per_prefix_and_day() {
        let store = InMemorySequenceStore::new();
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let next_day = day.succ_opt().unwrap();
        assert_eq!(store.next_value("ORD", day).unwrap(), 1);
        assert_eq!(store.next_value("ORD", day).unwrap(), 2);
        assert_eq!(store.next_value("REC", day).unwrap(), 1);
        assert_eq!(store.next_value("ORD", next_day).unwrap(), 1);
    }
}
