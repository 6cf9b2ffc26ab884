//! Reference data registration: catalog parties and fleet resources.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use wareflow_catalog::{
    Brand, ContactInfo, Customer, CustomerId, NewProduct, Product, ProductId, Supplier,
    SupplierId,
};
use wareflow_core::UserId;
use wareflow_fleet::{Driver, DriverId, NewVehicle, Vehicle, VehicleId};

use crate::audit::AuditRecord;
use crate::engine::Engine;
use crate::error::EngineResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterProduct {
    pub product: NewProduct,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSupplier {
    pub name: String,
    pub brand: Brand,
    pub tax_id: String,
    pub contact: ContactInfo,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub name: String,
    pub tax_id: String,
    pub address: String,
    pub contact: ContactInfo,
    pub credit_limit: u64,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterVehicle {
    pub vehicle: NewVehicle,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDriver {
    pub name: String,
    pub license_number: String,
    pub license_expiry: NaiveDate,
    pub phone: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Engine {
    /// Add a product to the catalog. SKUs are unique.
    pub fn register_product(&self, cmd: RegisterProduct) -> EngineResult<Product> {
        let product = Product::register(ProductId::generate(), cmd.product, cmd.occurred_at)?;
        self.stores.catalog.save_product(product.clone())?;

        self.audit(
            AuditRecord::new(cmd.actor, "REGISTER_PRODUCT", "product", product.id, cmd.occurred_at)
                .after(&product),
        );
        info!(product_id = %product.id, sku = %product.sku, brand = %product.brand, "product registered");
        Ok(product)
    }

    pub fn register_supplier(&self, cmd: RegisterSupplier) -> EngineResult<Supplier> {
        let supplier = Supplier::register(
            SupplierId::generate(),
            cmd.name,
            cmd.brand,
            cmd.tax_id,
            cmd.contact,
        )?;
        self.stores.catalog.save_supplier(supplier.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "REGISTER_SUPPLIER",
                "supplier",
                supplier.id,
                cmd.occurred_at,
            )
            .after(&supplier),
        );
        info!(supplier_id = %supplier.id, name = %supplier.name, "supplier registered");
        Ok(supplier)
    }

    pub fn register_customer(&self, cmd: RegisterCustomer) -> EngineResult<Customer> {
        let customer = Customer::register(
            CustomerId::generate(),
            cmd.name,
            cmd.tax_id,
            cmd.address,
            cmd.contact,
            cmd.credit_limit,
        )?;
        self.stores.catalog.save_customer(customer.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "REGISTER_CUSTOMER",
                "customer",
                customer.id,
                cmd.occurred_at,
            )
            .after(&customer),
        );
        info!(customer_id = %customer.id, name = %customer.name, "customer registered");
        Ok(customer)
    }

    /// Plates are normalized to upper case and must be unique.
    pub fn register_vehicle(&self, cmd: RegisterVehicle) -> EngineResult<Vehicle> {
        let vehicle = Vehicle::register(VehicleId::generate(), cmd.vehicle, cmd.occurred_at)?;
        let vehicle = self.stores.fleet.insert_vehicle(vehicle)?;

        self.audit(
            AuditRecord::new(cmd.actor, "REGISTER_VEHICLE", "vehicle", vehicle.id, cmd.occurred_at)
                .after(&vehicle),
        );
        info!(
            vehicle_id = %vehicle.id,
            plate = %vehicle.plate_number,
            class = vehicle.class.as_str(),
            "vehicle registered"
        );
        Ok(vehicle)
    }

    pub fn register_driver(&self, cmd: RegisterDriver) -> EngineResult<Driver> {
        let mut driver = Driver::register(
            DriverId::generate(),
            cmd.name,
            cmd.license_number,
            cmd.license_expiry,
            cmd.occurred_at,
        )?;
        driver.phone = cmd.phone;
        let driver = self.stores.fleet.insert_driver(driver)?;

        self.audit(
            AuditRecord::new(cmd.actor, "REGISTER_DRIVER", "driver", driver.id, cmd.occurred_at)
                .after(&driver),
        );
        info!(driver_id = %driver.id, license_expiry = %driver.license_expiry, "driver registered");
        Ok(driver)
    }
}
