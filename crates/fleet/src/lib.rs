//! Fleet domain module.
//!
//! Vehicles, drivers, routes, maintenance and the pre-departure safety gate,
//! plus the greedy availability matching used by route assignment.

pub mod checklist;
pub mod driver;
pub mod maintenance;
pub mod route;
pub mod selection;
pub mod vehicle;

pub use checklist::{ChecklistId, DepartureReadings, OilLevel, PreDepartureChecklist, TireCondition};
pub use driver::{Driver, DriverId, DriverStatus};
pub use maintenance::{Maintenance, MaintenanceId, MaintenanceType};
pub use route::{Route, RouteId, RouteSchedule, RouteStatus, RouteType, invoice_reference};
pub use selection::{select_driver, select_vehicle};
pub use vehicle::{NewVehicle, Vehicle, VehicleId, VehicleStatus};
