//! Workflow entry points, one module per area. Each adds methods to
//! [`Engine`](crate::Engine) and defines the commands those methods take.

pub mod ledger;
pub mod planner;
pub mod reception;
pub mod registry;
pub mod routing;

pub use ledger::{
    CycleCountOutcome, ExpireLots, GenerateCycleCounts, PerformCycleCount, RegisterDamage,
    StockFilter, UNASSIGNED_LOCATION,
};
pub use planner::{CreateOrder, OrderCommand, RequestedLine};
pub use reception::{
    BlindCount, BlindCountOutcome, CreateReceptionOrder, ReceptionCommand, RegisterReturn,
    ResolveDiscrepancy, ValidationOutcome,
};
pub use registry::{
    RegisterCustomer, RegisterDriver, RegisterProduct, RegisterSupplier, RegisterVehicle,
};
pub use routing::{
    AssignRoute, CompleteMaintenance, CompleteRoute, PreDepartureCheck, RegisterMaintenance,
    RouteAssignment, RouteCommand,
};
