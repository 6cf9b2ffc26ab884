//! Outbound orders domain module.
//!
//! This crate contains the order fulfillment planner: order aggregation,
//! load-planning heuristics and the order status lifecycle, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod planning;

pub use order::{Order, OrderId, OrderLine, OrderStatus, PlannedLine};
pub use planning::{LoadPlan, LoadingAlert, VehicleClass, loading_efficiency, suggest_vehicle};
pub use wareflow_inventory::Reservation;
