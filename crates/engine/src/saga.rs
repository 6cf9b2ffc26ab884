//! Bookkeeping for multi-row write sequences that can stop midway.
//!
//! ## Route assignment
//!
//! Assigning a route touches four rows that no store call covers together:
//!
//! ```text
//! 1. claim vehicle   (AVAILABLE -> ON_ROUTE, version-guarded)
//!   ↓                 on failure: nothing written
//! 2. claim driver    (AVAILABLE -> ON_ROUTE, version-guarded)
//!   ↓                 on failure: release vehicle
//! 3. create route
//!   ↓
//! 4. dispatch order  (-> IN_TRANSIT, version-guarded)
//! ```
//!
//! Once both claims are written, a failure is not compensated here. The caller
//! receives an [`AssignmentReport`] naming every step that landed and the one
//! that failed, so a repair process can finish or undo the assignment.
//!
//! ## Order cancellation
//!
//! The CANCELLED order row is written before the RETURN movements. Returns are
//! additive, so a lost lot version race is retried against fresh lots; if the
//! retries run out the caller gets a [`CancellationReport`] with the units
//! still owed to each lot.

use std::fmt;

use serde::{Deserialize, Serialize};

use wareflow_fleet::{DriverId, RouteId, VehicleId};
use wareflow_inventory::LotId;
use wareflow_orders::OrderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStep {
    VehicleClaimed,
    DriverClaimed,
    VehicleReleased,
    RouteCreated,
    OrderDispatched,
}

/// What a route assignment managed to write before it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub order_id: OrderId,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub route_id: Option<RouteId>,
    pub completed: Vec<AssignmentStep>,
    pub failed_step: AssignmentStep,
    pub failure: String,
}

impl AssignmentReport {
    pub(crate) fn new(order_id: OrderId, vehicle_id: VehicleId, driver_id: DriverId) -> Self {
        Self {
            order_id,
            vehicle_id,
            driver_id,
            route_id: None,
            completed: Vec::new(),
            failed_step: AssignmentStep::VehicleClaimed,
            failure: String::new(),
        }
    }

    pub(crate) fn step_done(&mut self, step: AssignmentStep) {
        self.completed.push(step);
    }

    pub(crate) fn failed_at(mut self, step: AssignmentStep, failure: impl fmt::Display) -> Self {
        self.failed_step = step;
        self.failure = failure.to_string();
        self
    }

    pub fn has_completed(&self, step: AssignmentStep) -> bool {
        self.completed.contains(&step)
    }
}

impl fmt::Display for AssignmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order {} stopped at {:?} after {:?}: {}",
            self.order_id, self.failed_step, self.completed, self.failure
        )
    }
}

/// Units a cancelled order could not put back on one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReturn {
    pub lot_id: LotId,
    pub quantity: i64,
}

/// A cancellation whose order row landed but whose stock returns did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReport {
    pub order_id: OrderId,
    pub attempts: u32,
    pub pending: Vec<PendingReturn>,
    pub failure: String,
}

impl CancellationReport {
    pub fn pending_units(&self) -> i64 {
        self.pending.iter().map(|p| p.quantity).sum()
    }
}

impl fmt::Display for CancellationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order {} still owes {} units to {} lots after {} attempts: {}",
            self.order_id,
            self.pending_units(),
            self.pending.len(),
            self.attempts,
            self.failure
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_completed_and_failed_steps() {
        let mut report =
            AssignmentReport::new(OrderId::generate(), VehicleId::generate(), DriverId::generate());
        report.step_done(AssignmentStep::VehicleClaimed);
        report.step_done(AssignmentStep::DriverClaimed);
        let report = report.failed_at(AssignmentStep::RouteCreated, "backend down");

        assert!(report.has_completed(AssignmentStep::DriverClaimed));
        assert!(!report.has_completed(AssignmentStep::OrderDispatched));
        let text = report.to_string();
        assert!(text.contains("RouteCreated"));
        assert!(text.contains("backend down"));
    }
}
