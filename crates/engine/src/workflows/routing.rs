//! Fleet side of fulfillment: route assignment, completion, invoicing,
//! maintenance and the pre-departure gate.
//!
//! Route assignment is a small saga; see [`crate::saga`] for the step
//! sequence and what a caller gets back when it stops midway.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use wareflow_core::{DomainError, ExpectedVersion, UserId};
use wareflow_fleet::{
    ChecklistId, DepartureReadings, Driver, DriverId, Maintenance, MaintenanceId,
    MaintenanceType, PreDepartureChecklist, Route, RouteId, RouteSchedule, Vehicle, VehicleId,
    VehicleStatus, select_driver, select_vehicle,
};
use wareflow_orders::{Order, OrderId};

use crate::audit::AuditRecord;
use crate::engine::{Engine, require};
use crate::error::{EngineError, EngineResult};
use crate::numbering::DocumentKind;
use crate::saga::{AssignmentReport, AssignmentStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRoute {
    pub order_id: OrderId,
    /// `None` picks the best available vehicle for the order's load.
    pub vehicle_id: Option<VehicleId>,
    /// `None` picks the first available driver.
    pub driver_id: Option<DriverId>,
    pub schedule: RouteSchedule,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteAssignment {
    pub route: Route,
    pub vehicle: Vehicle,
    pub driver: Driver,
    /// True when either resource was picked by the engine.
    pub auto_assigned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCommand {
    pub route_id: RouteId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRoute {
    pub route_id: RouteId,
    pub actual_arrival: DateTime<Utc>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMaintenance {
    pub vehicle_id: VehicleId,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    /// Smallest currency unit.
    pub cost: u64,
    pub performed_by: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteMaintenance {
    pub maintenance_id: MaintenanceId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreDepartureCheck {
    pub route_id: RouteId,
    pub readings: DepartureReadings,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Engine {
    /// Put an order on the road with a vehicle and a driver.
    ///
    /// Nothing is written until both resources pass their availability check.
    /// Lost races on the vehicle or driver surface as `Conflict`.
    pub fn assign_route(&self, cmd: AssignRoute) -> EngineResult<RouteAssignment> {
        let order = self.order(cmd.order_id)?;
        if !order.status.is_dispatchable() {
            return Err(DomainError::conflict(format!(
                "order {} cannot be dispatched from {:?}",
                order.order_number, order.status
            ))
            .into());
        }
        Route::validate_schedule(&cmd.schedule)?;
        let today = cmd.occurred_at.date_naive();

        let (vehicle, auto_vehicle) = self.pick_vehicle(cmd.vehicle_id, &order)?;
        let (driver, auto_driver) = self.pick_driver(cmd.driver_id, today)?;

        let mut claimed_vehicle = vehicle.clone();
        claimed_vehicle.claim_for_route()?;
        let mut claimed_driver = driver.clone();
        claimed_driver.claim_for_route(today)?;

        let mut report = AssignmentReport::new(order.id, vehicle.id, driver.id);

        let vehicle = self
            .stores
            .fleet
            .update_vehicle(claimed_vehicle, ExpectedVersion::Exact(vehicle.version))?;
        report.step_done(AssignmentStep::VehicleClaimed);

        let driver = match self
            .stores
            .fleet
            .update_driver(claimed_driver, ExpectedVersion::Exact(driver.version))
        {
            Ok(driver) => driver,
            Err(claim_err) => {
                return Err(self.release_after_failed_claim(vehicle, report, claim_err.into()));
            }
        };
        report.step_done(AssignmentStep::DriverClaimed);

        let auto_assigned = auto_vehicle || auto_driver;
        let route = match self.create_route(&cmd, &order, &vehicle, &driver, auto_assigned) {
            Ok(route) => route,
            Err(err) => {
                return Err(self.partially_applied(report.failed_at(AssignmentStep::RouteCreated, err)));
            }
        };
        report.route_id = Some(route.id);
        report.step_done(AssignmentStep::RouteCreated);

        if let Err(err) = self.dispatch_order(&order, cmd.occurred_at) {
            return Err(self.partially_applied(report.failed_at(AssignmentStep::OrderDispatched, err)));
        }

        self.audit(
            AuditRecord::new(cmd.actor, "ASSIGN_ROUTE", "route", route.id, cmd.occurred_at)
                .after(&route),
        );
        info!(
            route_id = %route.id,
            route_number = %route.route_number,
            order_id = %order.id,
            vehicle = %vehicle.plate_number,
            driver = %driver.name,
            auto_assigned,
            "route assigned"
        );
        Ok(RouteAssignment {
            route,
            vehicle,
            driver,
            auto_assigned,
        })
    }

    pub fn route(&self, route_id: RouteId) -> EngineResult<Route> {
        require(self.stores.fleet.route(route_id)?, "route", route_id)
    }

    /// Stamp the route's invoice reference for the command date.
    pub fn generate_invoice_reference(&self, cmd: RouteCommand) -> EngineResult<String> {
        let mut route = self.route(cmd.route_id)?;
        let order = self.order(route.order_id)?;
        let customer = require(
            self.stores.catalog.customer(order.customer_id)?,
            "customer",
            order.customer_id,
        )?;
        let reference = route.attach_invoice(cmd.occurred_at.date_naive())?;
        self.stores.fleet.update_route(route.clone())?;

        self.audit(
            AuditRecord::new(cmd.actor, "GENERATE_INVOICE", "route", route.id, cmd.occurred_at)
                .after(&reference),
        );
        info!(
            route_id = %route.id,
            %reference,
            customer = %customer.name,
            lines = order.lines.len(),
            total_cost = order.total_cost,
            "invoice reference generated"
        );
        Ok(reference)
    }

    /// Delivery confirmed: route and order DELIVERED, resources freed.
    pub fn complete_route(&self, cmd: CompleteRoute) -> EngineResult<Route> {
        let mut route = self.route(cmd.route_id)?;
        let mut order = self.order(route.order_id)?;
        route.complete(cmd.actual_arrival)?;
        let expected = ExpectedVersion::Exact(order.version);
        order.deliver(cmd.occurred_at)?;

        self.stores.orders.update_order(order, expected)?;
        self.stores.fleet.update_route(route.clone())?;
        self.release_resources(route.vehicle_id, route.driver_id)?;

        self.audit(
            AuditRecord::new(cmd.actor, "COMPLETE_ROUTE", "route", route.id, cmd.occurred_at)
                .after(&route.status),
        );
        info!(route_id = %route.id, arrival = %cmd.actual_arrival, "route completed");
        Ok(route)
    }

    /// Call a route off: the order goes back to where it was before assignment.
    pub fn cancel_route(&self, cmd: RouteCommand) -> EngineResult<Route> {
        let mut route = self.route(cmd.route_id)?;
        let mut order = self.order(route.order_id)?;
        route.cancel()?;
        let expected = ExpectedVersion::Exact(order.version);
        order.recall(route.order_status_before, cmd.occurred_at)?;

        self.stores.orders.update_order(order, expected)?;
        self.stores.fleet.update_route(route.clone())?;
        self.release_resources(route.vehicle_id, route.driver_id)?;

        self.audit(
            AuditRecord::new(cmd.actor, "CANCEL_ROUTE", "route", route.id, cmd.occurred_at)
                .before(&route.order_status_before)
                .after(&route.status),
        );
        info!(
            route_id = %route.id,
            order_restored_to = ?route.order_status_before,
            "route cancelled"
        );
        Ok(route)
    }

    /// Send a vehicle to the shop and schedule its next service.
    pub fn register_maintenance(&self, cmd: RegisterMaintenance) -> EngineResult<Maintenance> {
        let mut vehicle = require(
            self.stores.fleet.vehicle(cmd.vehicle_id)?,
            "vehicle",
            cmd.vehicle_id,
        )?;
        let expected = ExpectedVersion::Exact(vehicle.version);
        vehicle.enter_maintenance(self.config.maintenance_interval_months, cmd.occurred_at)?;

        let maintenance = Maintenance::open(
            MaintenanceId::generate(),
            vehicle.id,
            cmd.maintenance_type,
            cmd.description,
            cmd.cost,
            cmd.performed_by,
            cmd.actor,
            cmd.occurred_at,
        );
        let vehicle = self.stores.fleet.update_vehicle(vehicle, expected)?;
        self.stores.fleet.insert_maintenance(maintenance.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "REGISTER_MAINTENANCE",
                "vehicle",
                vehicle.id,
                cmd.occurred_at,
            )
            .after(&maintenance),
        );
        info!(
            vehicle = %vehicle.plate_number,
            maintenance_id = %maintenance.id,
            kind = ?maintenance.maintenance_type,
            next_due = ?vehicle.next_maintenance_at,
            "vehicle sent to maintenance"
        );
        Ok(maintenance)
    }

    /// Close a maintenance record; an IN_SHOP vehicle becomes AVAILABLE again.
    pub fn complete_maintenance(&self, cmd: CompleteMaintenance) -> EngineResult<Maintenance> {
        let mut maintenance = require(
            self.stores.fleet.maintenance(cmd.maintenance_id)?,
            "maintenance",
            cmd.maintenance_id,
        )?;
        maintenance.close(cmd.occurred_at)?;
        self.stores.fleet.update_maintenance(maintenance.clone())?;

        let mut vehicle = require(
            self.stores.fleet.vehicle(maintenance.vehicle_id)?,
            "vehicle",
            maintenance.vehicle_id,
        )?;
        if vehicle.status == VehicleStatus::InShop {
            let expected = ExpectedVersion::Exact(vehicle.version);
            vehicle.leave_maintenance()?;
            self.stores.fleet.update_vehicle(vehicle, expected)?;
        }

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "COMPLETE_MAINTENANCE",
                "maintenance",
                maintenance.id,
                cmd.occurred_at,
            )
            .after(&maintenance),
        );
        info!(maintenance_id = %maintenance.id, "maintenance closed");
        Ok(maintenance)
    }

    /// Run the safety gate; only a passing checklist is stored.
    pub fn perform_pre_departure_check(
        &self,
        cmd: PreDepartureCheck,
    ) -> EngineResult<PreDepartureChecklist> {
        let route = self.route(cmd.route_id)?;
        let checklist = PreDepartureChecklist::perform(
            ChecklistId::generate(),
            &route,
            cmd.readings,
            self.config.min_departure_fuel_level,
            cmd.actor,
            cmd.occurred_at,
        )
        .inspect_err(|err| {
            warn!(route_id = %route.id, error = %err, "pre-departure check failed");
        })?;
        self.stores.fleet.insert_checklist(checklist.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "PRE_DEPARTURE_CHECK",
                "route",
                route.id,
                cmd.occurred_at,
            )
            .after(&checklist),
        );
        info!(
            route_id = %route.id,
            fuel = checklist.readings.fuel_level,
            "pre-departure check passed"
        );
        Ok(checklist)
    }

    fn pick_vehicle(
        &self,
        requested: Option<VehicleId>,
        order: &Order,
    ) -> EngineResult<(Vehicle, bool)> {
        match requested {
            Some(id) => Ok((require(self.stores.fleet.vehicle(id)?, "vehicle", id)?, false)),
            None => {
                let candidates = self.stores.fleet.list_available_vehicles()?;
                let picked = select_vehicle(&candidates, order.suggested_vehicle)
                    .cloned()
                    .ok_or_else(|| DomainError::unavailable("no vehicle available"))?;
                debug!(
                    candidates = candidates.len(),
                    suggested = order.suggested_vehicle.as_str(),
                    picked = %picked.plate_number,
                    class_match = picked.class == order.suggested_vehicle,
                    "vehicle auto-selected"
                );
                Ok((picked, true))
            }
        }
    }

    fn pick_driver(
        &self,
        requested: Option<DriverId>,
        today: NaiveDate,
    ) -> EngineResult<(Driver, bool)> {
        match requested {
            Some(id) => Ok((require(self.stores.fleet.driver(id)?, "driver", id)?, false)),
            None => {
                let candidates = self.stores.fleet.list_available_drivers(today)?;
                let picked = select_driver(&candidates, today)
                    .cloned()
                    .ok_or_else(|| DomainError::unavailable("no driver available"))?;
                debug!(candidates = candidates.len(), driver_id = %picked.id, "driver auto-selected");
                Ok((picked, true))
            }
        }
    }

    fn create_route(
        &self,
        cmd: &AssignRoute,
        order: &Order,
        vehicle: &Vehicle,
        driver: &Driver,
        auto_assigned: bool,
    ) -> EngineResult<Route> {
        let id = RouteId::generate();
        self.insert_numbered(DocumentKind::Route, cmd.occurred_at.date_naive(), |number| {
            let route = Route::assign(
                id,
                number,
                order.id,
                vehicle.id,
                driver.id,
                cmd.schedule,
                order.status,
                auto_assigned,
                cmd.actor,
                cmd.occurred_at,
            );
            self.stores.fleet.insert_route(route.clone())?;
            Ok(route)
        })
    }

    /// Undo the vehicle claim after the driver claim lost. If the release
    /// itself fails the caller gets the report instead of the claim error.
    fn release_after_failed_claim(
        &self,
        vehicle: Vehicle,
        mut report: AssignmentReport,
        claim_err: EngineError,
    ) -> EngineError {
        match self.release_vehicle(vehicle) {
            Ok(_) => {
                report.step_done(AssignmentStep::VehicleReleased);
                warn!(%report, "driver claim lost; vehicle released");
                claim_err
            }
            Err(release_err) => self.partially_applied(report.failed_at(
                AssignmentStep::VehicleReleased,
                format!("{claim_err}; release failed: {release_err}"),
            )),
        }
    }

    fn partially_applied(&self, report: AssignmentReport) -> EngineError {
        error!(%report, "route assignment left partially applied");
        EngineError::PartiallyApplied(Box::new(report))
    }

    fn dispatch_order(&self, order: &Order, occurred_at: DateTime<Utc>) -> EngineResult<()> {
        let mut dispatched = order.clone();
        dispatched.dispatch(occurred_at)?;
        self.stores
            .orders
            .update_order(dispatched, ExpectedVersion::Exact(order.version))?;
        Ok(())
    }

    fn release_vehicle(&self, mut vehicle: Vehicle) -> EngineResult<Vehicle> {
        let expected = ExpectedVersion::Exact(vehicle.version);
        vehicle.release_from_route()?;
        Ok(self.stores.fleet.update_vehicle(vehicle, expected)?)
    }

    fn release_resources(&self, vehicle_id: VehicleId, driver_id: DriverId) -> EngineResult<()> {
        let vehicle = require(self.stores.fleet.vehicle(vehicle_id)?, "vehicle", vehicle_id)?;
        self.release_vehicle(vehicle)?;

        let mut driver = require(self.stores.fleet.driver(driver_id)?, "driver", driver_id)?;
        let expected = ExpectedVersion::Exact(driver.version);
        driver.release_from_route()?;
        self.stores.fleet.update_driver(driver, expected)?;
        Ok(())
    }
}
