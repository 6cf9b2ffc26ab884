use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, UserId};
use wareflow_orders::{OrderId, OrderStatus};

use crate::driver::DriverId;
use crate::vehicle::VehicleId;

wareflow_core::typed_id!(
    /// Route identifier.
    RouteId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteType {
    Local,
    Foreign,
}

/// Delivery-relevant states, mirroring the order's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    InTransit,
    Delivered,
    Cancelled,
}

/// Schedule requested for a new route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSchedule {
    pub route_type: RouteType,
    pub departure: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
}

/// Invoice document path for a route issued on `date`.
pub fn invoice_reference(route_number: &str, date: NaiveDate) -> String {
    format!("/invoices/invoice_{}_{}.pdf", route_number, date.format("%Y%m%d"))
}

/// One vehicle + driver + order delivery assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub route_number: String,
    pub order_id: OrderId,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub route_type: RouteType,
    pub departure: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub status: RouteStatus,
    pub invoice_ref: Option<String>,
    /// Order status before dispatch, restored if the route is cancelled.
    pub order_status_before: OrderStatus,
    pub auto_assigned: bool,
    pub assigned_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Route {
    #[allow(clippy::too_many_arguments)]
    pub fn assign(
        id: RouteId,
        route_number: String,
        order_id: OrderId,
        vehicle_id: VehicleId,
        driver_id: DriverId,
        schedule: RouteSchedule,
        order_status_before: OrderStatus,
        auto_assigned: bool,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            route_number,
            order_id,
            vehicle_id,
            driver_id,
            route_type: schedule.route_type,
            departure: schedule.departure,
            estimated_arrival: schedule.estimated_arrival,
            actual_arrival: None,
            status: RouteStatus::InTransit,
            invoice_ref: None,
            order_status_before,
            auto_assigned,
            assigned_by: actor,
            created_at: occurred_at,
        }
    }

    pub fn validate_schedule(schedule: &RouteSchedule) -> DomainResult<()> {
        if schedule.estimated_arrival < schedule.departure {
            return Err(DomainError::validation(
                "estimated arrival cannot precede departure",
            ));
        }
        Ok(())
    }

    pub fn complete(&mut self, actual_arrival: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_in_transit("completed")?;
        if actual_arrival < self.departure {
            return Err(DomainError::validation("arrival cannot precede departure"));
        }
        self.status = RouteStatus::Delivered;
        self.actual_arrival = Some(actual_arrival);
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        self.ensure_in_transit("cancelled")?;
        self.status = RouteStatus::Cancelled;
        Ok(())
    }

    /// Stamp the invoice reference for `date` and return it.
    pub fn attach_invoice(&mut self, date: NaiveDate) -> DomainResult<String> {
        if self.status == RouteStatus::Cancelled {
            return Err(DomainError::conflict(format!(
                "route {} is cancelled",
                self.route_number
            )));
        }
        let reference = invoice_reference(&self.route_number, date);
        self.invoice_ref = Some(reference.clone());
        Ok(reference)
    }

    fn ensure_in_transit(&self, action: &str) -> DomainResult<()> {
        if self.status != RouteStatus::InTransit {
            return Err(DomainError::conflict(format!(
                "route {} cannot be {action} from {:?}",
                self.route_number, self.status
            )));
        }
        Ok(())
    }
}

impl Entity for Route {
    type Id = RouteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn route() -> Route {
        let now = Utc::now();
        Route::assign(
            RouteId::generate(),
            "RTE-20260105-0007".into(),
            OrderId::generate(),
            VehicleId::generate(),
            DriverId::generate(),
            RouteSchedule {
                route_type: RouteType::Local,
                departure: now,
                estimated_arrival: now + Duration::hours(4),
            },
            OrderStatus::Ready,
            true,
            UserId::new(),
            now,
        )
    }

    #[test]
    fn invoice_reference_format() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(
            invoice_reference("RTE-20260105-0007", date),
            "/invoices/invoice_RTE-20260105-0007_20260105.pdf"
        );
    }

    #[test]
    fn complete_records_arrival() {
        let mut r = route();
        let arrival = r.departure + Duration::hours(3);
        r.complete(arrival).unwrap();
        assert_eq!(r.status, RouteStatus::Delivered);
        assert!(r.cancel().is_err());
    }

    #[test]
    fn schedule_must_be_ordered() {
        let now = Utc::now();
        let bad = RouteSchedule {
            route_type: RouteType::Foreign,
            departure: now,
            estimated_arrival: now - Duration::minutes(1),
        };
        assert!(Route::validate_schedule(&bad).is_err());
    }
}
