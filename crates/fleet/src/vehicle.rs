use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, Versioned};
use wareflow_orders::VehicleClass;

wareflow_core::typed_id!(
    /// Vehicle identifier.
    VehicleId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Available,
    OnRoute,
    InShop,
    OutOfService,
}

/// Input for registering a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    pub plate_number: String,
    pub class: VehicleClass,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<u16>,
    pub capacity_kg: f64,
    pub capacity_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub plate_number: String,
    pub class: VehicleClass,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<u16>,
    pub capacity_kg: f64,
    pub capacity_m3: f64,
    pub status: VehicleStatus,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub next_maintenance_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Vehicle {
    pub fn register(id: VehicleId, input: NewVehicle, occurred_at: DateTime<Utc>) -> DomainResult<Self> {
        let plate = input.plate_number.trim().to_uppercase();
        if plate.is_empty() {
            return Err(DomainError::validation("plate_number cannot be empty"));
        }
        if !(input.capacity_kg.is_finite() && input.capacity_kg > 0.0)
            || !(input.capacity_m3.is_finite() && input.capacity_m3 > 0.0)
        {
            return Err(DomainError::validation("capacities must be positive"));
        }
        Ok(Self {
            id,
            plate_number: plate,
            class: input.class,
            make: input.make,
            model: input.model,
            year: input.year,
            capacity_kg: input.capacity_kg,
            capacity_m3: input.capacity_m3,
            status: VehicleStatus::Available,
            last_maintenance_at: None,
            next_maintenance_at: None,
            active: true,
            created_at: occurred_at,
            version: 0,
        })
    }

    pub fn is_available_for_route(&self) -> bool {
        self.status == VehicleStatus::Available && self.active
    }

    pub fn claim_for_route(&mut self) -> DomainResult<()> {
        if !self.is_available_for_route() {
            return Err(DomainError::unavailable(format!(
                "vehicle {} is not available ({:?}, active: {})",
                self.plate_number, self.status, self.active
            )));
        }
        self.status = VehicleStatus::OnRoute;
        Ok(())
    }

    pub fn release_from_route(&mut self) -> DomainResult<()> {
        if self.status != VehicleStatus::OnRoute {
            return Err(DomainError::conflict(format!(
                "vehicle {} is not on a route",
                self.plate_number
            )));
        }
        self.status = VehicleStatus::Available;
        Ok(())
    }

    /// Send to the shop and schedule the next service `interval_months` out.
    pub fn enter_maintenance(
        &mut self,
        interval_months: u32,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status == VehicleStatus::OnRoute {
            return Err(DomainError::conflict(format!(
                "vehicle {} is on a route",
                self.plate_number
            )));
        }
        let next = occurred_at
            .checked_add_months(Months::new(interval_months))
            .ok_or_else(|| DomainError::validation("maintenance interval out of range"))?;
        self.status = VehicleStatus::InShop;
        self.last_maintenance_at = Some(occurred_at);
        self.next_maintenance_at = Some(next);
        Ok(())
    }

    pub fn leave_maintenance(&mut self) -> DomainResult<()> {
        if self.status != VehicleStatus::InShop {
            return Err(DomainError::conflict(format!(
                "vehicle {} is not in the shop",
                self.plate_number
            )));
        }
        self.status = VehicleStatus::Available;
        Ok(())
    }
}

impl Entity for Vehicle {
    type Id = VehicleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for Vehicle {
    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn van() -> Vehicle {
        Vehicle::register(
            VehicleId::generate(),
            NewVehicle {
                plate_number: "abc-123".into(),
                class: VehicleClass::Van,
                make: None,
                model: None,
                year: Some(2022),
                capacity_kg: 1_500.0,
                capacity_m3: 10.0,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn inactive_vehicle_is_not_available() {
        let mut v = van();
        assert!(v.is_available_for_route());
        v.active = false;
        assert!(matches!(
            v.claim_for_route(),
            Err(DomainError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn claim_then_release() {
        let mut v = van();
        v.claim_for_route().unwrap();
        assert!(v.claim_for_route().is_err());
        v.release_from_route().unwrap();
        assert_eq!(v.status, VehicleStatus::Available);
    }

    #[test]
    fn maintenance_schedules_three_months_out() {
        let mut v = van();
        let at = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        v.enter_maintenance(3, at).unwrap();
        assert_eq!(v.status, VehicleStatus::InShop);
        assert_eq!(
            v.next_maintenance_at,
            Some(Utc.with_ymd_and_hms(2026, 4, 30, 9, 0, 0).unwrap())
        );
        v.leave_maintenance().unwrap();
        assert!(v.is_available_for_route());
    }

    #[test]
    fn vehicle_on_route_cannot_enter_the_shop() {
        let mut v = van();
        v.claim_for_route().unwrap();
        assert!(matches!(
            v.enter_maintenance(3, Utc::now()),
            Err(DomainError::Conflict(_))
        ));
    }
}
