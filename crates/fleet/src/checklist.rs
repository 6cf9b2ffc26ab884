//! Pre-departure safety gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, UserId};

use crate::driver::DriverId;
use crate::route::{Route, RouteId, RouteStatus};

wareflow_core::typed_id!(
    /// Checklist identifier.
    ChecklistId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TireCondition {
    Good,
    Fair,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OilLevel {
    Ok,
    Low,
}

/// Readings taken by the driver before leaving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartureReadings {
    pub tire_condition: TireCondition,
    /// Percent, 0..=100.
    pub fuel_level: u8,
    pub oil_level: OilLevel,
    pub lights_ok: bool,
    pub damage_photo_ref: Option<String>,
    pub notes: Option<String>,
}

impl DepartureReadings {
    /// Apply the three safety gates. Oil level is recorded but never gates.
    pub fn check(&self, min_fuel_level: u8) -> DomainResult<()> {
        if self.fuel_level > 100 {
            return Err(DomainError::validation("fuel level is a percentage (0-100)"));
        }
        if self.fuel_level < min_fuel_level {
            return Err(DomainError::safety(format!(
                "fuel level {}% is below the {}% minimum; refuel before departure",
                self.fuel_level, min_fuel_level
            )));
        }
        if self.tire_condition == TireCondition::Bad {
            return Err(DomainError::safety(
                "tire condition is BAD; replace tires before departure",
            ));
        }
        if !self.lights_ok {
            return Err(DomainError::safety(
                "lights are not working; repair before departure",
            ));
        }
        Ok(())
    }
}

/// Persisted checklist; only exists for readings that passed every gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreDepartureChecklist {
    pub id: ChecklistId,
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub readings: DepartureReadings,
    pub checked_by: UserId,
    pub checked_at: DateTime<Utc>,
}

impl PreDepartureChecklist {
    pub fn perform(
        id: ChecklistId,
        route: &Route,
        readings: DepartureReadings,
        min_fuel_level: u8,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if route.status != RouteStatus::InTransit {
            return Err(DomainError::conflict(format!(
                "route {} is {:?}",
                route.route_number, route.status
            )));
        }
        readings.check(min_fuel_level)?;
        Ok(Self {
            id,
            route_id: route.id,
            driver_id: route.driver_id,
            readings,
            checked_by: actor,
            checked_at: occurred_at,
        })
    }
}

impl Entity for PreDepartureChecklist {
    type Id = ChecklistId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn readings(fuel: u8) -> DepartureReadings {
        DepartureReadings {
            tire_condition: TireCondition::Good,
            fuel_level: fuel,
            oil_level: OilLevel::Low,
            lights_ok: true,
            damage_photo_ref: None,
            notes: None,
        }
    }

    #[test]
    fn fuel_gate_edge() {
        assert!(matches!(
            readings(24).check(25),
            Err(DomainError::SafetyViolation(_))
        ));
        assert!(readings(25).check(25).is_ok());
    }

    #[test]
    fn bad_tires_and_lights_fail() {
        let mut r = readings(80);
        r.tire_condition = TireCondition::Bad;
        assert!(matches!(r.check(25), Err(DomainError::SafetyViolation(_))));

        let mut r = readings(80);
        r.lights_ok = false;
        assert!(matches!(r.check(25), Err(DomainError::SafetyViolation(_))));
    }

    proptest! {
        /// Property: with tires and lights fine, the gate is exactly fuel >= minimum.
        #[test]
        fn fuel_gate_is_a_threshold(fuel in 0u8..=100, min in 0u8..=100) {
            prop_assert_eq!(readings(fuel).check(min).is_ok(), fuel >= min);
        }
    }
}
