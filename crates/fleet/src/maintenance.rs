use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, UserId};

use crate::vehicle::VehicleId;

wareflow_core::typed_id!(
    /// Maintenance record identifier.
    MaintenanceId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceType {
    Preventive,
    Corrective,
    Tires,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintenance {
    pub id: MaintenanceId,
    pub vehicle_id: VehicleId,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    /// Smallest currency unit.
    pub cost: u64,
    pub performed_by: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub registered_by: UserId,
}

impl Maintenance {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: MaintenanceId,
        vehicle_id: VehicleId,
        maintenance_type: MaintenanceType,
        description: impl Into<String>,
        cost: u64,
        performed_by: Option<String>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            vehicle_id,
            maintenance_type,
            description: description.into(),
            cost,
            performed_by,
            start_date: occurred_at,
            end_date: None,
            registered_by: actor,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    pub fn close(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::conflict(format!(
                "maintenance {} is already closed",
                self.id
            )));
        }
        self.end_date = Some(occurred_at);
        Ok(())
    }
}

impl Entity for Maintenance {
    type Id = MaintenanceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_once() {
        let mut m = Maintenance::open(
            MaintenanceId::generate(),
            VehicleId::generate(),
            MaintenanceType::Tires,
            "rotate and balance",
            120_000,
            None,
            UserId::new(),
            Utc::now(),
        );
        m.close(Utc::now()).unwrap();
        assert!(!m.is_open());
        assert!(m.close(Utc::now()).is_err());
    }
}
