use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, UserId, Versioned};

wareflow_core::typed_id!(
    /// Driver identifier.
    DriverId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Available,
    OnRoute,
    Rest,
    OnLeave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub license_number: String,
    pub license_expiry: NaiveDate,
    pub phone: Option<String>,
    pub status: DriverStatus,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Driver {
    pub fn register(
        id: DriverId,
        name: impl Into<String>,
        license_number: impl Into<String>,
        license_expiry: NaiveDate,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        let license_number = license_number.into().trim().to_string();
        if name.is_empty() || license_number.is_empty() {
            return Err(DomainError::validation(
                "driver name and license number are required",
            ));
        }
        Ok(Self {
            id,
            user_id: None,
            name,
            license_number,
            license_expiry,
            phone: None,
            status: DriverStatus::Available,
            active: true,
            created_at: occurred_at,
            version: 0,
        })
    }

    /// AVAILABLE, active, and licensed beyond `today`.
    pub fn is_available_for_route(&self, today: NaiveDate) -> bool {
        self.status == DriverStatus::Available && self.active && today < self.license_expiry
    }

    pub fn claim_for_route(&mut self, today: NaiveDate) -> DomainResult<()> {
        if !self.is_available_for_route(today) {
            return Err(DomainError::unavailable(format!(
                "driver {} is not available ({:?}, active: {}, license expires {})",
                self.name, self.status, self.active, self.license_expiry
            )));
        }
        self.status = DriverStatus::OnRoute;
        Ok(())
    }

    pub fn release_from_route(&mut self) -> DomainResult<()> {
        if self.status != DriverStatus::OnRoute {
            return Err(DomainError::conflict(format!(
                "driver {} is not on a route",
                self.name
            )));
        }
        self.status = DriverStatus::Available;
        Ok(())
    }
}

impl Entity for Driver {
    type Id = DriverId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for Driver {
    fn version(&self) -> u64 {
        self.version
    }
}
