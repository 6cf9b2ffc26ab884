use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity};

use crate::product::Brand;

wareflow_core::typed_id!(
    /// Supplier identifier.
    SupplierId
);

wareflow_core::typed_id!(
    /// Customer identifier.
    CustomerId
);

/// Contact information for a supplier or customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Supplier delivering stock against reception orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub brand: Brand,
    pub tax_id: String,
    pub contact: ContactInfo,
    pub active: bool,
}

impl Supplier {
    pub fn register(
        id: SupplierId,
        name: impl Into<String>,
        brand: Brand,
        tax_id: impl Into<String>,
        contact: ContactInfo,
    ) -> DomainResult<Self> {
        let name = require("name", name.into())?;
        let tax_id = require("tax_id", tax_id.into())?;
        Ok(Self {
            id,
            name,
            brand,
            tax_id,
            contact,
            active: true,
        })
    }

    /// Inactive suppliers cannot receive new reception orders.
    pub fn can_transact(&self) -> bool {
        self.active
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Customer placing outbound orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub tax_id: String,
    pub address: String,
    pub contact: ContactInfo,
    /// Credit limit in smallest currency unit.
    pub credit_limit: u64,
    pub active: bool,
}

impl Customer {
    pub fn register(
        id: CustomerId,
        name: impl Into<String>,
        tax_id: impl Into<String>,
        address: impl Into<String>,
        contact: ContactInfo,
        credit_limit: u64,
    ) -> DomainResult<Self> {
        let name = require("name", name.into())?;
        let tax_id = require("tax_id", tax_id.into())?;
        let address = require("address", address.into())?;
        Ok(Self {
            id,
            name,
            tax_id,
            address,
            contact,
            credit_limit,
            active: true,
        })
    }

    pub fn can_transact(&self) -> bool {
        self.active
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn require(field: &str, value: String) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
