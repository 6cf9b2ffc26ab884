use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wareflow_catalog::{Brand, ProductId, Supplier, SupplierId};
use wareflow_core::{DomainError, DomainResult, Entity, UserId};
use wareflow_inventory::{LotStatus, NewLot};

use crate::discrepancy::{Discrepancy, DiscrepancyId};

wareflow_core::typed_id!(
    /// Reception order identifier.
    ReceptionOrderId
);

wareflow_core::typed_id!(
    /// Reception line identifier.
    ReceptionLineId
);

/// Location lots land in when a line does not name one.
pub const DEFAULT_RECEIVING_LOCATION: &str = "RECEIVING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceptionStatus {
    Pending,
    Counting,
    Validated,
    HasDiscrepancy,
    Completed,
}

/// Physical condition of received (or returned) goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCondition {
    Fit,
    Scrap,
    Quarantine,
}

impl ProductCondition {
    /// Status of the lot materialised for goods in this condition; scrap gets none.
    pub fn lot_status(&self) -> Option<LotStatus> {
        match self {
            ProductCondition::Fit => Some(LotStatus::Available),
            ProductCondition::Quarantine => Some(LotStatus::Quarantine),
            ProductCondition::Scrap => None,
        }
    }
}

/// Requested line when creating a reception order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceptionLine {
    pub product_id: ProductId,
    pub expected_quantity: i64,
    pub lot_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionLine {
    pub id: ReceptionLineId,
    pub product_id: ProductId,
    pub expected_quantity: i64,
    pub counted_quantity: Option<i64>,
    pub lot_number: String,
    pub expiration_date: Option<NaiveDate>,
    pub location: String,
    pub condition: ProductCondition,
    pub counted_by: Option<UserId>,
    pub counted_at: Option<DateTime<Utc>>,
}

impl ReceptionLine {
    pub fn has_discrepancy(&self) -> bool {
        self.counted_quantity
            .is_some_and(|counted| counted != self.expected_quantity)
    }
}

/// What a counter is allowed to see: no expected quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSheetLine {
    pub line_id: ReceptionLineId,
    pub product_id: ProductId,
    pub lot_number: String,
    pub expiration_date: Option<NaiveDate>,
}

/// One submitted physical count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCount {
    pub line_id: ReceptionLineId,
    pub counted_quantity: i64,
    pub condition: Option<ProductCondition>,
}

/// A lot to open once the order is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotMaterialization {
    pub line_id: ReceptionLineId,
    pub lot: NewLot,
    pub quantity: i64,
}

/// Inbound receiving order; owns its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionOrder {
    pub id: ReceptionOrderId,
    pub order_number: String,
    pub supplier_id: SupplierId,
    pub brand: Brand,
    pub invoice_ref: String,
    pub notes: Option<String>,
    pub status: ReceptionStatus,
    pub lines: Vec<ReceptionLine>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub received_by: Option<UserId>,
    pub received_at: Option<DateTime<Utc>>,
    pub validated_by: Option<UserId>,
    pub validated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReceptionOrder {
    /// Build a PENDING order with every line in condition FIT.
    ///
    /// Lines without a lot number get `<order number>-<line #>`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: ReceptionOrderId,
        order_number: String,
        supplier: &Supplier,
        invoice_ref: impl Into<String>,
        notes: Option<String>,
        lines: Vec<NewReceptionLine>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation(
                "a reception order needs at least one line",
            ));
        }
        if !supplier.can_transact() {
            return Err(DomainError::conflict(format!(
                "supplier {} is inactive",
                supplier.id
            )));
        }

        let mut built = Vec::with_capacity(lines.len());
        for (idx, line) in lines.into_iter().enumerate() {
            if line.expected_quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {}: expected quantity must be positive",
                    idx + 1
                )));
            }
            let lot_number = line
                .lot_number
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("{order_number}-{:02}", idx + 1));
            built.push(ReceptionLine {
                id: ReceptionLineId::generate(),
                product_id: line.product_id,
                expected_quantity: line.expected_quantity,
                counted_quantity: None,
                lot_number,
                expiration_date: line.expiration_date,
                location: line
                    .location
                    .unwrap_or_else(|| DEFAULT_RECEIVING_LOCATION.to_string()),
                condition: ProductCondition::Fit,
                counted_by: None,
                counted_at: None,
            });
        }

        Ok(Self {
            id,
            order_number,
            supplier_id: supplier.id,
            brand: supplier.brand.clone(),
            invoice_ref: invoice_ref.into(),
            notes,
            status: ReceptionStatus::Pending,
            lines: built,
            created_by: actor,
            created_at: occurred_at,
            received_by: None,
            received_at: None,
            validated_by: None,
            validated_at: None,
            completed_at: None,
        })
    }

    pub fn line(&self, line_id: ReceptionLineId) -> Option<&ReceptionLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn count_sheet(&self) -> Vec<CountSheetLine> {
        self.lines
            .iter()
            .map(|l| CountSheetLine {
                line_id: l.id,
                product_id: l.product_id,
                lot_number: l.lot_number.clone(),
                expiration_date: l.expiration_date,
            })
            .collect()
    }

    /// Record blind counts and raise one discrepancy per mismatching line.
    ///
    /// Counts may arrive over several submissions; the order stays PENDING
    /// until its last line is counted. All submissions are checked before
    /// any line is touched.
    pub fn blind_count(
        &mut self,
        counts: &[LineCount],
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<Discrepancy>> {
        if self.status != ReceptionStatus::Pending {
            return Err(DomainError::conflict(format!(
                "reception order {} was already counted or validated",
                self.order_number
            )));
        }
        if counts.is_empty() {
            return Err(DomainError::validation("no counted lines submitted"));
        }

        let mut seen = HashSet::new();
        for count in counts {
            let Some(line) = self.line(count.line_id) else {
                return Err(DomainError::ownership(format!(
                    "line {} does not belong to reception order {}",
                    count.line_id, self.order_number
                )));
            };
            if line.counted_quantity.is_some() {
                return Err(DomainError::conflict(format!(
                    "line {} was already counted",
                    count.line_id
                )));
            }
            if !seen.insert(count.line_id) {
                return Err(DomainError::validation(format!(
                    "line {} submitted more than once",
                    count.line_id
                )));
            }
            if count.counted_quantity < 0 {
                return Err(DomainError::validation(
                    "counted quantity cannot be negative",
                ));
            }
        }

        let order_id = self.id;
        let mut discrepancies = Vec::new();
        for count in counts {
            let Some(line) = self.lines.iter_mut().find(|l| l.id == count.line_id) else {
                continue;
            };
            line.counted_quantity = Some(count.counted_quantity);
            line.counted_by = Some(actor);
            line.counted_at = Some(occurred_at);
            if let Some(condition) = count.condition {
                line.condition = condition;
            }
            if line.has_discrepancy() {
                discrepancies.push(Discrepancy::detect(
                    DiscrepancyId::generate(),
                    order_id,
                    line,
                    occurred_at,
                ));
            }
        }

        if self.lines.iter().all(|l| l.counted_quantity.is_some()) {
            self.status = if self.lines.iter().any(ReceptionLine::has_discrepancy) {
                ReceptionStatus::HasDiscrepancy
            } else {
                ReceptionStatus::Counting
            };
            self.received_by = Some(actor);
            self.received_at = Some(occurred_at);
        }
        Ok(discrepancies)
    }

    /// Validate the count and return the lots to open.
    ///
    /// `discrepancies` must be every discrepancy raised for this order.
    pub fn validate(
        &mut self,
        discrepancies: &[Discrepancy],
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<LotMaterialization>> {
        match self.status {
            ReceptionStatus::Counting => {}
            ReceptionStatus::HasDiscrepancy => {
                if let Some(open) = discrepancies.iter().find(|d| !d.status.is_terminal()) {
                    return Err(DomainError::conflict(format!(
                        "discrepancy {} is still {:?}",
                        open.id, open.status
                    )));
                }
            }
            other => {
                return Err(DomainError::conflict(format!(
                    "reception order {} cannot be validated from {other:?}",
                    self.order_number
                )));
            }
        }
        if let Some(line) = self.lines.iter().find(|l| l.counted_quantity.is_none()) {
            return Err(DomainError::conflict(format!(
                "line {} has not been counted",
                line.id
            )));
        }

        let plan = self
            .lines
            .iter()
            .filter_map(|line| {
                let counted = line.counted_quantity.unwrap_or_default();
                let status = line.condition.lot_status()?;
                (counted > 0).then(|| LotMaterialization {
                    line_id: line.id,
                    lot: NewLot {
                        product_id: line.product_id,
                        lot_number: line.lot_number.clone(),
                        expiration_date: line.expiration_date,
                        location: line.location.clone(),
                        status,
                    },
                    quantity: counted,
                })
            })
            .collect();

        self.status = ReceptionStatus::Validated;
        self.validated_by = Some(actor);
        self.validated_at = Some(occurred_at);
        Ok(plan)
    }

    pub fn complete(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != ReceptionStatus::Validated {
            return Err(DomainError::conflict(format!(
                "reception order {} must be validated before completion",
                self.order_number
            )));
        }
        self.status = ReceptionStatus::Completed;
        self.completed_at = Some(occurred_at);
        Ok(())
    }
}

impl Entity for ReceptionOrder {
    type Id = ReceptionOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
