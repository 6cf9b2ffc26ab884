//! Inbound receiving: order creation, blind count, validation into lots,
//! discrepancy resolution and customer returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use wareflow_catalog::{ProductId, SupplierId};
use wareflow_core::{DomainError, UserId};
use wareflow_inventory::{Lot, LotId, MovementContext, MovementReference, MovementType};
use wareflow_reception::{
    CountSheetLine, CustomerReturn, Discrepancy, DiscrepancyId, DiscrepancyStatus, LineCount,
    NewReceptionLine, ProductCondition, ReceptionOrder, ReceptionOrderId, ReceptionStatus,
    ReturnId,
};

use crate::audit::AuditRecord;
use crate::engine::{Engine, require};
use crate::error::EngineResult;
use crate::numbering::DocumentKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReceptionOrder {
    pub supplier_id: SupplierId,
    pub invoice_ref: String,
    pub notes: Option<String>,
    pub lines: Vec<NewReceptionLine>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Counted quantities for some lines of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindCount {
    pub order_id: ReceptionOrderId,
    pub counts: Vec<LineCount>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlindCountOutcome {
    pub status: ReceptionStatus,
    pub discrepancies: Vec<Discrepancy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionCommand {
    pub order_id: ReceptionOrderId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub order: ReceptionOrder,
    /// Lots opened for the counted lines, in line order.
    pub lots: Vec<Lot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveDiscrepancy {
    pub discrepancy_id: DiscrepancyId,
    pub status: DiscrepancyStatus,
    pub notes: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReturn {
    pub product_id: ProductId,
    pub quantity: i64,
    pub condition: ProductCondition,
    pub reason: String,
    pub evidence_ref: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Engine {
    /// Open a PENDING reception order under a fresh `REC-` number.
    pub fn create_reception_order(
        &self,
        cmd: CreateReceptionOrder,
    ) -> EngineResult<ReceptionOrder> {
        let supplier = require(
            self.stores.catalog.supplier(cmd.supplier_id)?,
            "supplier",
            cmd.supplier_id,
        )?;
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("a reception order needs at least one line").into());
        }
        for line in &cmd.lines {
            require(
                self.stores.catalog.product(line.product_id)?,
                "product",
                line.product_id,
            )?;
        }

        let id = ReceptionOrderId::generate();
        let order = self.insert_numbered(
            DocumentKind::Reception,
            cmd.occurred_at.date_naive(),
            |number| {
                let order = ReceptionOrder::create(
                    id,
                    number,
                    &supplier,
                    cmd.invoice_ref.clone(),
                    cmd.notes.clone(),
                    cmd.lines.clone(),
                    cmd.actor,
                    cmd.occurred_at,
                )?;
                self.stores.reception.insert_order(order.clone())?;
                Ok(order)
            },
        )?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "CREATE_RECEPTION_ORDER",
                "reception_order",
                order.id,
                cmd.occurred_at,
            )
            .after(&order),
        );
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            lines = order.lines.len(),
            "reception order created"
        );
        Ok(order)
    }

    /// What counters get to see: no expected quantities.
    pub fn count_sheet(&self, order_id: ReceptionOrderId) -> EngineResult<Vec<CountSheetLine>> {
        let order = require(
            self.stores.reception.order(order_id)?,
            "reception order",
            order_id,
        )?;
        Ok(order.count_sheet())
    }

    /// Record blind counts; mismatching lines raise DETECTED discrepancies.
    pub fn blind_count(&self, cmd: BlindCount) -> EngineResult<BlindCountOutcome> {
        let mut order = require(
            self.stores.reception.order(cmd.order_id)?,
            "reception order",
            cmd.order_id,
        )?;

        // A line of another order is an ownership problem; an unknown line is missing.
        if order.status == ReceptionStatus::Pending {
            for count in &cmd.counts {
                if order.line(count.line_id).is_some() {
                    continue;
                }
                if self.stores.reception.order_of_line(count.line_id)?.is_none() {
                    return Err(DomainError::not_found("reception line", count.line_id).into());
                }
            }
        }

        let before = order.status;
        let discrepancies = order.blind_count(&cmd.counts, cmd.actor, cmd.occurred_at)?;
        self.stores
            .reception
            .record_count(order.clone(), discrepancies.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "BLIND_COUNT",
                "reception_order",
                order.id,
                cmd.occurred_at,
            )
            .before(&before)
            .after(&order.status),
        );
        info!(
            order_id = %order.id,
            counted = cmd.counts.len(),
            discrepancies = discrepancies.len(),
            status = ?order.status,
            "blind count recorded"
        );
        Ok(BlindCountOutcome {
            status: order.status,
            discrepancies,
        })
    }

    /// Validate a counted order and open one lot per usable counted line.
    pub fn validate_reception(&self, cmd: ReceptionCommand) -> EngineResult<ValidationOutcome> {
        let mut order = require(
            self.stores.reception.order(cmd.order_id)?,
            "reception order",
            cmd.order_id,
        )?;
        let discrepancies = self.stores.reception.discrepancies_for_order(order.id)?;
        let plan = order.validate(&discrepancies, cmd.actor, cmd.occurred_at)?;

        // Status first: a second validation attempt now fails with Conflict.
        self.stores.reception.update_order(order.clone())?;

        let mut lots = Vec::with_capacity(plan.len());
        for item in plan {
            let ctx = MovementContext::new(cmd.actor, cmd.occurred_at)
                .with_reference(MovementReference::ReceptionOrder(order.id.0));
            let (lot, opening) =
                Lot::open(LotId::generate(), item.lot, item.quantity, MovementType::In, ctx)?;
            lots.push(self.stores.inventory.insert_lot(lot, opening)?);
        }

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "VALIDATE_RECEPTION",
                "reception_order",
                order.id,
                cmd.occurred_at,
            )
            .after(&order.status),
        );
        info!(
            order_id = %order.id,
            lots_opened = lots.len(),
            "reception order validated"
        );
        Ok(ValidationOutcome { order, lots })
    }

    pub fn complete_reception(&self, cmd: ReceptionCommand) -> EngineResult<ReceptionOrder> {
        let mut order = require(
            self.stores.reception.order(cmd.order_id)?,
            "reception order",
            cmd.order_id,
        )?;
        order.complete(cmd.occurred_at)?;
        self.stores.reception.update_order(order.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "COMPLETE_RECEPTION",
                "reception_order",
                order.id,
                cmd.occurred_at,
            )
            .after(&order.status),
        );
        info!(order_id = %order.id, "reception order completed");
        Ok(order)
    }

    pub fn resolve_discrepancy(&self, cmd: ResolveDiscrepancy) -> EngineResult<Discrepancy> {
        let mut discrepancy = require(
            self.stores.reception.discrepancy(cmd.discrepancy_id)?,
            "discrepancy",
            cmd.discrepancy_id,
        )?;
        let before = discrepancy.status;
        discrepancy.resolve(cmd.status, cmd.notes, cmd.actor, cmd.occurred_at)?;
        self.stores
            .reception
            .update_discrepancy(discrepancy.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "RESOLVE_DISCREPANCY",
                "discrepancy",
                discrepancy.id,
                cmd.occurred_at,
            )
            .before(&before)
            .after(&discrepancy.status),
        );
        info!(
            discrepancy_id = %discrepancy.id,
            status = ?discrepancy.status,
            "discrepancy updated"
        );
        Ok(discrepancy)
    }

    /// Take a customer return: quarantine lot for reusable goods, nothing for scrap.
    pub fn register_return(&self, cmd: RegisterReturn) -> EngineResult<CustomerReturn> {
        require(
            self.stores.catalog.product(cmd.product_id)?,
            "product",
            cmd.product_id,
        )?;
        let mut customer_return = CustomerReturn::register(
            ReturnId::generate(),
            cmd.product_id,
            cmd.quantity,
            cmd.condition,
            &cmd.reason,
            cmd.evidence_ref,
            cmd.actor,
            cmd.occurred_at,
        )?;

        if let Some(new_lot) = customer_return.quarantine_lot() {
            let mut ctx = MovementContext::new(cmd.actor, cmd.occurred_at)
                .with_reference(MovementReference::CustomerReturn(customer_return.id.0))
                .with_reason(customer_return.reason.clone());
            if let Some(evidence) = &customer_return.evidence_ref {
                ctx = ctx.with_evidence(evidence.clone());
            }
            let (lot, opening) = Lot::open(
                LotId::generate(),
                new_lot,
                customer_return.quantity,
                MovementType::Return,
                ctx,
            )?;
            let lot = self.stores.inventory.insert_lot(lot, opening)?;
            customer_return.lot_id = Some(lot.id);
        }
        self.stores
            .reception
            .insert_return(customer_return.clone())?;

        self.audit(
            AuditRecord::new(
                cmd.actor,
                "REGISTER_RETURN",
                "customer_return",
                customer_return.id,
                cmd.occurred_at,
            )
            .after(&customer_return),
        );
        info!(
            return_id = %customer_return.id,
            disposition = ?customer_return.disposition,
            quantity = customer_return.quantity,
            "customer return registered"
        );
        Ok(customer_return)
    }
}
