//! Reception domain module.
//!
//! Inbound receiving orders, blind counting, discrepancy lifecycle and customer
//! returns. Pure logic: the engine persists the results and opens lots.

pub mod discrepancy;
pub mod order;
pub mod returns;

pub use discrepancy::{Discrepancy, DiscrepancyId, DiscrepancyStatus};
pub use order::{
    CountSheetLine, DEFAULT_RECEIVING_LOCATION, LineCount, LotMaterialization, NewReceptionLine,
    ProductCondition, ReceptionLine, ReceptionLineId, ReceptionOrder, ReceptionOrderId,
    ReceptionStatus,
};
pub use returns::{CustomerReturn, QUARANTINE_LOCATION, ReturnDisposition, ReturnId};
