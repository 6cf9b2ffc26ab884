//! First-Expired-First-Out ordering and first-fit allocation.
//!
//! This is the single allocation policy: order reservation and the stock
//! monitor both read lots through [`fefo_lots`].

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::lot::{Lot, LotId};

/// FEFO comparator: dated lots by expiration ascending, undated lots last,
/// ties broken by creation time then id.
///
/// Lot ids are UUIDv7, so within one process the id tie-break follows the
/// order lots were opened in. The result never depends on input order.
pub fn fefo_cmp(a: &Lot, b: &Lot) -> Ordering {
    let by_expiry = match (a.expiration_date, b.expiration_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Allocatable lots (AVAILABLE with quantity > 0) in FEFO order.
pub fn fefo_lots(lots: impl IntoIterator<Item = Lot>) -> Vec<Lot> {
    let mut selected: Vec<Lot> = lots.into_iter().filter(Lot::is_allocatable).collect();
    selected.sort_by(fefo_cmp);
    selected
}

/// Outcome of reserving one order line against the FEFO sequence.
///
/// Lines are never split across lots: a line needing more than any single lot
/// holds is reported as partially reservable instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reservation {
    /// The first lot in FEFO order able to cover the whole quantity.
    Reserved { lot_id: LotId },
    /// Some stock exists, but no single lot covers the request.
    PartiallyReserved { best_available: i64 },
    /// No allocatable stock at all.
    Unavailable,
}

impl Reservation {
    pub fn lot_id(&self) -> Option<LotId> {
        match self {
            Reservation::Reserved { lot_id } => Some(*lot_id),
            _ => None,
        }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved { .. })
    }
}

/// First-fit over an already FEFO-ordered slice.
pub fn first_fit(fefo_ordered: &[Lot], quantity: i64) -> Reservation {
    if let Some(lot) = fefo_ordered.iter().find(|lot| lot.quantity >= quantity) {
        return Reservation::Reserved { lot_id: lot.id };
    }
    match fefo_ordered.iter().map(|lot| lot.quantity).max() {
        Some(best) if best > 0 => Reservation::PartiallyReserved {
            best_available: best,
        },
        _ => Reservation::Unavailable,
    }
}
