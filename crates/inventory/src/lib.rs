//! Inventory ledger domain module.
//!
//! Lots, the append-only movement ledger, FEFO allocation, cycle counts and the
//! stock views. Pure logic; persistence lives behind the engine's store ports.

pub mod cycle_count;
pub mod fefo;
pub mod lot;
pub mod monitor;
pub mod movement;

pub use cycle_count::{
    CycleCount, CycleCountId, CycleCountStatus, plan_variance_adjustment, sample_products,
    seeded_rng,
};
pub use fefo::{Reservation, fefo_cmp, fefo_lots, first_fit};
pub use lot::{Lot, LotId, LotStatus, NewLot};
pub use monitor::{ExpiryAlert, FefoLotView, StockLevel, StockThresholds, fefo_view};
pub use movement::{
    Movement, MovementContext, MovementId, MovementReference, MovementType, replay_quantity,
};
