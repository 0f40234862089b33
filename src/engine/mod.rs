//! Pure computation engines for deterministic ledger logic.

pub mod fifo;
pub mod position;

pub use fifo::{match_sell, BuyLot, LotUpdate, MatchOutcome};
pub use position::{apply_buy, apply_sell, PositionPolicy};
