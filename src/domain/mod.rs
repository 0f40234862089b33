//! Domain types for the ledger-reconciliation core.
//!
//! This module provides:
//! - Exact numeric handling via the Decimal wrapper
//! - Domain primitives: AccountId, Ticker, Market, OrderNo, ExecId, Side
//! - Ledger entities: Order, Execution, Trade, Position
//! - Tagged broker events produced by the normalizer

pub mod decimal;
pub mod event;
pub mod execution;
pub mod order;
pub mod position;
pub mod primitives;
pub mod trade;

pub use decimal::Decimal;
pub use event::{BrokerEvent, ExecutionEvent, OrderStatusEvent, RealItem, WireEnvelope};
pub use execution::Execution;
pub use order::{Order, OrderStatus};
pub use position::Position;
pub use primitives::{AccountId, ExecId, Market, OrderNo, Side, Ticker};
pub use trade::Trade;
