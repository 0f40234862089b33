//! Position entity: live aggregate exposure per (account, ticker).

use crate::domain::{AccountId, Decimal, Market, OrderNo, Ticker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weighted-average-cost holding for one instrument, unique on
/// (account_id, ticker).
///
/// Created on the first BUY execution, updated on every subsequent BUY or
/// SELL, and left at zero quantity when fully sold out. The average cost is
/// never recomputed on sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub account_id: AccountId,
    pub ticker: Ticker,
    pub market: Market,
    /// Held quantity; driven to zero by sells, never negative.
    pub qty: Decimal,
    /// Unsold remainder; mirrors `qty` under the current accounting.
    pub remaining_qty: Decimal,
    /// Quantity-weighted mean of the buy executions not yet fully sold.
    pub buy_avg_price: Decimal,
    /// Count of discrete buy additions, capped at the configured maximum.
    pub n_trade: u32,
    /// First buy time for the current holding.
    pub buy_time: Option<DateTime<Utc>>,
    /// Most recent buy time.
    pub last_buy_time: Option<DateTime<Utc>>,
    /// Take-profit price derived from the average cost.
    pub target_price: Decimal,
    /// Stop-loss price derived from the average cost.
    pub stop_price: Decimal,
    /// Accumulated commissions across the holding.
    pub fee_accum: Decimal,
    /// Accumulated taxes across the holding.
    pub tax_accum: Decimal,
    /// Order that last touched this position.
    pub last_order_id: Option<OrderNo>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Returns true once the holding has been fully sold out.
    pub fn is_flat(&self) -> bool {
        self.qty.is_zero()
    }
}
