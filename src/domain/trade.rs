//! Trade entity: one realized round trip, append-only.

use crate::domain::{AccountId, Decimal, Market, Ticker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A realized BUY-lot-to-SELL-lot pairing, possibly partial on either side.
///
/// Immutable once created. `pnl_gross = sell_value - buy_value` and
/// `pnl_net = pnl_gross - (buy_commission + sell_commission + sell_tax)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub account_id: AccountId,
    pub ticker: Ticker,
    pub market: Market,
    /// Matched quantity.
    pub qty: Decimal,
    pub buy_avg_price: Decimal,
    pub sell_avg_price: Decimal,
    /// qty * buy price, rounded to 2 dp.
    pub buy_value: Decimal,
    /// qty * sell price, rounded to 2 dp.
    pub sell_value: Decimal,
    /// Buy-side commission allocated to this match.
    pub buy_commission: Decimal,
    /// Sell-side commission allocated to this match.
    pub sell_commission: Decimal,
    /// Sell-side tax allocated to this match.
    pub sell_tax: Decimal,
    pub pnl_gross: Decimal,
    pub pnl_net: Decimal,
    /// pnl_net / buy_value, rounded to 6 dp; zero when buy_value is zero.
    pub pnl_net_pct: Decimal,
    /// CSV of contributing buy execution ids.
    pub buy_exec_ids: String,
    /// CSV of contributing sell execution ids.
    pub sell_exec_ids: String,
    /// Buy lot execution time.
    pub opened_at: Option<DateTime<Utc>>,
    /// Sell execution time.
    pub closed_at: Option<DateTime<Utc>>,
    /// Whole seconds between open and close; zero if either is missing.
    pub holding_seconds: i64,
}
