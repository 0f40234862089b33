//! Repository layer for database operations.
//!
//! The repository exclusively owns persistence of the four ledger entities.
//! Methods are organized across submodules by domain:
//! - `orders.rs` - order creation and status transitions
//! - `executions.rs` - fills and open BUY lots
//! - `trades.rs` - realized round trips
//! - `positions.rs` - the live holding aggregate
//!
//! `apply_execution` is the single-transaction unit of work that ties them
//! together for one inbound fill.

mod executions;
mod orders;
mod positions;
mod trades;

use crate::domain::{Decimal, ExecutionEvent, OrderStatus, Side};
use crate::engine::{self, PositionPolicy};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::{info, warn};

/// Result of applying one execution event to the ledger.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplyOutcome {
    /// False when the exec_id was already recorded (duplicate delivery).
    pub recorded: bool,
    /// Trade rows created by FIFO matching, in creation order.
    pub trade_ids: Vec<i64>,
    /// Sell quantity paired with open lots.
    pub matched_qty: Decimal,
    /// Sell quantity dropped because no lots remained.
    pub unmatched_qty: Decimal,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Apply one execution event as a single transaction:
    /// record the fill, FIFO-match sells into trades, update the position,
    /// and advance the order status. Partial application is never visible
    /// to other readers; any failure rolls the whole unit back.
    ///
    /// Idempotent on `exec_id`: a duplicate delivery records nothing and
    /// does not re-trigger matching.
    pub async fn apply_execution(
        &self,
        exec: &ExecutionEvent,
        policy: &PositionPolicy,
    ) -> Result<ApplyOutcome, LedgerError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // SELL executions are fully matched at creation and keep no lot.
        let remaining = match exec.side {
            Side::Buy => exec.qty,
            Side::Sell => Decimal::zero(),
        };
        let inserted =
            Self::insert_execution_conn(&mut tx, exec, remaining, now.timestamp_millis()).await?;
        if !inserted {
            tx.rollback().await?;
            info!(
                account_id = %exec.account_id,
                ticker = %exec.ticker,
                exec_id = %exec.exec_id,
                "duplicate execution delivery ignored"
            );
            return Ok(ApplyOutcome::default());
        }

        let mut outcome = ApplyOutcome {
            recorded: true,
            ..ApplyOutcome::default()
        };

        if exec.side == Side::Sell {
            let lots = Self::open_buy_lots_conn(&mut tx, &exec.account_id, &exec.ticker).await?;
            let matched = engine::fifo::match_sell(exec, &lots)?;
            for update in &matched.lot_updates {
                Self::set_lot_remaining_conn(&mut tx, update.row_id, update.remaining_qty).await?;
            }
            for trade in &matched.trades {
                let trade_id = Self::insert_trade_conn(&mut tx, trade).await?;
                outcome.trade_ids.push(trade_id);
            }
            outcome.matched_qty = matched.matched_qty;
            outcome.unmatched_qty = matched.unmatched_qty;
        }

        let current = Self::get_position_conn(&mut tx, &exec.account_id, &exec.ticker).await?;
        match exec.side {
            Side::Buy => {
                let position = engine::position::apply_buy(current, exec, now, policy);
                Self::upsert_position_conn(&mut tx, &position).await?;
            }
            Side::Sell => {
                if let Some(position) = current {
                    let position = engine::position::apply_sell(position, exec, now);
                    Self::upsert_position_conn(&mut tx, &position).await?;
                }
            }
        }

        if let Some(order_no) = &exec.order_no {
            let status = if exec.order_remaining_qty.is_zero() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            Self::update_order_status_conn(&mut tx, order_no, status, now.timestamp_millis())
                .await?;
        }

        tx.commit().await?;

        info!(
            account_id = %exec.account_id,
            ticker = %exec.ticker,
            exec_id = %exec.exec_id,
            side = %exec.side,
            qty = %exec.qty,
            price = %exec.price,
            trades = outcome.trade_ids.len(),
            "execution applied"
        );
        Ok(outcome)
    }
}

/// Decode a decimal column stored as a canonical string.
///
/// We keep decimals as TEXT and parse them back in Rust. SQLite arithmetic
/// and aggregates run on REAL (float), which would lose precision for
/// monetary values, so no query ever computes on these columns.
pub(crate) fn decode_decimal(value: &str, column: &str, key: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|e| {
        warn!(
            key = %key,
            column = %column,
            value = %value,
            error = %e,
            "failed to parse decimal column, using default"
        );
        Decimal::default()
    })
}

pub(crate) fn decode_millis(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(DateTime::from_timestamp_millis)
}

pub(crate) fn encode_millis(value: Option<DateTime<Utc>>) -> Option<i64> {
    value.map(|t| t.timestamp_millis())
}
