//! FIFO matching of SELL executions against open BUY lots.
//!
//! Pure computation: lots in, trades and lot decrements out. The repository
//! persists the outcome atomically with the triggering execution.

use crate::domain::{Decimal, ExecId, ExecutionEvent, Trade};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use tracing::warn;

/// An open BUY lot: the unmatched remainder of one BUY execution.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyLot {
    /// Ledger row id; the FIFO tie-break for equal exec_time.
    pub row_id: i64,
    pub exec_id: ExecId,
    /// Original executed quantity of the lot.
    pub qty: Decimal,
    pub price: Decimal,
    /// Commission charged on the whole lot.
    pub commission: Decimal,
    /// Quantity not yet consumed by sells.
    pub remaining_qty: Decimal,
    pub exec_time: Option<DateTime<Utc>>,
}

/// A pending decrement of a lot's remaining quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct LotUpdate {
    pub row_id: i64,
    pub remaining_qty: Decimal,
}

/// Outcome of matching one SELL execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchOutcome {
    /// One trade per (lot, sell) pair consumed, in FIFO order.
    pub trades: Vec<Trade>,
    /// Lot decrements to persist alongside the trades.
    pub lot_updates: Vec<LotUpdate>,
    /// Total quantity paired with lots.
    pub matched_qty: Decimal,
    /// Sell quantity left over after all lots were exhausted.
    pub unmatched_qty: Decimal,
}

/// Match a SELL execution against open BUY lots, oldest first.
///
/// Lots must already be ordered by `(exec_time ASC, row_id ASC)`. Fee and
/// tax are allocated proportionally by matched quantity relative to each
/// execution's total quantity, since one execution's fee covers its whole
/// quantity even when it splits across several trades. An unmatched
/// remainder is dropped from matching and reported in the outcome.
pub fn match_sell(sell: &ExecutionEvent, lots: &[BuyLot]) -> Result<MatchOutcome, LedgerError> {
    let mut outcome = MatchOutcome::default();
    let mut remaining = sell.qty;

    if !remaining.is_positive() {
        return Ok(outcome);
    }

    for lot in lots {
        if !remaining.is_positive() {
            break;
        }
        let available = lot.remaining_qty;
        if !available.is_positive() {
            continue;
        }

        let used = remaining.min(available);
        let new_lot_remaining = available - used;
        if new_lot_remaining.is_negative() {
            return Err(LedgerError::MatchingInvariant(format!(
                "lot {} would go negative: {} - {}",
                lot.exec_id, available, used
            )));
        }

        outcome.trades.push(build_trade(sell, lot, used));
        outcome.lot_updates.push(LotUpdate {
            row_id: lot.row_id,
            remaining_qty: new_lot_remaining,
        });

        remaining -= used;
        outcome.matched_qty += used;
    }

    if remaining.is_positive() {
        // Known gap carried from the account history: quantity sold beyond
        // the tracked buy lots is not converted into a trade or a short.
        warn!(
            account_id = %sell.account_id,
            ticker = %sell.ticker,
            exec_id = %sell.exec_id,
            unmatched = %remaining,
            "sell quantity exceeds open buy lots; remainder dropped from matching"
        );
        outcome.unmatched_qty = remaining;
    }

    Ok(outcome)
}

fn build_trade(sell: &ExecutionEvent, lot: &BuyLot, used: Decimal) -> Trade {
    let money = |d: Decimal| d.round_dp_half_up(2);

    let buy_value = used * lot.price;
    let sell_value = used * sell.price;

    let buy_commission = if lot.qty.is_positive() {
        lot.commission * (used / lot.qty)
    } else {
        Decimal::zero()
    };
    let (sell_commission, sell_tax) = if sell.qty.is_positive() {
        let ratio = used / sell.qty;
        (sell.commission * ratio, sell.tax * ratio)
    } else {
        (Decimal::zero(), Decimal::zero())
    };

    let pnl_gross = sell_value - buy_value;
    let pnl_net = pnl_gross - (buy_commission + sell_commission + sell_tax);
    let pnl_net_pct = if buy_value.is_positive() {
        pnl_net / buy_value
    } else {
        Decimal::zero()
    };

    let opened_at = lot.exec_time;
    let closed_at = Some(sell.exec_time);
    let holding_seconds = match (opened_at, closed_at) {
        (Some(opened), Some(closed)) => (closed - opened).num_seconds(),
        _ => 0,
    };

    Trade {
        account_id: sell.account_id.clone(),
        ticker: sell.ticker.clone(),
        market: sell.market.clone(),
        qty: used,
        buy_avg_price: lot.price,
        sell_avg_price: sell.price,
        buy_value: money(buy_value),
        sell_value: money(sell_value),
        buy_commission: money(buy_commission),
        sell_commission: money(sell_commission),
        sell_tax: money(sell_tax),
        pnl_gross: money(pnl_gross),
        pnl_net: money(pnl_net),
        pnl_net_pct: pnl_net_pct.round_dp_half_up(6),
        buy_exec_ids: lot.exec_id.as_str().to_string(),
        sell_exec_ids: sell.exec_id.as_str().to_string(),
        opened_at,
        closed_at,
        holding_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, ExecId, Market, Side, Ticker};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn dt(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sell(qty: Decimal, price: Decimal, commission: Decimal, tax: Decimal) -> ExecutionEvent {
        ExecutionEvent {
            exec_id: ExecId::new("SELL-EXEC-1"),
            order_no: None,
            account_id: AccountId::new("ACC1"),
            ticker: Ticker::new("005930"),
            market: Market::new("KRX"),
            side: Side::Sell,
            qty,
            price,
            commission,
            tax,
            exec_time: dt(3600),
            order_remaining_qty: Decimal::zero(),
        }
    }

    fn lot(row_id: i64, qty: Decimal, price: Decimal, commission: Decimal) -> BuyLot {
        BuyLot {
            row_id,
            exec_id: ExecId::new(format!("BUY-EXEC-{}", row_id)),
            qty,
            price,
            commission,
            remaining_qty: qty,
            exec_time: Some(dt(row_id * 10)),
        }
    }

    #[test]
    fn test_single_lot_exact_match() {
        let sell = sell(dec!(10).into(), dec!(120).into(), dec!(1.80).into(), dec!(2.00).into());
        let lots = vec![lot(1, dec!(10).into(), dec!(100).into(), dec!(1.50).into())];

        let outcome = match_sell(&sell, &lots).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert!(outcome.unmatched_qty.is_zero());
        assert_eq!(outcome.matched_qty, dec!(10).into());

        let trade = &outcome.trades[0];
        assert_eq!(trade.buy_value, dec!(1000.00).into());
        assert_eq!(trade.sell_value, dec!(1200.00).into());
        assert_eq!(trade.pnl_gross, dec!(200.00).into());
        assert_eq!(trade.pnl_net, dec!(194.70).into());
        assert_eq!(trade.pnl_net_pct, dec!(0.194700).into());
        assert_eq!(trade.holding_seconds, 3590);
        assert_eq!(trade.buy_exec_ids, "BUY-EXEC-1");
        assert_eq!(trade.sell_exec_ids, "SELL-EXEC-1");

        assert_eq!(outcome.lot_updates.len(), 1);
        assert!(outcome.lot_updates[0].remaining_qty.is_zero());
    }

    #[test]
    fn test_two_lots_partial_second() {
        let sell = sell(dec!(15).into(), dec!(130).into(), Decimal::zero(), Decimal::zero());
        let lots = vec![
            lot(1, dec!(10).into(), dec!(100).into(), Decimal::zero()),
            lot(2, dec!(10).into(), dec!(120).into(), Decimal::zero()),
        ];

        let outcome = match_sell(&sell, &lots).unwrap();
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].qty, dec!(10).into());
        assert_eq!(outcome.trades[0].buy_avg_price, dec!(100).into());
        assert_eq!(outcome.trades[1].qty, dec!(5).into());
        assert_eq!(outcome.trades[1].buy_avg_price, dec!(120).into());

        assert_eq!(outcome.lot_updates[0].remaining_qty, Decimal::zero());
        assert_eq!(outcome.lot_updates[1].remaining_qty, dec!(5).into());
        assert!(outcome.unmatched_qty.is_zero());
    }

    #[test]
    fn test_fees_allocated_proportionally() {
        // Sell 15 of 20 bought across two lots; the sell fee covers the
        // whole 15, each trade gets its share by matched quantity.
        let sell = sell(dec!(15).into(), dec!(130).into(), dec!(3.00).into(), dec!(1.50).into());
        let lots = vec![
            lot(1, dec!(10).into(), dec!(100).into(), dec!(2.00).into()),
            lot(2, dec!(10).into(), dec!(120).into(), dec!(2.00).into()),
        ];

        let outcome = match_sell(&sell, &lots).unwrap();
        let first = &outcome.trades[0];
        // 10/15 of the sell fee and tax, full buy fee of lot one.
        assert_eq!(first.sell_commission, dec!(2.00).into());
        assert_eq!(first.sell_tax, dec!(1.00).into());
        assert_eq!(first.buy_commission, dec!(2.00).into());

        let second = &outcome.trades[1];
        // 5/15 of the sell fee and tax, half the buy fee of lot two.
        assert_eq!(second.sell_commission, dec!(1.00).into());
        assert_eq!(second.sell_tax, dec!(0.50).into());
        assert_eq!(second.buy_commission, dec!(1.00).into());
    }

    #[test]
    fn test_oversell_remainder_dropped() {
        let sell = sell(dec!(25).into(), dec!(130).into(), Decimal::zero(), Decimal::zero());
        let lots = vec![lot(1, dec!(10).into(), dec!(100).into(), Decimal::zero())];

        let outcome = match_sell(&sell, &lots).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.matched_qty, dec!(10).into());
        assert_eq!(outcome.unmatched_qty, dec!(15).into());
    }

    #[test]
    fn test_no_lots_no_trades() {
        let sell = sell(dec!(10).into(), dec!(130).into(), Decimal::zero(), Decimal::zero());
        let outcome = match_sell(&sell, &[]).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.unmatched_qty, dec!(10).into());
    }

    #[test]
    fn test_exhausted_lots_skipped() {
        let mut spent = lot(1, dec!(10).into(), dec!(100).into(), Decimal::zero());
        spent.remaining_qty = Decimal::zero();
        let lots = vec![spent, lot(2, dec!(10).into(), dec!(110).into(), Decimal::zero())];

        let sell = sell(dec!(5).into(), dec!(130).into(), Decimal::zero(), Decimal::zero());
        let outcome = match_sell(&sell, &lots).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].buy_avg_price, dec!(110).into());
        assert_eq!(outcome.lot_updates[0].row_id, 2);
    }

    #[test]
    fn test_zero_cost_lot_has_zero_pct() {
        let sell = sell(dec!(5).into(), dec!(130).into(), Decimal::zero(), Decimal::zero());
        let lots = vec![lot(1, dec!(5).into(), Decimal::zero(), Decimal::zero())];

        let outcome = match_sell(&sell, &lots).unwrap();
        assert_eq!(outcome.trades[0].pnl_net_pct, Decimal::zero());
    }

    #[test]
    fn test_missing_open_time_zeroes_holding() {
        let mut l = lot(1, dec!(5).into(), dec!(100).into(), Decimal::zero());
        l.exec_time = None;
        let sell = sell(dec!(5).into(), dec!(130).into(), Decimal::zero(), Decimal::zero());

        let outcome = match_sell(&sell, &[l]).unwrap();
        assert_eq!(outcome.trades[0].holding_seconds, 0);
        assert!(outcome.trades[0].opened_at.is_none());
    }
}
