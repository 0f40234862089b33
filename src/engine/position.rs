//! Weighted-average-cost position aggregation.
//!
//! Pure folds over the Position aggregate: buys re-weight the average cost
//! and recompute target/stop prices; sells draw the quantity down toward
//! zero without touching the cost basis.

use crate::domain::{Decimal, ExecutionEvent, Position};
use chrono::{DateTime, Utc};

/// Sizing policy applied when positions are created or extended.
#[derive(Debug, Clone)]
pub struct PositionPolicy {
    /// Cap on `n_trade`, bounding how often a position may be pyramided.
    pub max_splits: u32,
    /// Take-profit offset as a fraction of average cost (e.g. 0.10).
    pub target_pct: Decimal,
    /// Stop-loss offset as a fraction of average cost (e.g. -0.10).
    pub stop_pct: Decimal,
}

/// Apply a BUY execution to the holding, creating it on first buy.
pub fn apply_buy(
    current: Option<Position>,
    exec: &ExecutionEvent,
    now: DateTime<Utc>,
    policy: &PositionPolicy,
) -> Position {
    match current {
        None => {
            let avg = exec.price;
            let (target, stop) = target_stop(avg, policy);
            Position {
                account_id: exec.account_id.clone(),
                ticker: exec.ticker.clone(),
                market: exec.market.clone(),
                qty: exec.qty,
                remaining_qty: exec.qty,
                buy_avg_price: avg,
                n_trade: 1,
                buy_time: Some(now),
                last_buy_time: Some(now),
                target_price: target,
                stop_price: stop,
                fee_accum: exec.commission,
                tax_accum: exec.tax,
                last_order_id: exec.order_no.clone(),
                updated_at: Some(now),
            }
        }
        Some(mut position) => {
            let old_qty = position.qty;
            let new_qty = old_qty + exec.qty;
            let new_avg = if new_qty.is_positive() {
                ((position.buy_avg_price * old_qty) + (exec.price * exec.qty)) / new_qty
            } else {
                Decimal::zero()
            }
            .round_dp_half_up(6);
            let (target, stop) = target_stop(new_avg, policy);

            position.qty = new_qty;
            position.remaining_qty = new_qty;
            position.buy_avg_price = new_avg;
            position.n_trade = (position.n_trade + 1).min(policy.max_splits);
            position.last_buy_time = Some(now);
            position.target_price = target;
            position.stop_price = stop;
            position.fee_accum += exec.commission;
            position.tax_accum += exec.tax;
            position.last_order_id = exec.order_no.clone();
            position.updated_at = Some(now);
            position
        }
    }
}

/// Apply a SELL execution to the holding.
///
/// Quantities floor at zero; the average cost and the derived target/stop
/// prices stay fixed, since the realized cost basis is the weighted buy
/// average at the time of the sale.
pub fn apply_sell(mut position: Position, exec: &ExecutionEvent, now: DateTime<Utc>) -> Position {
    position.qty = floor_zero(position.qty - exec.qty);
    position.remaining_qty = floor_zero(position.remaining_qty - exec.qty);
    position.fee_accum += exec.commission;
    position.tax_accum += exec.tax;
    position.updated_at = Some(now);
    position
}

fn target_stop(avg: Decimal, policy: &PositionPolicy) -> (Decimal, Decimal) {
    let target = (avg * (Decimal::one() + policy.target_pct)).round_dp_half_up(2);
    let stop = (avg * (Decimal::one() + policy.stop_pct)).round_dp_half_up(2);
    (target, stop)
}

fn floor_zero(value: Decimal) -> Decimal {
    if value.is_negative() {
        Decimal::zero()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, ExecId, Market, OrderNo, Side, Ticker};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap()
    }

    fn policy() -> PositionPolicy {
        PositionPolicy {
            max_splits: 4,
            target_pct: dec!(0.10).into(),
            stop_pct: dec!(-0.10).into(),
        }
    }

    fn buy(qty: i64, price: i64, commission: Decimal) -> ExecutionEvent {
        ExecutionEvent {
            exec_id: ExecId::new(format!("BUY-EXEC-{}-{}", qty, price)),
            order_no: Some(OrderNo::new("00024")),
            account_id: AccountId::new("ACC1"),
            ticker: Ticker::new("005930"),
            market: Market::new("KRX"),
            side: Side::Buy,
            qty: Decimal::from(qty),
            price: Decimal::from(price),
            commission,
            tax: Decimal::zero(),
            exec_time: now(),
            order_remaining_qty: Decimal::zero(),
        }
    }

    fn sell(qty: i64, commission: Decimal, tax: Decimal) -> ExecutionEvent {
        ExecutionEvent {
            side: Side::Sell,
            commission,
            tax,
            ..buy(qty, 0, Decimal::zero())
        }
    }

    #[test]
    fn test_first_buy_creates_position() {
        let position = apply_buy(None, &buy(10, 100, dec!(1.50).into()), now(), &policy());
        assert_eq!(position.qty, Decimal::from(10));
        assert_eq!(position.remaining_qty, Decimal::from(10));
        assert_eq!(position.buy_avg_price, Decimal::from(100));
        assert_eq!(position.n_trade, 1);
        assert_eq!(position.target_price, dec!(110.00).into());
        assert_eq!(position.stop_price, dec!(90.00).into());
        assert_eq!(position.fee_accum, dec!(1.50).into());
        assert_eq!(position.last_order_id, Some(OrderNo::new("00024")));
    }

    #[test]
    fn test_second_buy_reweights_average() {
        let position = apply_buy(None, &buy(10, 100, Decimal::zero()), now(), &policy());
        let position = apply_buy(
            Some(position),
            &buy(10, 120, Decimal::zero()),
            now(),
            &policy(),
        );
        assert_eq!(position.qty, Decimal::from(20));
        assert_eq!(position.buy_avg_price, Decimal::from(110));
        assert_eq!(position.n_trade, 2);
        assert_eq!(position.target_price, dec!(121.00).into());
        assert_eq!(position.stop_price, dec!(99.00).into());
    }

    #[test]
    fn test_n_trade_caps_at_max_splits() {
        let mut position = apply_buy(None, &buy(1, 100, Decimal::zero()), now(), &policy());
        for _ in 0..6 {
            position = apply_buy(
                Some(position),
                &buy(1, 100, Decimal::zero()),
                now(),
                &policy(),
            );
        }
        assert_eq!(position.n_trade, 4);
    }

    #[test]
    fn test_sell_decrements_and_accumulates_fees() {
        let position = apply_buy(None, &buy(10, 100, dec!(1.00).into()), now(), &policy());
        let position = apply_sell(position, &sell(4, dec!(0.50).into(), dec!(0.30).into()), now());
        assert_eq!(position.qty, Decimal::from(6));
        assert_eq!(position.remaining_qty, Decimal::from(6));
        assert_eq!(position.fee_accum, dec!(1.50).into());
        assert_eq!(position.tax_accum, dec!(0.30).into());
        // Cost basis untouched by the sale.
        assert_eq!(position.buy_avg_price, Decimal::from(100));
        assert_eq!(position.target_price, dec!(110.00).into());
    }

    #[test]
    fn test_oversell_floors_at_zero() {
        let position = apply_buy(None, &buy(10, 100, Decimal::zero()), now(), &policy());
        let position = apply_sell(position, &sell(25, Decimal::zero(), Decimal::zero()), now());
        assert!(position.qty.is_zero());
        assert!(position.remaining_qty.is_zero());
        assert!(position.is_flat());
    }

    #[test]
    fn test_average_rounds_to_six_places() {
        let position = apply_buy(None, &buy(3, 100, Decimal::zero()), now(), &policy());
        let position = apply_buy(
            Some(position),
            &buy(4, 101, Decimal::zero()),
            now(),
            &policy(),
        );
        // (300 + 404) / 7 = 100.571428571... -> 100.571429
        assert_eq!(position.buy_avg_price, dec!(100.571429).into());
    }
}
