//! Event normalizer: raw broker items to tagged ledger events.
//!
//! Broker payloads encode signed magnitudes as strings like "+60700" and
//! may omit or garble individual fields. The stream must never block on one
//! malformed field, so numeric scrubbing falls back to zero while an
//! anomaly counter keeps the failures observable for alerting.

pub mod fields;

pub use fields::FieldMap;

use crate::domain::{
    AccountId, BrokerEvent, Decimal, Execution, ExecutionEvent, Market, OrderNo, OrderStatus,
    OrderStatusEvent, RealItem, Side, Ticker,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Strip everything but digits, sign, and decimal point, then parse.
///
/// Returns None when nothing parseable survives.
pub fn scrub_numeric(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str_canonical(&cleaned).ok()
}

/// Parse a broker HHMMSS clock against the date of `now`.
///
/// Malformed input falls back to `now` so a bad clock never drops a fill.
pub fn parse_exec_time(hhmmss: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let digits = hhmmss.trim();
    // Byte-wise check: the field can carry arbitrary garbage, and slicing
    // a non-ASCII string at a fixed offset would panic.
    if digits.len() < 6 || !digits.as_bytes()[..6].iter().all(|b| b.is_ascii_digit()) {
        return now;
    }
    let hh: u32 = digits[0..2].parse().unwrap_or(0);
    let mm: u32 = digits[2..4].parse().unwrap_or(0);
    let ss: u32 = digits[4..6].parse().unwrap_or(0);
    now.date_naive()
        .and_hms_opt(hh, mm, ss)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(now)
}

/// Maps raw real-time items into tagged `BrokerEvent`s.
pub struct Normalizer {
    fields: FieldMap,
    default_account: AccountId,
    anomalies: AtomicU64,
}

impl Normalizer {
    pub fn new(fields: FieldMap, default_account: AccountId) -> Self {
        Normalizer {
            fields,
            default_account,
            anomalies: AtomicU64::new(0),
        }
    }

    /// Number of malformed numeric fields absorbed so far.
    pub fn anomaly_count(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    /// Classify one REAL item into a ledger event.
    ///
    /// Items of other real-time types, and statuses the state machine does
    /// not know, are logged and dropped — never fatal.
    pub fn normalize_item(&self, item: &RealItem) -> Option<BrokerEvent> {
        if item.kind != self.fields.exec_item_type {
            debug!(kind = %item.kind, name = %item.name, "ignoring non-execution real-time item");
            return None;
        }
        let f = &self.fields;
        let get = |code: &str| item.values.get(code).map(|s| s.as_str()).unwrap_or("");

        let order_no_raw = {
            let primary = get(&f.order_no);
            if primary.is_empty() {
                get(&f.order_no_alt)
            } else {
                primary
            }
        };
        let order_no = (!order_no_raw.is_empty()).then(|| OrderNo::new(order_no_raw));

        let status = get(&f.status_text).trim().to_string();
        let plain_transition = if status == f.status_accepted {
            Some(OrderStatus::Accepted)
        } else if status == f.status_cancelled {
            Some(OrderStatus::Cancelled)
        } else if status == f.status_amended {
            Some(OrderStatus::Amended)
        } else {
            None
        };
        if let Some(next) = plain_transition {
            return match order_no {
                Some(order_no) => {
                    Some(BrokerEvent::OrderStatus(OrderStatusEvent {
                        order_no,
                        status: next,
                    }))
                }
                None => {
                    debug!(status = %status, "status event without order number, dropping");
                    None
                }
            };
        }

        if !status.contains(&f.status_filled_marker) {
            warn!(status = %status, order_no = %order_no_display(&order_no), "unknown broker status, dropping event");
            return None;
        }

        // Fill event.
        let side = if get(&f.side_text).contains(&f.sell_marker) {
            Side::Sell
        } else {
            Side::Buy
        };

        let exec_price = self.decimal_field(item, &f.exec_price);
        let ref_price = self.decimal_field(item, &f.ref_price);
        let price = if exec_price.is_positive() {
            exec_price
        } else {
            ref_price
        };

        let order_qty = self.decimal_field(item, &f.order_qty);
        let mut qty = self.decimal_field(item, &f.exec_qty);
        if !qty.is_positive() {
            // Some packets omit the per-fill quantity; fall back to the
            // ordered quantity rather than dropping money on the floor.
            qty = if order_qty.is_positive() {
                order_qty
            } else {
                Decimal::one()
            };
        }

        let commission = self.decimal_field(item, &f.commission);
        let tax = if side == Side::Sell {
            self.decimal_field(item, &f.tax)
        } else {
            Decimal::zero()
        };

        let exec_time = parse_exec_time(get(&f.exec_time), Utc::now());
        let order_remaining_qty = self.decimal_field(item, &f.order_remaining_qty);

        let ticker = Ticker::normalized(get(&f.ticker));
        let market_raw = get(&f.market);
        let market = if market_raw.is_empty() {
            Market::new(f.default_market.clone())
        } else {
            Market::new(market_raw)
        };

        let exec_no = get(&f.exec_no);
        let exec_id = Execution::derive_exec_id(
            side,
            (!exec_no.is_empty()).then_some(exec_no),
            order_no.as_ref(),
            qty,
            price,
            exec_time,
        );

        Some(BrokerEvent::Execution(ExecutionEvent {
            exec_id,
            order_no,
            account_id: self.default_account.clone(),
            ticker,
            market,
            side,
            qty,
            price,
            commission,
            tax,
            exec_time,
            order_remaining_qty,
        }))
    }

    /// Parse a numeric field, absorbing malformed values as zero.
    ///
    /// A missing or empty field is an ordinary zero (taxes are absent on
    /// buys, for instance); only a non-empty value that fails to parse
    /// counts as an anomaly.
    fn decimal_field(&self, item: &RealItem, code: &str) -> Decimal {
        let raw = match item.values.get(code) {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Decimal::zero(),
        };
        match scrub_numeric(raw) {
            Some(value) => value,
            None => {
                self.anomalies.fetch_add(1, Ordering::Relaxed);
                warn!(field = %code, value = %raw, "malformed numeric field, defaulting to zero");
                Decimal::zero()
            }
        }
    }
}

fn order_no_display(order_no: &Option<OrderNo>) -> &str {
    order_no.as_ref().map(|o| o.as_str()).unwrap_or("-")
}
