//! Execution entity: one fill event against an order.

use crate::domain::{AccountId, Decimal, ExecId, Market, OrderNo, Side, Ticker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single fill against an order.
///
/// For BUY executions `remaining_qty` starts at `qty` and is consumed by
/// FIFO matching; SELL executions are fully matched at creation and carry
/// `remaining_qty = 0`. `remaining_qty` is the only mutable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Stable unique identifier for this fill.
    pub exec_id: ExecId,
    /// Order this fill belongs to ("UNKNOWN" when the packet omitted it).
    pub order_no: OrderNo,
    /// Owning account.
    pub account_id: AccountId,
    /// Instrument code.
    pub ticker: Ticker,
    /// Market segment.
    pub market: Market,
    /// Fill side.
    pub side: Side,
    /// Executed quantity.
    pub qty: Decimal,
    /// Execution price.
    pub price: Decimal,
    /// Commission charged on this fill.
    pub commission: Decimal,
    /// Tax charged on this fill (sell side).
    pub tax: Decimal,
    /// Execution time.
    pub exec_time: Option<DateTime<Utc>>,
    /// Unmatched remainder of a BUY lot.
    pub remaining_qty: Decimal,
}

impl Execution {
    /// Derive a stable unique key for a fill.
    ///
    /// Priority: broker execution number (if present) > hash of
    /// deterministic fields. Two deliveries of the same broker packet must
    /// derive the same key.
    pub fn derive_exec_id(
        side: Side,
        exec_no: Option<&str>,
        order_no: Option<&OrderNo>,
        qty: Decimal,
        price: Decimal,
        exec_time: DateTime<Utc>,
    ) -> ExecId {
        if let Some(no) = exec_no.filter(|s| !s.is_empty()) {
            return ExecId::new(format!("{}-EXEC-{}", side.as_str(), no));
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(side.as_str());
        hasher.update(order_no.map(|o| o.as_str()).unwrap_or(""));
        hasher.update(qty.to_canonical_string());
        hasher.update(price.to_canonical_string());
        hasher.update(exec_time.timestamp_millis().to_le_bytes());
        let hash = hasher.finalize();
        ExecId::new(format!("hash:{}", hex::encode(&hash[..16])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 40, 22).unwrap()
    }

    #[test]
    fn test_exec_id_with_broker_number() {
        let id = Execution::derive_exec_id(
            Side::Buy,
            Some("123456"),
            Some(&OrderNo::new("00024")),
            Decimal::from(10),
            Decimal::from(100),
            t0(),
        );
        assert_eq!(id.as_str(), "BUY-EXEC-123456");
    }

    #[test]
    fn test_exec_id_hash_fallback_is_deterministic() {
        let make = || {
            Execution::derive_exec_id(
                Side::Sell,
                None,
                Some(&OrderNo::new("00024")),
                Decimal::from(10),
                Decimal::from(100),
                t0(),
            )
        };
        let a = make();
        let b = make();
        assert!(a.as_str().starts_with("hash:"));
        assert_eq!(a, b, "same inputs must derive the same key");
    }

    #[test]
    fn test_exec_id_hash_differs_by_side() {
        let buy = Execution::derive_exec_id(
            Side::Buy,
            None,
            None,
            Decimal::from(10),
            Decimal::from(100),
            t0(),
        );
        let sell = Execution::derive_exec_id(
            Side::Sell,
            None,
            None,
            Decimal::from(10),
            Decimal::from(100),
            t0(),
        );
        assert_ne!(buy, sell);
    }

    #[test]
    fn test_exec_id_empty_broker_number_falls_back() {
        let id = Execution::derive_exec_id(
            Side::Buy,
            Some(""),
            None,
            Decimal::from(1),
            Decimal::from(1),
            t0(),
        );
        assert!(id.as_str().starts_with("hash:"));
    }
}
