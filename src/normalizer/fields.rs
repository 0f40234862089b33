//! Broker field-code mapping for real-time order-execution items.
//!
//! The broker encodes every value as a string keyed by a numeric field
//! code; which code means what is broker configuration, not core logic, so
//! the whole mapping is injectable. The defaults follow the Kiwoom
//! real-time TR "00" (order execution) field set.

/// Field-code and status-literal mapping for one broker dialect.
#[derive(Debug, Clone)]
pub struct FieldMap {
    /// Real-time item type that carries order executions.
    pub exec_item_type: String,
    /// Order number.
    pub order_no: String,
    /// Fallback order number field.
    pub order_no_alt: String,
    /// Raw instrument code (may carry a market prefix).
    pub ticker: String,
    /// Market segment label.
    pub market: String,
    /// Ordered quantity.
    pub order_qty: String,
    /// Broker-side unfilled quantity on the order.
    pub order_remaining_qty: String,
    /// Quantity executed by this fill.
    pub exec_qty: String,
    /// Side text ("+매수" / "+매도").
    pub side_text: String,
    /// Status text ("접수" / "체결" / ...).
    pub status_text: String,
    /// Execution time as HHMMSS.
    pub exec_time: String,
    /// Broker execution number.
    pub exec_no: String,
    /// Execution price.
    pub exec_price: String,
    /// Reference (current) price, used when the execution price is absent.
    pub ref_price: String,
    /// Commission for this fill.
    pub commission: String,
    /// Tax for this fill (sell side).
    pub tax: String,

    /// Substring marking the sell side in the side text.
    pub sell_marker: String,
    /// Status literal for broker acceptance.
    pub status_accepted: String,
    /// Status literal for cancellation.
    pub status_cancelled: String,
    /// Status literal for amendment.
    pub status_amended: String,
    /// Substring marking a fill status.
    pub status_filled_marker: String,

    /// Market label assumed when the packet omits one.
    pub default_market: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        FieldMap {
            exec_item_type: "00".to_string(),
            order_no: "9203".to_string(),
            order_no_alt: "9205".to_string(),
            ticker: "9001".to_string(),
            market: "2135".to_string(),
            order_qty: "900".to_string(),
            order_remaining_qty: "902".to_string(),
            exec_qty: "911".to_string(),
            side_text: "905".to_string(),
            status_text: "913".to_string(),
            exec_time: "908".to_string(),
            exec_no: "909".to_string(),
            exec_price: "910".to_string(),
            ref_price: "10".to_string(),
            commission: "938".to_string(),
            tax: "939".to_string(),
            sell_marker: "매도".to_string(),
            status_accepted: "접수".to_string(),
            status_cancelled: "취소".to_string(),
            status_amended: "정정".to_string(),
            status_filled_marker: "체결".to_string(),
            default_market: "KRX".to_string(),
        }
    }
}
