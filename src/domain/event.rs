//! Tagged broker events and the raw wire envelope they are parsed from.
//!
//! The stream carries JSON frames `{"trnm": "LOGIN"|"PING"|"REAL", ...}`.
//! The normalizer classifies `REAL` items into typed events; raw maps never
//! cross into the ledger core.

use crate::domain::{AccountId, Decimal, ExecId, Market, OrderNo, OrderStatus, Side, Ticker};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// A normalized fill event ready for the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionEvent {
    /// Stable unique fill key (broker execution number or derived hash).
    pub exec_id: ExecId,
    /// Order the fill belongs to, when the packet carried one.
    pub order_no: Option<OrderNo>,
    pub account_id: AccountId,
    pub ticker: Ticker,
    pub market: Market,
    pub side: Side,
    /// Quantity executed by this fill.
    pub qty: Decimal,
    /// Execution price (reference price when the packet omitted it).
    pub price: Decimal,
    pub commission: Decimal,
    pub tax: Decimal,
    pub exec_time: DateTime<Utc>,
    /// Broker-side unfilled quantity on the order after this fill;
    /// zero means the order is fully filled.
    pub order_remaining_qty: Decimal,
}

/// A normalized order status transition event.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusEvent {
    pub order_no: OrderNo,
    pub status: OrderStatus,
}

/// Every message the broker stream can deliver, as a tagged variant.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    /// Login acknowledgment; `return_code == 0` means success.
    LoginAck { return_code: i64, return_msg: String },
    /// Heartbeat frame; echoed back verbatim, carries no business state.
    Heartbeat { raw: String },
    /// A fill to record and match.
    Execution(ExecutionEvent),
    /// An order status transition to apply.
    OrderStatus(OrderStatusEvent),
}

/// Raw top-level stream frame.
#[derive(Debug, Clone, Deserialize)]
pub struct WireEnvelope {
    /// Frame discriminator: "LOGIN", "PING", "REAL", "REG", ...
    pub trnm: Option<String>,
    pub return_code: Option<i64>,
    pub return_msg: Option<String>,
    /// Items carried by a REAL frame.
    #[serde(default)]
    pub data: Vec<RealItem>,
}

/// One item inside a REAL frame.
#[derive(Debug, Clone, Deserialize)]
pub struct RealItem {
    /// Real-time TR type code; order executions are type "00".
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    /// Broker field-code -> string value map.
    #[serde(default)]
    pub values: HashMap<String, String>,
}
