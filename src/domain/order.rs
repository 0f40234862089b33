//! Order entity and the forward-only status state machine.

use crate::domain::{AccountId, Decimal, OrderNo, Side, Ticker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a brokerage order.
///
/// Statuses only move forward: `Placed -> Accepted ->
/// {PartiallyFilled -> Filled | Filled}`, with `Cancelled` and `Amended`
/// terminal states reachable while the order is still working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Submitted locally, no broker acknowledgment yet.
    Placed,
    /// Acknowledged by the broker.
    Accepted,
    /// Some quantity executed, some still working.
    PartiallyFilled,
    /// Fully executed.
    Filled,
    /// Cancelled at the broker.
    Cancelled,
    /// Amended at the broker; the replacement arrives under a new order_no.
    Amended,
}

impl OrderStatus {
    /// Canonical ledger string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Amended => "AMENDED",
        }
    }

    /// Parse the canonical ledger string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLACED" => Some(OrderStatus::Placed),
            "ACCEPTED" => Some(OrderStatus::Accepted),
            "PARTIALLY_FILLED" => Some(OrderStatus::PartiallyFilled),
            "FILLED" => Some(OrderStatus::Filled),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "AMENDED" => Some(OrderStatus::Amended),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Amended
        )
    }

    /// Whether the state machine admits moving from `self` to `next`.
    ///
    /// Fill events may arrive before the acceptance event, so `Placed`
    /// admits the fill states directly. `PartiallyFilled` self-loops for
    /// repeated partial fills.
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Placed => matches!(next, Accepted | PartiallyFilled | Filled),
            Accepted => matches!(next, PartiallyFilled | Filled | Cancelled | Amended),
            PartiallyFilled => matches!(next, PartiallyFilled | Filled | Cancelled | Amended),
            Filled | Cancelled | Amended => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One brokerage order. Created at submission, mutated only by status
/// transitions, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Broker-assigned order number, unique once assigned.
    pub order_no: OrderNo,
    /// Owning account.
    pub account_id: AccountId,
    /// Instrument code.
    pub ticker: Ticker,
    /// Order side.
    pub side: Side,
    /// Ordered quantity.
    pub qty: Decimal,
    /// Limit price; zero for market orders.
    pub price: Decimal,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Submission time.
    pub placed_at: Option<DateTime<Utc>>,
    /// Last status-transition time.
    pub updated_at: Option<DateTime<Utc>>,
}
