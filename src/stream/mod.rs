//! Stream supervision: the long-lived broker event subscription.
//!
//! One supervisor task per account owns the websocket connection, performs
//! the login/subscribe handshake, echoes heartbeats, and reconnects with
//! exponential backoff, handing normalized events to the processor.

pub mod supervisor;

pub use supervisor::StreamSupervisor;

use crate::broker::CredentialError;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Connection settings for the stream supervisor.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Websocket endpoint, e.g. "wss://.../api/dostk/websocket".
    pub ws_url: String,
    /// First reconnect delay after a disconnect.
    pub backoff_floor: Duration,
    /// Reconnect delay ceiling.
    pub backoff_cap: Duration,
    /// Max silence on the socket before the connection counts as stalled.
    pub read_timeout: Duration,
    /// Registration reissued after every reconnect; the broker does not
    /// persist subscriptions across connections.
    pub subscription: Subscription,
}

/// One real-time registration group.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub group_no: String,
    /// Instrument codes; an empty string registers all instruments.
    pub items: Vec<String>,
    /// Real-time TR types, e.g. ["00"] for order executions.
    pub types: Vec<String>,
}

impl Subscription {
    /// Register order executions for every instrument.
    pub fn order_executions() -> Self {
        Subscription {
            group_no: "1".to_string(),
            items: vec!["".to_string()],
            types: vec!["00".to_string()],
        }
    }

    /// The REG frame sent after login.
    pub fn to_frame(&self) -> serde_json::Value {
        json!({
            "trnm": "REG",
            "grp_no": self.group_no,
            "refresh": "1",
            "data": [{
                "item": self.items,
                "type": self.types,
            }]
        })
    }
}

/// Where the supervisor currently is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    Disconnected,
    Connecting,
    LoggedIn,
    Subscribed,
    Receiving,
}

/// Transport-layer failures. These drive the reconnect path and never
/// propagate into the ledger store.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Fatal for this connection attempt; takes the backoff path rather
    /// than retrying the login itself.
    #[error("login rejected by broker: code={code} msg={msg}")]
    LoginRejected { code: i64, msg: String },

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("no frame within the read timeout, treating as disconnect")]
    HeartbeatStalled,

    #[error("timed out establishing connection")]
    ConnectTimeout,
}
