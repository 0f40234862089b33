//! External collaborator seams: order placement and credentials.
//!
//! The transport that actually talks to the broker lives outside this
//! crate; the ledger consumes it behind these traits. Credentials are
//! injected explicitly — no component reads ambient files on its own.

pub mod mock;

pub use mock::MockOrderGateway;

use crate::domain::{AccountId, Decimal, OrderNo, Side, Ticker};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A new-order request handed to the placement collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub account_id: AccountId,
    pub ticker: Ticker,
    pub side: Side,
    pub qty: Decimal,
    /// Limit price; zero means a market order.
    pub price: Decimal,
}

/// Broker reply to an order submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementReply {
    /// Assigned order number; present on success.
    pub order_no: Option<OrderNo>,
    /// Zero signals success.
    pub return_code: i64,
    pub return_msg: String,
}

impl PlacementReply {
    /// True when the broker accepted the submission.
    pub fn is_ok(&self) -> bool {
        self.return_code == 0
    }
}

/// Error type for order-placement operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("gateway error: {0}")]
    Other(String),
}

/// Order-placement collaborator.
#[async_trait]
pub trait OrderGateway: Send + Sync + fmt::Debug {
    /// Submit an order; a reply with `return_code == 0` carries the
    /// broker-assigned order number.
    async fn place_order(&self, request: &OrderRequest) -> Result<PlacementReply, GatewayError>;
}

/// Error type for credential lookups.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the access token the stream login handshake requires.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    async fn access_token(&self) -> Result<String, CredentialError>;
}

/// Fixed token, for tests and short-lived tooling.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        StaticTokenProvider {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an explicitly configured file on every login, so a
/// refreshed token is picked up at the next reconnect.
#[derive(Debug, Clone)]
pub struct FileTokenProvider {
    path: PathBuf,
}

impl FileTokenProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenProvider { path: path.into() }
    }
}

#[async_trait]
impl CredentialProvider for FileTokenProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CredentialError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let token = raw.trim().to_string();
        if token.is_empty() {
            return Err(CredentialError::Unavailable(format!(
                "{}: token file is empty",
                self.path.display()
            )));
        }
        Ok(token)
    }
}
