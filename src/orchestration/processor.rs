//! Event processor: one inbound business event, one transaction.
//!
//! The processor is the single consumer of the stream supervisor's channel,
//! so events apply strictly in arrival order — which serializes every
//! (account, ticker) key. Each execution event runs through
//! `Repository::apply_execution` as one unit of work; there is no
//! cancellation of in-flight matching once an event has been dequeued.

use crate::broker::{GatewayError, OrderGateway, OrderRequest};
use crate::config::Config;
use crate::db::{ApplyOutcome, Repository};
use crate::domain::{
    BrokerEvent, Decimal, ExecutionEvent, Order, OrderNo, OrderStatus, OrderStatusEvent, Side,
};
use crate::engine::PositionPolicy;
use crate::error::LedgerError;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("order rejected by broker: code={code} msg={msg}")]
    Rejected { code: i64, msg: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Applies normalized broker events to the ledger store.
pub struct EventProcessor {
    repo: Arc<Repository>,
    policy: PositionPolicy,
    default_buy_commission: Decimal,
    default_sell_commission: Decimal,
    default_sell_tax: Decimal,
}

impl EventProcessor {
    pub fn new(repo: Arc<Repository>, config: &Config) -> Self {
        EventProcessor {
            repo,
            policy: config.position_policy(),
            default_buy_commission: config.default_buy_commission,
            default_sell_commission: config.default_sell_commission,
            default_sell_tax: config.default_sell_tax,
        }
    }

    /// Drain the event channel until the sender side closes.
    ///
    /// Recoverable conditions are absorbed with logging; an invariant
    /// violation halts that event (its transaction already rolled back),
    /// is surfaced loudly, and processing continues with the next event.
    pub async fn run(&self, mut events: mpsc::Receiver<BrokerEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                match e {
                    LedgerError::MatchingInvariant(_) => {
                        error!(error = %e, "matching invariant violation, event dropped after rollback");
                    }
                    other => error!(error = %other, "failed to apply broker event"),
                }
            }
        }
        info!("event channel drained, processor stopping");
    }

    /// Apply a single broker event.
    pub async fn handle_event(&self, event: BrokerEvent) -> Result<(), LedgerError> {
        match event {
            BrokerEvent::Execution(exec) => {
                self.handle_execution(exec).await?;
                Ok(())
            }
            BrokerEvent::OrderStatus(status) => self.handle_order_status(status).await,
            BrokerEvent::LoginAck { .. } | BrokerEvent::Heartbeat { .. } => {
                debug!("session event carries no ledger state");
                Ok(())
            }
        }
    }

    /// Record, match, and aggregate one fill.
    pub async fn handle_execution(
        &self,
        mut exec: ExecutionEvent,
    ) -> Result<ApplyOutcome, LedgerError> {
        // A locally known order is authoritative for account and ticker;
        // the packet's raw fields are the fallback.
        if let Some(order_no) = &exec.order_no {
            if let Some(order) = self.repo.get_order_by_no(order_no).await? {
                exec.account_id = order.account_id;
                exec.ticker = order.ticker;
            }
        }

        if exec.commission.is_zero() {
            exec.commission = match exec.side {
                Side::Buy => self.default_buy_commission,
                Side::Sell => self.default_sell_commission,
            };
        }
        if exec.side == Side::Sell && exec.tax.is_zero() {
            exec.tax = self.default_sell_tax;
        }

        self.repo.apply_execution(&exec, &self.policy).await
    }

    async fn handle_order_status(&self, event: OrderStatusEvent) -> Result<(), LedgerError> {
        self.repo
            .update_order_status(&event.order_no, event.status)
            .await?;
        Ok(())
    }

    /// Submit an order through the placement collaborator and register it
    /// locally once the broker accepts it (`return_code == 0`).
    pub async fn submit_order(
        &self,
        gateway: &dyn OrderGateway,
        request: &OrderRequest,
    ) -> Result<OrderNo, SubmitError> {
        let reply = gateway.place_order(request).await?;
        if !reply.is_ok() {
            return Err(SubmitError::Rejected {
                code: reply.return_code,
                msg: reply.return_msg,
            });
        }
        let order_no = reply.order_no.ok_or_else(|| SubmitError::Rejected {
            code: reply.return_code,
            msg: "accepted reply without order number".to_string(),
        })?;

        let now = Utc::now();
        let order = Order {
            order_no: order_no.clone(),
            account_id: request.account_id.clone(),
            ticker: request.ticker.clone(),
            side: request.side,
            qty: request.qty,
            price: request.price,
            status: OrderStatus::Placed,
            placed_at: Some(now),
            updated_at: Some(now),
        };
        self.repo.create_order(&order).await?;
        info!(
            order_no = %order_no,
            account_id = %request.account_id,
            ticker = %request.ticker,
            side = %request.side,
            "order placed and registered"
        );
        Ok(order_no)
    }
}
