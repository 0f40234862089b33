//! Mock order gateway for tests.

use super::{GatewayError, OrderGateway, OrderRequest, PlacementReply};
use crate::domain::OrderNo;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// In-memory gateway that assigns sequential order numbers.
#[derive(Debug, Default)]
pub struct MockOrderGateway {
    next_no: AtomicU64,
    reject_all: bool,
    requests: Mutex<Vec<OrderRequest>>,
}

impl MockOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that rejects every submission with a nonzero return code.
    pub fn rejecting() -> Self {
        MockOrderGateway {
            reject_all: true,
            ..Self::default()
        }
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().expect("gateway mutex poisoned").clone()
    }
}

#[async_trait]
impl OrderGateway for MockOrderGateway {
    async fn place_order(&self, request: &OrderRequest) -> Result<PlacementReply, GatewayError> {
        self.requests
            .lock()
            .expect("gateway mutex poisoned")
            .push(request.clone());

        if self.reject_all {
            return Ok(PlacementReply {
                order_no: None,
                return_code: 40010000,
                return_msg: "rejected by mock gateway".to_string(),
            });
        }

        let seq = self.next_no.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PlacementReply {
            order_no: Some(OrderNo::new(format!("SIM{:05}", seq))),
            return_code: 0,
            return_msg: "ok".to_string(),
        })
    }
}
