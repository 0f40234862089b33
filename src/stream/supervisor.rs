//! The stream supervisor task: connect, login, subscribe, receive, repeat.

use super::{StreamConfig, StreamError, SupervisorStatus};
use crate::broker::CredentialProvider;
use crate::domain::{BrokerEvent, WireEnvelope};
use crate::normalizer::Normalizer;
use backoff::backoff::Backoff as _;
use backoff::ExponentialBackoff;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Whether the read loop should keep going after a frame.
enum Flow {
    Continue,
    /// The event channel closed: the consumer is gone, shut down cleanly.
    Stop,
}

/// Maintains the broker subscription for one account.
///
/// Sole consumer of the transport connection and sole producer into the
/// event channel. Dropping the receiving end of the channel is the
/// shutdown signal.
pub struct StreamSupervisor {
    config: StreamConfig,
    credentials: Arc<dyn CredentialProvider>,
    normalizer: Arc<Normalizer>,
    events: mpsc::Sender<BrokerEvent>,
    status: Arc<RwLock<SupervisorStatus>>,
}

impl StreamSupervisor {
    pub fn new(
        config: StreamConfig,
        credentials: Arc<dyn CredentialProvider>,
        normalizer: Arc<Normalizer>,
        events: mpsc::Sender<BrokerEvent>,
    ) -> Self {
        StreamSupervisor {
            config,
            credentials,
            normalizer,
            events,
            status: Arc::new(RwLock::new(SupervisorStatus::Disconnected)),
        }
    }

    /// Current lifecycle status, for observability.
    pub async fn status(&self) -> SupervisorStatus {
        *self.status.read().await
    }

    /// Run until the event receiver is dropped.
    ///
    /// Every disconnect — transport error, stalled heartbeat, rejected
    /// login — waits out the backoff and reconnects. The delay doubles up
    /// to the cap and resets to the floor only after a session reaches the
    /// subscribed state again.
    pub async fn run(&self) -> Result<(), StreamError> {
        let mut backoff = reconnect_backoff(&self.config);
        loop {
            match self.connect_and_stream(&mut backoff).await {
                Ok(()) => {
                    self.set_status(SupervisorStatus::Disconnected).await;
                    info!("event channel closed, stream supervisor stopping");
                    return Ok(());
                }
                Err(e) => {
                    self.set_status(SupervisorStatus::Disconnected).await;
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.config.backoff_cap);
                    warn!(
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "stream disconnected, reconnecting after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn connect_and_stream(
        &self,
        backoff: &mut ExponentialBackoff,
    ) -> Result<(), StreamError> {
        self.set_status(SupervisorStatus::Connecting).await;
        let token = self.credentials.access_token().await?;

        let (mut ws, _) = match timeout(
            self.config.read_timeout,
            connect_async(self.config.ws_url.as_str()),
        )
        .await
        {
            Err(_) => return Err(StreamError::ConnectTimeout),
            Ok(result) => result?,
        };

        // Login must be acknowledged before any subscription goes out.
        let login = json!({ "trnm": "LOGIN", "token": token });
        ws.send(Message::Text(login.to_string())).await?;
        self.await_login_ack(&mut ws).await?;
        self.set_status(SupervisorStatus::LoggedIn).await;

        ws.send(Message::Text(self.config.subscription.to_frame().to_string()))
            .await?;
        self.set_status(SupervisorStatus::Subscribed).await;
        backoff.reset();
        info!(url = %self.config.ws_url, "stream logged in and subscribed");

        loop {
            let message = self.next_message(&mut ws).await?;
            match message {
                Message::Text(text) => {
                    self.set_status(SupervisorStatus::Receiving).await;
                    if let Flow::Stop = self.handle_frame(&text, &mut ws).await? {
                        return Ok(());
                    }
                }
                Message::Ping(payload) => ws.send(Message::Pong(payload)).await?,
                Message::Close(_) => return Err(StreamError::ConnectionClosed),
                _ => {}
            }
        }
    }

    /// Wait for the login acknowledgment, echoing any heartbeat that
    /// interleaves. A nonzero return code fails this connection attempt.
    async fn await_login_ack(&self, ws: &mut WsStream) -> Result<(), StreamError> {
        loop {
            let message = self.next_message(ws).await?;
            let text = match message {
                Message::Text(text) => text,
                Message::Ping(payload) => {
                    ws.send(Message::Pong(payload)).await?;
                    continue;
                }
                Message::Close(_) => return Err(StreamError::ConnectionClosed),
                _ => continue,
            };

            let envelope: WireEnvelope = match serde_json::from_str(&text) {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!(error = %e, "unparseable frame before login ack, ignoring");
                    continue;
                }
            };
            match envelope.trnm.as_deref() {
                Some("PING") => ws.send(Message::Text(text)).await?,
                Some("LOGIN") => {
                    let code = envelope.return_code.unwrap_or(-1);
                    if code != 0 {
                        return Err(StreamError::LoginRejected {
                            code,
                            msg: envelope.return_msg.unwrap_or_default(),
                        });
                    }
                    return Ok(());
                }
                other => debug!(trnm = ?other, "frame before login ack ignored"),
            }
        }
    }

    /// Route one text frame. Heartbeats echo back verbatim and advance no
    /// business state; REAL items are normalized and forwarded.
    async fn handle_frame(&self, text: &str, ws: &mut WsStream) -> Result<Flow, StreamError> {
        let envelope: WireEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "unparseable stream frame, ignoring");
                return Ok(Flow::Continue);
            }
        };

        match envelope.trnm.as_deref() {
            Some("PING") => {
                ws.send(Message::Text(text.to_string())).await?;
            }
            Some("REAL") => {
                for item in &envelope.data {
                    if let Some(event) = self.normalizer.normalize_item(item) {
                        if self.events.send(event).await.is_err() {
                            return Ok(Flow::Stop);
                        }
                    }
                }
            }
            Some("LOGIN") => debug!("duplicate login ack ignored"),
            other => debug!(trnm = ?other, "stream frame without business payload"),
        }
        Ok(Flow::Continue)
    }

    async fn next_message(&self, ws: &mut WsStream) -> Result<Message, StreamError> {
        match timeout(self.config.read_timeout, ws.next()).await {
            Err(_) => Err(StreamError::HeartbeatStalled),
            Ok(None) => Err(StreamError::ConnectionClosed),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(Some(Ok(message))) => Ok(message),
        }
    }

    async fn set_status(&self, status: SupervisorStatus) {
        let mut current = self.status.write().await;
        if *current != status {
            debug!(from = ?*current, to = ?status, "stream status");
            *current = status;
        }
    }
}

/// The reconnect schedule: floor, doubling, cap, no jitter.
pub(crate) fn reconnect_backoff(config: &StreamConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: config.backoff_floor,
        randomization_factor: 0.0,
        multiplier: 2.0,
        max_interval: config.backoff_cap,
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Subscription;
    use backoff::backoff::Backoff;
    use std::time::Duration;

    fn config() -> StreamConfig {
        StreamConfig {
            ws_url: "ws://127.0.0.1:1/ws".to_string(),
            backoff_floor: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
            read_timeout: Duration::from_secs(45),
            subscription: Subscription::order_executions(),
        }
    }

    #[test]
    fn test_backoff_first_retry_within_bound() {
        let mut backoff = reconnect_backoff(&config());
        let first = backoff.next_backoff().expect("backoff never exhausts");
        assert!(first <= Duration::from_millis(1500));
        assert_eq!(first, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let mut backoff = reconnect_backoff(&config());
        let mut delays = Vec::new();
        for _ in 0..7 {
            delays.push(backoff.next_backoff().unwrap());
        }
        let secs: Vec<u64> = delays.iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_backoff_resets_to_floor() {
        let mut backoff = reconnect_backoff(&config());
        for _ in 0..5 {
            backoff.next_backoff();
        }
        backoff.reset();
        assert_eq!(backoff.next_backoff().unwrap(), Duration::from_secs(1));
    }
}
