//! # Transport
//!
//! The seam between the connection manager and the wire, plus the driver task
//! that owns one live link at a time.
//!
//! The driver reports everything it does as [`TransportEvent`]s through an
//! [`EventSink`]. After the initial handshake it behaves like this:
//!
//! - handshake fails or times out: `ConnectError`, driver exits
//! - server closes the link: `Disconnect(ServerInitiated)`, driver exits
//! - link lost: `Disconnect(TransportClosed | TransportError)`, then up to
//!   `transport_reconnect.max_attempts` reconnects spaced by
//!   `transport_reconnect.interval`, each reported as `ReconnectAttempt(n)`
//!   followed by `Reconnect(n)` or `ReconnectError`; when the budget runs out,
//!   `ReconnectFailed` and the driver exits
//! - cancelled: link closed, `Disconnect(ClientInitiated)`, driver exits

use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, Result};
use async_trait::async_trait;
use shared::dto::chat::ClientRole;
use shared::dto::realtime::EventFrame;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Authentication presented during the handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub role: ClientRole,
    pub user_id: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, role: ClientRole, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            role,
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// What a link produced on read.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Frame(EventFrame),
    /// The server sent a close frame.
    ServerClosed,
    /// The stream ended or failed without a close frame.
    Lost(Option<String>),
}

/// One established connection.
#[async_trait]
pub trait Link: Send {
    async fn send(&mut self, frame: EventFrame) -> Result<()>;

    /// Next inbound event. Must be cancel safe.
    async fn recv(&mut self) -> LinkEvent;

    async fn close(&mut self);
}

/// Opens links.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Link>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientInitiated,
    ServerInitiated,
    TransportClosed,
    TransportError(String),
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::ClientInitiated => "io client disconnect",
            DisconnectReason::ServerInitiated => "io server disconnect",
            DisconnectReason::TransportClosed => "transport close",
            DisconnectReason::TransportError(_) => "transport error",
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::TransportError(e) => write!(f, "transport error: {}", e),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connect,
    Disconnect(DisconnectReason),
    ConnectError(String),
    ReconnectAttempt(u32),
    Reconnect(u32),
    ReconnectError(String),
    ReconnectFailed,
    Message(EventFrame),
}

pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Owner side of a running driver. Dropping it cancels the driver.
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<EventFrame>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TransportHandle {
    pub fn spawn(
        connector: Arc<dyn Connector>,
        credentials: Credentials,
        config: &RealtimeConfig,
        sink: EventSink,
    ) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let driver = Driver {
            connector,
            credentials,
            connect_timeout: config.connect_timeout,
            reconnect_delay: config.transport_reconnect.interval,
            reconnect_attempts: config.transport_reconnect.max_attempts,
            sink,
            outbound: outbound_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            outbound,
            cancel,
            task,
        }
    }

    /// Queue a frame for the live link.
    pub fn send(&self, frame: EventFrame) -> Result<()> {
        self.outbound
            .send(frame)
            .map_err(|_| RealtimeError::ChannelClosed)
    }

    /// Cancel the driver and wait until the link is closed.
    pub async fn close(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.task).await;
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum PumpExit {
    Cancelled,
    ServerClosed,
    Lost(Option<String>),
}

struct Driver {
    connector: Arc<dyn Connector>,
    credentials: Credentials,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    reconnect_attempts: u32,
    sink: EventSink,
    outbound: mpsc::UnboundedReceiver<EventFrame>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        let mut link = match self.connect_once().await {
            None => return,
            Some(Ok(link)) => {
                (self.sink)(TransportEvent::Connect);
                link
            }
            Some(Err(e)) => {
                (self.sink)(TransportEvent::ConnectError(e.to_string()));
                return;
            }
        };

        loop {
            match self.pump(link.as_mut()).await {
                PumpExit::Cancelled => {
                    link.close().await;
                    (self.sink)(TransportEvent::Disconnect(DisconnectReason::ClientInitiated));
                    return;
                }
                PumpExit::ServerClosed => {
                    (self.sink)(TransportEvent::Disconnect(DisconnectReason::ServerInitiated));
                    return;
                }
                PumpExit::Lost(reason) => {
                    let reason = match reason {
                        Some(e) => DisconnectReason::TransportError(e),
                        None => DisconnectReason::TransportClosed,
                    };
                    warn!(reason = %reason, "Realtime link lost, reconnecting");
                    (self.sink)(TransportEvent::Disconnect(reason));

                    match self.reconnect().await {
                        Some(next) => link = next,
                        None => return,
                    }
                }
            }
        }
    }

    /// `None` when cancelled mid-handshake.
    async fn connect_once(&self) -> Option<Result<Box<dyn Link>>> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = tokio::time::timeout(self.connect_timeout, self.connector.connect(&self.credentials)) => {
                Some(result.unwrap_or(Err(RealtimeError::Timeout(self.connect_timeout))))
            }
        }
    }

    async fn reconnect(&self) -> Option<Box<dyn Link>> {
        for attempt in 1..=self.reconnect_attempts {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }

            (self.sink)(TransportEvent::ReconnectAttempt(attempt));
            match self.connect_once().await {
                None => return None,
                Some(Ok(link)) => {
                    info!(attempt, "Realtime link re-established");
                    (self.sink)(TransportEvent::Reconnect(attempt));
                    return Some(link);
                }
                Some(Err(e)) => {
                    (self.sink)(TransportEvent::ReconnectError(e.to_string()));
                }
            }
        }

        (self.sink)(TransportEvent::ReconnectFailed);
        None
    }

    async fn pump(&mut self, link: &mut dyn Link) -> PumpExit {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return PumpExit::Cancelled,
                frame = self.outbound.recv() => match frame {
                    Some(frame) => {
                        debug!(event = %frame.event, "Sending realtime frame");
                        if let Err(e) = link.send(frame).await {
                            return PumpExit::Lost(Some(e.to_string()));
                        }
                    }
                    None => return PumpExit::Cancelled,
                },
                event = link.recv() => match event {
                    LinkEvent::Frame(frame) => (self.sink)(TransportEvent::Message(frame)),
                    LinkEvent::ServerClosed => return PumpExit::ServerClosed,
                    LinkEvent::Lost(reason) => return PumpExit::Lost(reason),
                },
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{MockConnector, Outcome};
    use super::*;
    use parking_lot::Mutex;
    use shared::dto::chat::SenderType;

    fn recording_sink() -> (EventSink, Arc<Mutex<Vec<TransportEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: EventSink = Arc::new(move |event| sink_events.lock().push(event));
        (sink, events)
    }

    fn credentials() -> Credentials {
        Credentials::new("secret-token", SenderType::User, "u1")
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let printed = format!("{:?}", credentials());
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_reports_connect_error() {
        let connector = Arc::new(MockConnector::scripted([Outcome::Hang]));
        let (sink, events) = recording_sink();

        let handle = TransportHandle::spawn(connector, credentials(), &RealtimeConfig::default(), sink);
        tokio::time::sleep(Duration::from_secs(11)).await;

        let events = events.lock().clone();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TransportEvent::ConnectError(e) if e.contains("timed out")));
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_link_runs_transport_reconnects_until_budget() {
        let connector = Arc::new(
            MockConnector::scripted([Outcome::Accept]).then(Outcome::Reject),
        );
        let (sink, events) = recording_sink();

        let _handle = TransportHandle::spawn(
            connector.clone(),
            credentials(),
            &RealtimeConfig::default(),
            sink,
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        connector.link(0).push(LinkEvent::Lost(None));
        tokio::time::sleep(Duration::from_secs(60)).await;

        let events = events.lock().clone();
        assert_eq!(events[0], TransportEvent::Connect);
        assert_eq!(
            events[1],
            TransportEvent::Disconnect(DisconnectReason::TransportClosed)
        );
        let attempts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::ReconnectAttempt(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2, 3, 4, 5]);
        assert_eq!(events.last(), Some(&TransportEvent::ReconnectFailed));
        assert_eq!(connector.attempts(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_closes_link_and_reports_client_disconnect() {
        let connector = Arc::new(MockConnector::default());
        let (sink, events) = recording_sink();

        let handle = TransportHandle::spawn(
            connector.clone(),
            credentials(),
            &RealtimeConfig::default(),
            sink,
        );
        tokio::time::sleep(Duration::from_millis(10)).await;

        handle
            .send(EventFrame::new("join_chat", serde_json::json!("c1")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.close().await;

        let link = connector.link(0);
        assert_eq!(link.sent_events(), vec!["join_chat"]);
        assert!(link.is_closed());
        assert_eq!(
            events.lock().last(),
            Some(&TransportEvent::Disconnect(DisconnectReason::ClientInitiated))
        );
    }
}
