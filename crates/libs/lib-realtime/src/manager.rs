//! # Connection Manager
//!
//! Owns the realtime connection of one client: credentials, the transport
//! driver, the manager-level reconnect timer and the periodic pending sweep.
//!
//! ## State machine
//!
//! ```text
//! init ──> Connecting ──connect──> Connected ──transport lost──> Disconnected
//!              │                      ▲    │                        │
//!        connect_error                │    └─server close──┐   reconnect_attempt
//!              ▼                      │                    ▼        ▼
//!            Error ──(timer)──> Connecting <──(timer)── Disconnected Reconnecting
//!              ▲                                                    │
//!              └──────────────── reconnect_failed ──────────────────┘
//! ```
//!
//! - a client `disconnect()` is terminal until the next `init`
//! - a server-initiated disconnect and a failed handshake schedule a manager
//!   reconnect (`manager_reconnect` policy)
//! - a lost link is retried by the transport itself (`transport_reconnect`
//!   policy); exhausting that budget lands in `Error` until the next `init`
//!
//! Every successful connect or reconnect triggers a pending sweep.
//!
//! Transport events carry the generation of the driver that produced them;
//! events from a torn-down driver are ignored.

use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, Result};
use crate::events::{ChatEvent, Listener, ListenerRegistry};
use crate::pending::{Emitter, PendingProcessor};
use crate::transport::{Connector, Credentials, DisconnectReason, EventSink, TransportEvent, TransportHandle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::dto::realtime::{
    events, AcceptSupportChatPayload, CloseSupportChatPayload, EventFrame, NewMessagePayload,
    SupportMessagePayload, TypingPayload,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

#[derive(Default)]
struct Inner {
    credentials: Option<Credentials>,
    transport: Option<TransportHandle>,
    /// Manager-level reconnects since the last successful connect
    reconnect_attempts: u32,
    /// Last transport-level attempt number reported
    transport_attempt: u32,
    reconnect_timer: Option<JoinHandle<()>>,
    sweeper: Option<JoinHandle<()>>,
}

pub struct ConnectionManager {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    processor: Option<Arc<PendingProcessor>>,
    listeners: ListenerRegistry,
    state: watch::Sender<ConnectionState>,
    generation: AtomicU64,
    inner: Mutex<Inner>,
    weak_self: Weak<ConnectionManager>,
}

impl ConnectionManager {
    pub fn new(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        processor: Option<Arc<PendingProcessor>>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Arc::new_cyclic(|weak_self| Self {
            config,
            connector,
            processor,
            listeners: ListenerRegistry::new(),
            state,
            generation: AtomicU64::new(0),
            inner: Mutex::new(Inner::default()),
            weak_self: weak_self.clone(),
        })
    }

    // region: --- Lifecycle

    /// (Re)establish the connection. Any existing connection is closed first.
    pub async fn init(&self, credentials: Credentials) {
        info!(user_id = %credentials.user_id, role = %credentials.role, "Initializing realtime connection");

        let previous = self.teardown(&mut self.inner.lock());
        if let Some(transport) = previous {
            transport.close().await;
        }

        {
            let mut inner = self.inner.lock();
            inner.credentials = Some(credentials);
            inner.reconnect_attempts = 0;
            inner.transport_attempt = 0;
        }

        self.open_transport(None);
        self.start_sweeper();
    }

    /// Close the connection. Nothing reconnects until the next `init`.
    pub async fn disconnect(&self) {
        let (previous, changed) = {
            let mut inner = self.inner.lock();
            let previous = self.teardown(&mut inner);
            inner.credentials = None;
            (previous, self.store_state(ConnectionState::Disconnected))
        };
        if changed {
            self.notify_state();
        }

        if let Some(transport) = previous {
            transport.close().await;
        }

        self.dispatch_remote(
            events::DISCONNECT,
            json!(DisconnectReason::ClientInitiated.as_str()),
        );
        info!("Realtime connection closed by client");
    }

    /// Invalidate the current driver and stop the timers. Returns the old
    /// transport so the caller can await its close outside the lock.
    ///
    /// Runs under the `inner` lock: every generation bump does, so a check
    /// made while holding the lock stays valid until it is released.
    fn teardown(&self, inner: &mut Inner) -> Option<TransportHandle> {
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(sweeper) = inner.sweeper.take() {
            sweeper.abort();
        }
        inner.reconnect_attempts = 0;
        inner.transport.take()
    }

    /// Start a new driver. `expected` is the generation a reconnect timer was
    /// scheduled for; the timer is stale once anything else bumped it.
    fn open_transport(&self, expected: Option<u64>) {
        let (generation, changed, previous) = {
            let mut inner = self.inner.lock();
            let Some(credentials) = inner.credentials.clone() else {
                warn!("No credentials, not opening realtime connection");
                return;
            };
            if let Some(expected) = expected {
                if self.generation.load(Ordering::SeqCst) != expected {
                    debug!(expected, "Reconnect superseded, not opening realtime connection");
                    return;
                }
            }

            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let changed = self.store_state(ConnectionState::Connecting);

            let weak = self.weak_self.clone();
            let sink: EventSink = Arc::new(move |event| {
                if let Some(manager) = weak.upgrade() {
                    manager.handle_transport_event(generation, event);
                }
            });
            let handle = TransportHandle::spawn(
                self.connector.clone(),
                credentials,
                &self.config,
                sink,
            );
            (generation, changed, inner.transport.replace(handle))
        };
        // Dropping a handle cancels its driver.
        drop(previous);

        if changed {
            self.notify_state();
        }
        debug!(generation, url = %self.config.socket_url, "Realtime transport started");
    }

    /// Schedule a manager reconnect on behalf of the driver of `generation`.
    fn schedule_reconnect(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.credentials.is_none() || self.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        let policy = self.config.manager_reconnect;
        if inner.reconnect_attempts >= policy.max_attempts {
            error!(
                attempts = inner.reconnect_attempts,
                max_attempts = policy.max_attempts,
                "Max reconnect attempts reached, giving up"
            );
            return;
        }

        inner.reconnect_attempts += 1;
        let attempt = inner.reconnect_attempts;
        // The failed driver is done; whatever it still reports is stale.
        let scheduled = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = policy.interval.as_millis() as u64,
            "Scheduling reconnect"
        );

        let weak = self.weak_self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(policy.interval).await;
            if let Some(manager) = weak.upgrade() {
                info!(attempt, "Reconnecting");
                manager.open_transport(Some(scheduled));
            }
        });

        if let Some(previous) = inner.reconnect_timer.replace(timer) {
            previous.abort();
        }
    }

    fn start_sweeper(&self) {
        let Some(processor) = self.processor.clone() else {
            return;
        };

        let weak = self.weak_self.clone();
        let period = self.config.sweep_interval;
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                if manager.connection_state() == ConnectionState::Connected {
                    manager.sweep(&processor).await;
                }
            }
        });

        if let Some(previous) = self.inner.lock().sweeper.replace(sweeper) {
            previous.abort();
        }
    }

    // endregion: --- Lifecycle

    // region: --- Transport events

    fn handle_transport_event(&self, generation: u64, event: TransportEvent) {
        // Staleness check and state change happen under one lock so a
        // concurrent `disconnect()` or `init()` cannot slip in between.
        let changed = {
            let mut inner = self.inner.lock();
            if generation != self.generation.load(Ordering::SeqCst) {
                trace!(generation, ?event, "Ignoring event from stale transport");
                return;
            }
            let next = match &event {
                TransportEvent::Connect | TransportEvent::Reconnect(_) => {
                    inner.reconnect_attempts = 0;
                    Some(ConnectionState::Connected)
                }
                TransportEvent::Disconnect(_) => Some(ConnectionState::Disconnected),
                TransportEvent::ConnectError(_) | TransportEvent::ReconnectFailed => {
                    Some(ConnectionState::Error)
                }
                TransportEvent::ReconnectAttempt(attempt) => {
                    inner.transport_attempt = *attempt;
                    Some(ConnectionState::Reconnecting)
                }
                TransportEvent::ReconnectError(_) | TransportEvent::Message(_) => None,
            };
            next.is_some_and(|state| self.store_state(state))
        };
        if changed {
            self.notify_state();
        }

        match event {
            TransportEvent::Connect => {
                info!("Realtime connection established");
                self.dispatch_remote(events::CONNECT, Value::Null);
                self.flush_pending();
            }
            TransportEvent::Disconnect(reason) => {
                info!(reason = %reason, "Realtime connection closed");
                self.dispatch_remote(events::DISCONNECT, json!(reason.as_str()));
                if reason == DisconnectReason::ServerInitiated {
                    self.schedule_reconnect(generation);
                }
            }
            TransportEvent::ConnectError(message) => {
                error!(error = %message, "Realtime connection error");
                self.dispatch_remote(events::CONNECT_ERROR, json!(message));
                self.schedule_reconnect(generation);
            }
            TransportEvent::ReconnectAttempt(attempt) => {
                info!(attempt, "Realtime reconnect attempt");
                self.dispatch_remote(events::RECONNECT_ATTEMPT, json!(attempt));
            }
            TransportEvent::Reconnect(attempt) => {
                info!(attempt, "Realtime connection re-established");
                self.dispatch_remote(events::RECONNECT, json!(attempt));
                self.flush_pending();
            }
            TransportEvent::ReconnectError(message) => {
                warn!(error = %message, "Realtime reconnect error");
                self.dispatch_remote(events::RECONNECT_ERROR, json!(message));
            }
            TransportEvent::ReconnectFailed => {
                error!("Realtime reconnect budget exhausted");
                self.dispatch_remote(events::RECONNECT_FAILED, Value::Null);
            }
            TransportEvent::Message(EventFrame { event, data }) => {
                self.dispatch_remote(&event, data);
            }
        }
    }

    /// Publish `next` on the watch channel. Listeners are notified separately,
    /// outside the `inner` lock.
    fn store_state(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    /// Tell listeners about the current watch value, which may already be
    /// newer than the transition that triggered the call.
    fn notify_state(&self) {
        let state = self.connection_state();
        debug!(state = %state, "Connection state changed");
        self.listeners.dispatch(
            events::CONNECTION_STATE_CHANGED,
            &ChatEvent::StateChanged(state),
        );
    }

    fn dispatch_remote(&self, event: &str, data: Value) {
        self.listeners.dispatch(
            event,
            &ChatEvent::Remote {
                event: event.to_string(),
                data,
            },
        );
    }

    fn flush_pending(&self) {
        let Some(processor) = self.processor.clone() else {
            return;
        };

        let weak = self.weak_self.clone();
        tokio::spawn(async move {
            if let Some(manager) = weak.upgrade() {
                manager.sweep(&processor).await;
            }
        });
    }

    async fn sweep(&self, processor: &PendingProcessor) {
        let Some(report) = processor.process_pending_messages(self).await else {
            return;
        };

        for dropped in report.dropped {
            self.listeners.dispatch(
                events::PENDING_MESSAGE_DROPPED,
                &ChatEvent::PendingDropped(dropped),
            );
        }
    }

    // endregion: --- Transport events

    // region: --- Public API

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().reconnect_attempts
    }

    pub fn transport_attempt(&self) -> u32 {
        self.inner.lock().transport_attempt
    }

    pub fn processor(&self) -> Option<&Arc<PendingProcessor>> {
        self.processor.as_ref()
    }

    /// Subscribe to `connectionStateChanged`, `pendingMessageDropped` or any
    /// raw event name. Registering the same listener twice has no effect.
    pub fn on(&self, event: &str, listener: Listener) {
        self.listeners.on(event, listener);
    }

    pub fn off(&self, event: &str, listener: &Listener) {
        self.listeners.off(event, listener);
    }

    /// Send an event, or log a warning and drop it when not connected.
    pub fn emit(&self, event: &str, data: Value) {
        if let Err(e) = self.try_emit(event, data) {
            warn!(event, error = %e, "Dropping realtime event");
        }
    }

    /// Send an event, reporting why it could not be sent.
    pub fn try_emit(&self, event: &str, data: Value) -> Result<()> {
        if !self.is_connected() {
            return Err(RealtimeError::NotConnected(event.to_string()));
        }

        let inner = self.inner.lock();
        let transport = inner
            .transport
            .as_ref()
            .ok_or_else(|| RealtimeError::NotConnected(event.to_string()))?;
        transport.send(EventFrame::new(event, data))
    }

    fn emit_payload<T: Serialize>(&self, event: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(data) => self.emit(event, data),
            Err(e) => error!(event, error = %e, "Failed to encode realtime payload"),
        }
    }

    pub fn join_chat(&self, chat_id: &str) {
        self.emit(events::JOIN_CHAT, json!(chat_id));
    }

    pub fn leave_chat(&self, chat_id: &str) {
        self.emit(events::LEAVE_CHAT, json!(chat_id));
    }

    pub fn join_support_chat(&self, chat_id: &str) {
        self.emit(events::JOIN_SUPPORT_CHAT, json!(chat_id));
    }

    pub fn leave_support_chat(&self, chat_id: &str) {
        self.emit(events::LEAVE_SUPPORT_CHAT, json!(chat_id));
    }

    pub fn send_message(&self, payload: &NewMessagePayload) {
        self.emit_payload(events::NEW_MESSAGE, payload);
    }

    pub fn send_support_message(&self, payload: &SupportMessagePayload) {
        self.emit_payload(events::NEW_SUPPORT_MESSAGE, payload);
    }

    pub fn close_support_chat(&self, chat_id: &str, reason: Option<&str>) {
        self.emit_payload(
            events::CLOSE_SUPPORT_CHAT,
            &CloseSupportChatPayload {
                chat_id: chat_id.to_string(),
                reason: reason.map(str::to_string),
            },
        );
    }

    /// Take a waiting support chat as an agent. The hub answers with
    /// `agent_accepted`.
    pub fn accept_support_chat(&self, chat_id: &str) {
        self.emit_payload(
            events::ACCEPT_SUPPORT_CHAT,
            &AcceptSupportChatPayload {
                chat_id: chat_id.to_string(),
            },
        );
    }

    pub fn start_typing(&self, chat_id: &str) {
        self.emit_payload(
            events::TYPING_STARTED,
            &TypingPayload {
                chat_id: chat_id.to_string(),
            },
        );
    }

    pub fn stop_typing(&self, chat_id: &str) {
        self.emit_payload(
            events::TYPING_STOPPED,
            &TypingPayload {
                chat_id: chat_id.to_string(),
            },
        );
    }

    // endregion: --- Public API
}

impl Emitter for ConnectionManager {
    fn try_emit(&self, event: &str, data: Value) -> Result<()> {
        ConnectionManager::try_emit(self, event, data)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(sweeper) = inner.sweeper.take() {
            sweeper.abort();
        }
    }
}
