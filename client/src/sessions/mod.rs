//! # Chat Sessions
//!
//! A session is one consumer's view of chats: cached history, REST
//! reconciliation and realtime events folded into a single state that the
//! caller snapshots with `view()`.
//!
//! - [`ChatSession`]: marketplace chats between users
//! - [`SupportChatSession`]: support chats, as user, agent or admin
//!
//! Loading shows cached data first, then replaces it with the REST result and
//! rewrites the cache. Sending is optimistic: the message is appended with a
//! client-generated id, delivered over the socket (or queued in the outbox
//! when disconnected), persisted over REST with the same id, and finally
//! swapped in place for the server copy.
//!
//! Closing a session unregisters its listeners and cancels in-flight REST
//! calls. Nothing a closed session started writes to its view afterwards.

pub mod chat;
pub mod support;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::ChatSession;
pub use support::SupportChatSession;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use lib_core::{ChatCache, PendingChannel};
use lib_realtime::{ConnectionManager, ConnectionState, Listener, RealtimeError};
use parking_lot::{Mutex, RwLock};
use shared::dto::api::SendMessageRequest;
use shared::dto::chat::{Chat, Message, SupportChat, SupportMessage};
use shared::dto::realtime::EventFrame;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// region: --- View state

/// Snapshot of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView<C, M> {
    /// Most recently updated first
    pub chats: Vec<C>,
    pub active_chat_id: Option<String>,
    /// Set when the active chat is present in `chats`
    pub active_chat: Option<C>,
    /// Messages of the active chat, oldest first
    pub messages: Vec<M>,
    pub is_loading: bool,
    pub is_sending: bool,
    pub connection_state: ConnectionState,
    pub last_error: Option<String>,
}

pub type ChatView = SessionView<Chat, Message>;
pub type SupportChatView = SessionView<SupportChat, SupportMessage>;

impl<C, M> Default for SessionView<C, M> {
    fn default() -> Self {
        Self {
            chats: Vec::new(),
            active_chat_id: None,
            active_chat: None,
            messages: Vec::new(),
            is_loading: false,
            is_sending: false,
            connection_state: ConnectionState::default(),
            last_error: None,
        }
    }
}

impl<C, M> SessionView<C, M> {
    pub(crate) fn is_active(&self, chat_id: &str) -> bool {
        self.active_chat_id.as_deref() == Some(chat_id)
    }
}

impl<C: Keyed + Clone, M> SessionView<C, M> {
    /// Refresh `active_chat` from the list after the list changed.
    pub(crate) fn sync_active_chat(&mut self) {
        self.active_chat = match &self.active_chat_id {
            Some(id) => self.chats.iter().find(|c| c.key() == id).cloned(),
            None => None,
        };
    }
}

/// Anything stored in a view list by id.
pub(crate) trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })*
    };
}

keyed!(Chat, SupportChat, Message, SupportMessage);

/// Append `message` unless one with the same id is already there.
pub(crate) fn push_unique<M: Keyed>(messages: &mut Vec<M>, message: M) -> bool {
    if messages.iter().any(|m| m.key() == message.key()) {
        return false;
    }
    messages.push(message);
    true
}

/// Swap the optimistic entry for the server copy, in place. If the server
/// copy already arrived over the socket the optimistic entry is just dropped.
pub(crate) fn replace_optimistic<M: Keyed>(messages: &mut Vec<M>, optimistic_id: &str, server: M) {
    if messages.iter().any(|m| m.key() == server.key()) {
        messages.retain(|m| m.key() != optimistic_id);
        return;
    }
    match messages.iter_mut().find(|m| m.key() == optimistic_id) {
        Some(slot) => *slot = server,
        None => messages.push(server),
    }
}

pub(crate) fn remove_by_key<M: Keyed>(messages: &mut Vec<M>, id: &str) {
    messages.retain(|m| m.key() != id);
}

/// Move the chat with `chat_id` to the front after `update` ran on it.
pub(crate) fn bump_chat<C: Keyed>(chats: &mut Vec<C>, chat_id: &str, update: impl FnOnce(&mut C)) -> bool {
    let Some(index) = chats.iter().position(|c| c.key() == chat_id) else {
        return false;
    };
    let mut chat = chats.remove(index);
    update(&mut chat);
    chats.insert(0, chat);
    true
}

/// Insert or replace a chat, placing it first.
pub(crate) fn upsert_front<C: Keyed>(chats: &mut Vec<C>, chat: C) {
    chats.retain(|c| c.key() != chat.key());
    chats.insert(0, chat);
}

pub(crate) fn bump_regular(chat: &mut Chat, message: &Message) {
    chat.last_message = Some(message.clone());
    chat.updated_at = Utc::now();
}

pub(crate) fn bump_support(chat: &mut SupportChat, message: &SupportMessage) {
    chat.last_message = Some(message.clone());
    chat.updated_at = Utc::now();
}

/// Messages worth caching: confirmed ones only.
pub(crate) fn confirmed<M: Clone>(messages: &[M], is_pending: impl Fn(&M) -> bool) -> Vec<M> {
    messages.iter().filter(|m| !is_pending(m)).cloned().collect()
}

// endregion: --- View state

// region: --- Session guard

/// Ties listener registrations and in-flight calls to the session lifetime.
pub(crate) struct SessionGuard {
    connection: Arc<ConnectionManager>,
    cancel: CancellationToken,
    registrations: Mutex<Vec<(&'static str, Listener)>>,
}

impl SessionGuard {
    pub(crate) fn new(connection: Arc<ConnectionManager>) -> Self {
        Self {
            connection,
            cancel: CancellationToken::new(),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub(crate) fn listen(&self, event: &'static str, listener: Listener) {
        self.connection.on(event, listener.clone());
        self.registrations.lock().push((event, listener));
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `future` unless the session closes first.
    pub(crate) async fn guarded<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_closed() {
            return Err(AppError::Cancelled);
        }
        match self.cancel.run_until_cancelled(future).await {
            Some(result) if !self.is_closed() => result,
            _ => {
                debug!("Discarding result of closed session");
                Err(AppError::Cancelled)
            }
        }
    }

    /// Spawn background work that is dropped when the session closes.
    pub(crate) fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            cancel.run_until_cancelled(future).await;
        });
    }

    pub(crate) fn close(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();

        let registrations = std::mem::take(&mut *self.registrations.lock());
        for (event, listener) in &registrations {
            self.connection.off(event, listener);
        }
        debug!(listeners = registrations.len(), "Session closed");
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// View state plus the guard that decides whether it may still be written.
pub(crate) struct SessionState<C, M> {
    pub(crate) guard: SessionGuard,
    view: RwLock<SessionView<C, M>>,
}

impl<C: Clone, M: Clone> SessionState<C, M> {
    pub(crate) fn new(connection: Arc<ConnectionManager>) -> Self {
        let view = SessionView {
            connection_state: connection.connection_state(),
            ..SessionView::default()
        };
        Self {
            guard: SessionGuard::new(connection),
            view: RwLock::new(view),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionView<C, M> {
        self.view.read().clone()
    }

    /// Apply `f` to the view unless the session is closed.
    pub(crate) fn update(&self, f: impl FnOnce(&mut SessionView<C, M>)) {
        if self.guard.is_closed() {
            return;
        }
        f(&mut self.view.write());
    }

    pub(crate) fn begin_loading(&self) {
        self.update(|view| {
            view.is_loading = true;
            view.last_error = None;
        });
    }

    /// Clear the loading flag and record a failure.
    pub(crate) fn settle<T>(&self, result: Result<T>, context: &str) -> Result<T> {
        match &result {
            Err(AppError::Cancelled) => {}
            Err(e) => {
                warn!(error = %e, "{}", context);
                self.update(|view| {
                    view.is_loading = false;
                    view.last_error = Some(e.to_string());
                });
            }
            Ok(_) => self.update(|view| view.is_loading = false),
        }
        result
    }

    /// Wrap a send: toggles `is_sending` and records the failure.
    pub(crate) async fn sending<T, F>(&self, chat_id: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.guard.is_closed() {
            return Err(AppError::Cancelled);
        }
        self.update(|view| view.is_sending = true);

        let result = future.await;

        self.update(|view| {
            view.is_sending = false;
            if let Err(e) = &result {
                view.last_error = Some(e.to_string());
            }
        });
        if let Err(e) = &result {
            error!(chat_id, error = %e, "Failed to send message");
        }
        result
    }

    pub(crate) fn set_connection_state(&self, state: ConnectionState, server: &str) {
        announce_state(state, server);
        self.update(|view| view.connection_state = state);
    }
}

/// Log connection transitions the way a user would be told about them.
pub(crate) fn announce_state(state: ConnectionState, server: &str) {
    if let Some(notice) = state_notice(state) {
        match state {
            ConnectionState::Connected => info!(server, "{}", notice),
            _ => warn!(server, state = %state, "{}", notice),
        }
    } else {
        debug!(server, state = %state, "Connection state changed");
    }
}

/// Wording for the states worth reporting. A reconnect is never implied.
fn state_notice(state: ConnectionState) -> Option<&'static str> {
    match state {
        ConnectionState::Connected => Some("Connected to chat server"),
        ConnectionState::Disconnected => Some("Disconnected from chat server"),
        ConnectionState::Error => Some("Chat server connection failed"),
        ConnectionState::Connecting | ConnectionState::Reconnecting => None,
    }
}

// endregion: --- Session guard

// region: --- Shared flows

/// A message on its way out.
pub(crate) struct Outgoing<'a> {
    pub chat_id: &'a str,
    pub content: &'a str,
    /// Marketplace chats address the other participant.
    pub recipient_id: Option<&'a str>,
}

/// What a marketplace session and a support session do differently. The
/// flows below ([`open_chat`], [`deliver`]) are written once against it.
#[async_trait]
pub(crate) trait Conversation: Send + Sync {
    type Chat: Keyed + Clone + Send + Sync;
    type Message: Keyed + Clone + Send + Sync;

    /// Log label.
    const KIND: &'static str;
    /// Outbox channel used while offline.
    const CHANNEL: PendingChannel;

    fn state(&self) -> &SessionState<Self::Chat, Self::Message>;
    fn cache(&self) -> &ChatCache;

    fn is_pending(message: &Self::Message) -> bool;
    /// Record `message` as the chat's latest.
    fn bump(chat: &mut Self::Chat, message: &Self::Message);
    fn optimistic(&self, id: &str, chat_id: &str, content: &str) -> Self::Message;
    /// Realtime frame for a live send, tagged with `client_id`.
    fn send_frame(&self, outgoing: &Outgoing<'_>, client_id: &str) -> serde_json::Result<EventFrame>;
    fn join(&self, chat_id: &str);

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Self::Message>>;
    async fn persist(&self, chat_id: &str, request: &SendMessageRequest) -> Result<Self::Message>;
    async fn cached_messages(&self, chat_id: &str) -> Vec<Self::Message>;
    async fn cache_messages(&self, chat_id: &str, messages: &[Self::Message]);
    async fn cache_chats(&self, chats: &[Self::Chat]);
}

/// Make `chat_id` the active chat: cached messages first, then the
/// server's, then join its realtime room. Messages still in flight survive
/// the swap.
pub(crate) async fn open_chat<S: Conversation>(session: &S, chat_id: &str) -> Result<()> {
    let state = session.state();
    state.begin_loading();
    state.update(|view| {
        if !view.is_active(chat_id) {
            view.messages.clear();
        }
        view.active_chat_id = Some(chat_id.to_string());
        view.sync_active_chat();
    });

    let cached = session.cached_messages(chat_id).await;
    if !cached.is_empty() {
        state.update(|view| {
            if view.is_active(chat_id) {
                view.messages = cached;
                view.is_loading = false;
            }
        });
    }

    let result = async {
        let fetched = state.guard.guarded(session.list_messages(chat_id)).await?;
        state.update(|view| {
            if view.is_active(chat_id) {
                let in_flight: Vec<S::Message> =
                    view.messages.iter().filter(|m| S::is_pending(m)).cloned().collect();
                view.messages = fetched.clone();
                for message in in_flight {
                    push_unique(&mut view.messages, message);
                }
            }
        });
        session.cache_messages(chat_id, &fetched).await;
        session.join(chat_id);
        Ok::<(), AppError>(())
    }
    .await;

    state.settle(result, "Failed to load messages")
}

/// Optimistic append, realtime emit (or outbox when offline), REST persist,
/// in-place swap for the server copy.
pub(crate) async fn deliver<S: Conversation>(session: &S, outgoing: Outgoing<'_>) -> Result<S::Message> {
    let chat_id = outgoing.chat_id;
    let state = session.state();

    // Visible before any I/O. Renamed to the outbox id if the send is queued.
    let draft_id = Uuid::new_v4().to_string();
    let draft = session.optimistic(&draft_id, chat_id, outgoing.content);
    state.update(|view| {
        if view.is_active(chat_id) {
            view.messages.push(draft);
        }
    });

    let client_id = match dispatch(session, &outgoing, &draft_id).await {
        Ok(client_id) => client_id,
        Err(e) => {
            state.update(|view| remove_by_key(&mut view.messages, &draft_id));
            return Err(e);
        }
    };
    if client_id != draft_id {
        let queued = session.optimistic(&client_id, chat_id, outgoing.content);
        state.update(|view| {
            if let Some(slot) = view.messages.iter_mut().find(|m| m.key() == draft_id) {
                *slot = queued;
            }
        });
    }

    let request = SendMessageRequest {
        content: outgoing.content.to_string(),
        client_message_id: Some(client_id.clone()),
    };
    let stored = match state.guard.guarded(session.persist(chat_id, &request)).await {
        Ok(stored) => stored,
        Err(e) => {
            state.update(|view| remove_by_key(&mut view.messages, &client_id));
            return Err(e);
        }
    };

    let mut to_cache = None;
    let mut chats = Vec::new();
    state.update(|view| {
        if view.is_active(chat_id) {
            replace_optimistic(&mut view.messages, &client_id, stored.clone());
            to_cache = Some(confirmed(&view.messages, S::is_pending));
        }
        bump_chat(&mut view.chats, chat_id, |chat| S::bump(chat, &stored));
        view.sync_active_chat();
        chats = view.chats.clone();
    });

    if let Some(messages) = to_cache {
        session.cache_messages(chat_id, &messages).await;
    }
    session.cache_chats(&chats).await;

    debug!(kind = S::KIND, chat_id, message_id = %stored.key(), client_message_id = %client_id, "Message sent");
    Ok(stored)
}

/// Hand the message to the socket, or to the outbox when offline. Returns
/// the id the message travels under: `client_id` when emitted live, the
/// outbox id when queued.
async fn dispatch<S: Conversation>(session: &S, outgoing: &Outgoing<'_>, client_id: &str) -> Result<String> {
    let chat_id = outgoing.chat_id;
    let connection = session.state().guard.connection();
    if connection.is_connected() {
        let emitted = session
            .send_frame(outgoing, client_id)
            .map_err(RealtimeError::from)
            .and_then(|frame| connection.try_emit(&frame.event, frame.data));
        match emitted {
            Ok(()) => return Ok(client_id.to_string()),
            Err(e) => warn!(kind = S::KIND, chat_id, error = %e, "Realtime send failed, queueing message"),
        }
    }

    let pending_id = session
        .cache()
        .store_pending_message(chat_id, outgoing.content, S::CHANNEL)
        .await?;
    info!(kind = S::KIND, chat_id, pending_id = %pending_id, "Message will be sent when connection is restored");
    Ok(pending_id)
}

// endregion: --- Shared flows

#[cfg(test)]
mod tests {
    use super::*;
    use shared::dto::chat::Message;

    fn message(id: &str) -> Message {
        Message::optimistic(id, "c1", "u1", "hi")
    }

    #[test]
    fn test_replace_optimistic_keeps_position() {
        let mut messages = vec![message("m1"), message("tmp"), message("m2")];
        let mut server = message("m3");
        server.pending = false;

        replace_optimistic(&mut messages, "tmp", server);

        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3", "m2"]);
        assert!(!messages[1].pending);
    }

    #[test]
    fn test_replace_optimistic_when_server_copy_already_arrived() {
        let mut messages = vec![message("tmp"), message("m3")];

        replace_optimistic(&mut messages, "tmp", message("m3"));

        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m3"]);
    }

    #[test]
    fn test_push_unique_ignores_duplicates() {
        let mut messages = vec![message("m1")];

        assert!(!push_unique(&mut messages, message("m1")));
        assert!(push_unique(&mut messages, message("m2")));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_state_notice_never_promises_reconnect() {
        assert_eq!(state_notice(ConnectionState::Connected), Some("Connected to chat server"));
        assert_eq!(
            state_notice(ConnectionState::Disconnected),
            Some("Disconnected from chat server")
        );
        assert_eq!(
            state_notice(ConnectionState::Error),
            Some("Chat server connection failed")
        );
        assert_eq!(state_notice(ConnectionState::Reconnecting), None);
        for state in [ConnectionState::Disconnected, ConnectionState::Error] {
            assert!(!state_notice(state).unwrap().contains("reconnect"));
        }
    }

    #[test]
    fn test_bump_moves_chat_to_front() {
        let chat = |id: &str| Chat {
            id: id.to_string(),
            ad_id: None,
            participant_ids: vec![],
            status: None,
            last_message: None,
            unread_count: 0,
            created_at: None,
            updated_at: Utc::now(),
        };
        let mut chats = vec![chat("a"), chat("b"), chat("c")];

        assert!(bump_chat(&mut chats, "c", |c| c.unread_count = 1));
        assert!(!bump_chat(&mut chats, "zzz", |_| {}));

        let ids: Vec<&str> = chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(chats[0].unread_count, 1);
    }
}
