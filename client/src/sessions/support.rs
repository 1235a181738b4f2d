//! # Support Chat Session
//!
//! Support chats seen by a user, an agent or an admin. The role picks the
//! REST base path; the realtime events are the same for every role.
//!
//! Besides messages, the hub pushes lifecycle changes for support chats
//! (accepted by an agent, closed, status updates). Those are applied to the
//! chat list and the active chat as they arrive.

use super::{
    bump_chat, bump_support, confirmed, deliver, open_chat, push_unique, upsert_front,
    Conversation, Outgoing, SessionState, SupportChatView,
};
use crate::api::ChatApi;
use crate::error::{AppError, Result};
use crate::runtime::ChatRuntime;
use async_trait::async_trait;
use chrono::Utc;
use lib_core::{ChatCache, PendingChannel};
use lib_realtime::{listener, ChatEvent, ConnectionState, RealtimeError};
use serde::Serialize;
use serde_json::Value;
use shared::dto::api::{CreateSupportChatRequest, SendMessageRequest};
use shared::dto::chat::{ClientRole, SupportChat, SupportChatStatus, SupportMessage};
use shared::dto::realtime::{
    events, AcceptSupportChatPayload, ChatStatusPayload, CloseSupportChatPayload, EventFrame,
    SupportMessagePayload,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SupportChatSession {
    inner: Arc<Inner>,
}

struct Inner {
    user_id: String,
    role: ClientRole,
    api: Arc<dyn ChatApi>,
    cache: ChatCache,
    state: SessionState<SupportChat, SupportMessage>,
}

type RemoteHandler = fn(&Inner, &str, &Value);

impl SupportChatSession {
    pub fn new(runtime: &ChatRuntime) -> Self {
        let credentials = runtime.credentials();
        let inner = Arc::new(Inner {
            user_id: credentials.user_id.clone(),
            role: credentials.role,
            api: runtime.api(),
            cache: runtime.cache().clone(),
            state: SessionState::new(runtime.connection()),
        });
        Inner::subscribe(&inner);

        Self { inner }
    }

    pub fn view(&self) -> SupportChatView {
        self.inner.state.snapshot()
    }

    pub fn role(&self) -> ClientRole {
        self.inner.role
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.guard.is_closed()
    }

    /// Show cached support chats, then replace them with the server's list.
    pub async fn load_chats(&self) -> Result<()> {
        let inner = &self.inner;
        inner.state.begin_loading();

        let cached = inner.cache.get_cached_support_chats().await;
        if !cached.is_empty() {
            debug!(count = cached.len(), role = %inner.role, "Showing cached support chats");
            inner.state.update(|view| {
                view.chats = cached;
                view.sync_active_chat();
                view.is_loading = false;
            });
        }

        let result = inner.fetch_chats().await;
        inner.state.settle(result, "Failed to load support chats")
    }

    pub async fn refresh_chats(&self) -> Result<()> {
        self.inner.state.begin_loading();
        let result = self.inner.fetch_chats().await;
        self.inner.state.settle(result, "Failed to refresh support chats")
    }

    pub async fn set_active_chat(&self, chat_id: &str) -> Result<()> {
        open_chat(self.inner.as_ref(), chat_id).await
    }

    /// Send a support message, authored with this session's role.
    pub async fn send_message(&self, chat_id: &str, content: &str) -> Result<SupportMessage> {
        lib_utils::validate_not_empty(content, "Message").map_err(AppError::Validation)?;

        let outgoing = Outgoing {
            chat_id,
            content,
            recipient_id: None,
        };
        let inner = self.inner.as_ref();
        inner.state.sending(chat_id, deliver(inner, outgoing)).await
    }

    /// Open a new support chat. Category and priority fall back to the
    /// server defaults when omitted.
    pub async fn create_support_chat(
        &self,
        subject: &str,
        message: &str,
        category: Option<String>,
        priority: Option<i32>,
    ) -> Result<SupportChat> {
        lib_utils::validate_not_empty(subject, "Subject").map_err(AppError::Validation)?;
        lib_utils::validate_not_empty(message, "Message").map_err(AppError::Validation)?;

        let inner = &self.inner;
        inner.state.begin_loading();

        let request = CreateSupportChatRequest {
            subject: subject.to_string(),
            message: message.to_string(),
            category,
            priority,
        };
        let result = async {
            let chat = inner
                .state
                .guard
                .guarded(inner.api.create_support_chat(&request))
                .await?;
            let chats = inner.upsert(chat.clone());
            inner.cache.cache_support_chats(&chats).await;
            info!(chat_id = %chat.id, category = %chat.category, "Support chat created");
            Ok::<SupportChat, AppError>(chat)
        }
        .await;

        inner.state.settle(result, "Failed to create support chat")
    }

    pub async fn mark_as_resolved(&self, chat_id: &str) -> Result<()> {
        let inner = &self.inner;
        inner.state.begin_loading();

        let result = async {
            inner
                .state
                .guard
                .guarded(inner.api.resolve_support_chat(inner.role, chat_id))
                .await?;
            let chats = inner.apply_status(chat_id, |chat| chat.status = SupportChatStatus::Resolved);
            inner.cache.cache_support_chats(&chats).await;
            info!(chat_id, role = %inner.role, "Support chat resolved");
            Ok::<(), AppError>(())
        }
        .await;

        inner.state.settle(result, "Failed to resolve support chat")
    }

    /// Take a waiting chat as an agent. Needs a live connection; the hub
    /// answers with `agent_accepted`, which updates the list.
    pub fn accept_chat(&self, chat_id: &str) -> Result<()> {
        let payload = AcceptSupportChatPayload {
            chat_id: chat_id.to_string(),
        };
        self.inner.request(events::ACCEPT_SUPPORT_CHAT, chat_id, &payload)?;
        info!(chat_id, role = %self.inner.role, "Support chat accept requested");
        Ok(())
    }

    /// Ask the hub to close `chat_id`. Needs a live connection.
    pub fn close_chat(&self, chat_id: &str, reason: Option<&str>) -> Result<()> {
        let payload = CloseSupportChatPayload {
            chat_id: chat_id.to_string(),
            reason: reason.map(str::to_string),
        };
        self.inner.request(events::CLOSE_SUPPORT_CHAT, chat_id, &payload)?;
        info!(chat_id, reason = reason.unwrap_or(""), "Support chat close requested");
        Ok(())
    }

    /// Leave the realtime room; clears the view if it was the active chat.
    pub fn leave_chat(&self, chat_id: &str) {
        self.inner.state.guard.connection().leave_support_chat(chat_id);
        self.inner.state.update(|view| {
            if view.is_active(chat_id) {
                view.active_chat_id = None;
                view.active_chat = None;
                view.messages.clear();
            }
        });
    }

    pub fn close(&self) {
        self.inner.state.guard.close();
    }
}

impl Inner {
    fn subscribe(inner: &Arc<Inner>) {
        let weak = Arc::downgrade(inner);
        inner.state.guard.listen(
            events::CONNECTION_STATE_CHANGED,
            listener(move |event| {
                if let (Some(inner), ChatEvent::StateChanged(state)) = (weak.upgrade(), event) {
                    inner.on_state_changed(*state);
                }
            }),
        );

        let handlers: [(&'static str, RemoteHandler); 9] = [
            (events::SUPPORT_MESSAGE, Inner::on_message),
            (events::NEW_SUPPORT_MESSAGE, Inner::on_message),
            (events::NEW_SUPPORT_CHAT, Inner::on_chat),
            (events::SUPPORT_CHAT_CREATED, Inner::on_chat),
            (events::AGENT_ACCEPTED, Inner::on_status),
            (events::SUPPORT_CHAT_CLOSED, Inner::on_status),
            (events::CHAT_STATUS_UPDATE, Inner::on_status),
            (events::NO_AGENTS_AVAILABLE, Inner::on_error),
            (events::ERROR, Inner::on_error),
        ];
        for (name, handler) in handlers {
            let weak = Arc::downgrade(inner);
            inner.state.guard.listen(
                name,
                listener(move |payload| {
                    if let (Some(inner), ChatEvent::Remote { event, data }) = (weak.upgrade(), payload)
                    {
                        handler(&inner, event, data);
                    }
                }),
            );
        }
    }

    async fn fetch_chats(&self) -> Result<()> {
        let chats = self
            .state
            .guard
            .guarded(self.api.list_support_chats(self.role))
            .await?;
        info!(count = chats.len(), role = %self.role, "Support chats loaded");
        self.state.update(|view| {
            view.chats = chats.clone();
            view.sync_active_chat();
        });
        self.cache.cache_support_chats(&chats).await;
        Ok(())
    }

    /// Emit a lifecycle request that only makes sense live. Failures are
    /// recorded on the view and returned.
    fn request<T: Serialize>(&self, event: &str, chat_id: &str, payload: &T) -> Result<()> {
        if self.state.guard.is_closed() {
            return Err(AppError::Cancelled);
        }
        let connection = self.state.guard.connection();
        let result = serde_json::to_value(payload)
            .map_err(RealtimeError::from)
            .and_then(|data| connection.try_emit(event, data));

        if let Err(e) = result {
            warn!(event, chat_id, error = %e, "Support chat request failed");
            self.state.update(|view| view.last_error = Some(e.to_string()));
            return Err(e.into());
        }
        Ok(())
    }

    /// Insert or replace a chat at the front. Returns the new list.
    fn upsert(&self, chat: SupportChat) -> Vec<SupportChat> {
        let mut chats = Vec::new();
        self.state.update(|view| {
            upsert_front(&mut view.chats, chat);
            view.sync_active_chat();
            chats = view.chats.clone();
        });
        chats
    }

    /// Apply `change` to the chat in place and stamp it. Returns the new list.
    fn apply_status(&self, chat_id: &str, change: impl Fn(&mut SupportChat)) -> Vec<SupportChat> {
        let mut chats = Vec::new();
        self.state.update(|view| {
            if let Some(chat) = view.chats.iter_mut().find(|c| c.id == chat_id) {
                change(chat);
                chat.updated_at = Utc::now();
            }
            view.sync_active_chat();
            chats = view.chats.clone();
        });
        chats
    }

    fn cache_chats_later(&self, chats: Vec<SupportChat>) {
        let cache = self.cache.clone();
        self.state.guard.spawn(async move {
            cache.cache_support_chats(&chats).await;
        });
    }

    fn on_state_changed(&self, state: ConnectionState) {
        self.state.set_connection_state(state, "support");
    }

    fn on_message(&self, event: &str, data: &Value) {
        let message: SupportMessage = match serde_json::from_value(data.clone()) {
            Ok(message) => message,
            Err(e) => {
                warn!(event, error = %e, "Ignoring malformed support message payload");
                return;
            }
        };

        let mut to_cache = None;
        let mut chats = Vec::new();
        self.state.update(|view| {
            if view.is_active(&message.chat_id) && push_unique(&mut view.messages, message.clone()) {
                to_cache = Some(confirmed(&view.messages, |m| m.pending));
            }
            bump_chat(&mut view.chats, &message.chat_id, |chat| bump_support(chat, &message));
            view.sync_active_chat();
            chats = view.chats.clone();
        });
        debug!(chat_id = %message.chat_id, message_id = %message.id, sender_type = %message.sender_type, "Support message received");

        if let Some(messages) = to_cache {
            let cache = self.cache.clone();
            let chat_id = message.chat_id.clone();
            self.state.guard.spawn(async move {
                cache.cache_support_messages(&chat_id, &messages).await;
            });
        }
        self.cache_chats_later(chats);
    }

    fn on_chat(&self, event: &str, data: &Value) {
        // Some hub versions wrap the chat as {"chat": {...}}
        let raw = data.get("chat").unwrap_or(data);
        let chat: SupportChat = match serde_json::from_value(raw.clone()) {
            Ok(chat) => chat,
            Err(e) => {
                warn!(event, error = %e, "Ignoring malformed support chat payload");
                return;
            }
        };
        info!(event, chat_id = %chat.id, status = %chat.status, "Support chat announced");
        let chats = self.upsert(chat);
        self.cache_chats_later(chats);
    }

    fn on_status(&self, event: &str, data: &Value) {
        let payload: ChatStatusPayload = match serde_json::from_value(data.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(event, error = %e, "Ignoring malformed status payload");
                return;
            }
        };

        let status = match event {
            events::AGENT_ACCEPTED => Some(SupportChatStatus::Active),
            events::SUPPORT_CHAT_CLOSED => Some(SupportChatStatus::Closed),
            _ => payload.status,
        };
        let Some(status) = status else {
            debug!(event, chat_id = %payload.chat_id, "Status update without status");
            return;
        };

        info!(event, chat_id = %payload.chat_id, status = %status, "Support chat status changed");
        let agent_id = payload.agent_id.clone();
        let chats = self.apply_status(&payload.chat_id, |chat| {
            chat.status = status;
            if let Some(agent_id) = &agent_id {
                chat.agent_id = Some(agent_id.clone());
            }
        });
        self.cache_chats_later(chats);
    }

    fn on_error(&self, event: &str, data: &Value) {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| data.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| match event {
                events::NO_AGENTS_AVAILABLE => "No agents are available right now".to_string(),
                _ => "Support chat error".to_string(),
            });
        warn!(event, message = %message, "Support hub reported a problem");
        self.state.update(|view| view.last_error = Some(message));
    }
}

#[async_trait]
impl Conversation for Inner {
    type Chat = SupportChat;
    type Message = SupportMessage;

    const KIND: &'static str = "support";
    const CHANNEL: PendingChannel = PendingChannel::Support;

    fn state(&self) -> &SessionState<SupportChat, SupportMessage> {
        &self.state
    }

    fn cache(&self) -> &ChatCache {
        &self.cache
    }

    fn is_pending(message: &SupportMessage) -> bool {
        message.pending
    }

    fn bump(chat: &mut SupportChat, message: &SupportMessage) {
        bump_support(chat, message);
    }

    fn optimistic(&self, id: &str, chat_id: &str, content: &str) -> SupportMessage {
        SupportMessage::optimistic(id, chat_id, self.user_id.as_str(), self.role, content)
    }

    fn send_frame(&self, outgoing: &Outgoing<'_>, client_id: &str) -> serde_json::Result<EventFrame> {
        let payload = SupportMessagePayload {
            chat_id: outgoing.chat_id.to_string(),
            content: outgoing.content.to_string(),
            client_message_id: Some(client_id.to_string()),
            pending_id: None,
        };
        Ok(EventFrame::new(events::NEW_SUPPORT_MESSAGE, serde_json::to_value(&payload)?))
    }

    fn join(&self, chat_id: &str) {
        self.state.guard.connection().join_support_chat(chat_id);
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<SupportMessage>> {
        self.api.list_support_messages(self.role, chat_id).await
    }

    async fn persist(&self, chat_id: &str, request: &SendMessageRequest) -> Result<SupportMessage> {
        self.api.send_support_message(self.role, chat_id, request).await
    }

    async fn cached_messages(&self, chat_id: &str) -> Vec<SupportMessage> {
        self.cache.get_cached_support_messages(chat_id).await
    }

    async fn cache_messages(&self, chat_id: &str, messages: &[SupportMessage]) {
        self.cache.cache_support_messages(chat_id, messages).await
    }

    async fn cache_chats(&self, chats: &[SupportChat]) {
        self.cache.cache_support_chats(chats).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::testing::{eventually, support_chat, support_message, Fixture};
    use serde_json::json;
    use shared::dto::chat::SenderType;

    async fn session(fixture: &Fixture, role: ClientRole) -> SupportChatSession {
        fixture.runtime(role).support_session()
    }

    #[tokio::test]
    async fn test_load_chats_uses_session_role() {
        let fixture = Fixture::new().await;
        *fixture.api.support_chats.lock() = vec![support_chat("s1", SupportChatStatus::Pending)];
        let session = session(&fixture, SenderType::Agent).await;

        session.load_chats().await.unwrap();

        assert_eq!(*fixture.api.listed_roles.lock(), vec![SenderType::Agent]);
        assert_eq!(session.view().chats.len(), 1);
        assert_eq!(fixture.cache.get_cached_support_chats().await.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_send_queues_support_message() {
        let fixture = Fixture::new().await;
        *fixture.api.support_chats.lock() = vec![support_chat("s1", SupportChatStatus::Active)];
        let session = session(&fixture, SenderType::Agent).await;
        session.load_chats().await.unwrap();
        session.set_active_chat("s1").await.unwrap();

        let stored = session.send_message("s1", "Refund issued").await.unwrap();

        let pending = fixture.cache.get_pending_messages().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].channel, PendingChannel::Support);
        let sent = fixture.api.support_sent.lock().clone();
        assert_eq!(sent[0].0, SenderType::Agent);
        assert_eq!(sent[0].2.client_message_id.as_deref(), Some(pending[0].id.as_str()));

        let view = session.view();
        assert_eq!(view.messages, vec![stored.clone()]);
        assert_eq!(view.messages[0].sender_type, SenderType::Agent);
        assert_eq!(view.chats[0].last_message.as_ref(), Some(&stored));
    }

    #[tokio::test]
    async fn test_online_send_emits_support_event() {
        let fixture = Fixture::new().await;
        fixture.connect(SenderType::User).await;
        let session = session(&fixture, SenderType::User).await;

        session.send_message("s1", "My order is late").await.unwrap();

        assert!(fixture.cache.get_pending_messages().await.is_empty());
        let connector = fixture.connector.clone();
        eventually(|| {
            let connector = connector.clone();
            async move { !connector.sent().is_empty() }
        })
        .await;
        let frame = fixture.connector.sent()[0].clone();
        assert_eq!(frame.event, events::NEW_SUPPORT_MESSAGE);
        assert_eq!(frame.data["chatId"], "s1");
    }

    #[tokio::test]
    async fn test_mark_as_resolved_updates_list_and_active_chat() {
        let fixture = Fixture::new().await;
        *fixture.api.support_chats.lock() = vec![support_chat("s1", SupportChatStatus::Active)];
        let session = session(&fixture, SenderType::Admin).await;
        session.load_chats().await.unwrap();
        session.set_active_chat("s1").await.unwrap();

        session.mark_as_resolved("s1").await.unwrap();

        assert_eq!(
            *fixture.api.resolved.lock(),
            vec![(SenderType::Admin, "s1".to_string())]
        );
        let view = session.view();
        assert_eq!(view.chats[0].status, SupportChatStatus::Resolved);
        assert_eq!(view.active_chat.unwrap().status, SupportChatStatus::Resolved);
        let cached = fixture.cache.get_cached_support_chats().await;
        assert_eq!(cached[0].status, SupportChatStatus::Resolved);
    }

    #[tokio::test]
    async fn test_close_chat_requires_connection() {
        let fixture = Fixture::new().await;
        let session = session(&fixture, SenderType::Agent).await;

        let result = session.close_chat("s1", Some("duplicate"));

        assert!(matches!(
            result,
            Err(AppError::Realtime(RealtimeError::NotConnected(_)))
        ));
        assert!(session.view().last_error.is_some());
    }

    #[tokio::test]
    async fn test_close_chat_emits_when_connected() {
        let fixture = Fixture::new().await;
        fixture.connect(SenderType::Agent).await;
        let session = session(&fixture, SenderType::Agent).await;

        session.close_chat("s1", Some("duplicate")).unwrap();

        let connector = fixture.connector.clone();
        eventually(|| {
            let connector = connector.clone();
            async move { !connector.sent().is_empty() }
        })
        .await;
        let frame = fixture.connector.sent()[0].clone();
        assert_eq!(frame.event, events::CLOSE_SUPPORT_CHAT);
        assert_eq!(frame.data, json!({"chatId": "s1", "reason": "duplicate"}));
    }

    #[tokio::test]
    async fn test_accept_chat_emits_when_connected() {
        let fixture = Fixture::new().await;
        fixture.connect(SenderType::Agent).await;
        let session = session(&fixture, SenderType::Agent).await;

        session.accept_chat("s1").unwrap();

        let connector = fixture.connector.clone();
        eventually(|| {
            let connector = connector.clone();
            async move { !connector.sent().is_empty() }
        })
        .await;
        let frame = fixture.connector.sent()[0].clone();
        assert_eq!(frame.event, events::ACCEPT_SUPPORT_CHAT);
        assert_eq!(frame.data, json!({"chatId": "s1"}));
    }

    #[tokio::test]
    async fn test_accept_chat_requires_connection() {
        let fixture = Fixture::new().await;
        let session = session(&fixture, SenderType::Agent).await;

        let result = session.accept_chat("s1");

        assert!(matches!(
            result,
            Err(AppError::Realtime(RealtimeError::NotConnected(_)))
        ));
        assert!(session.view().last_error.is_some());

        session.close();
        assert!(matches!(session.accept_chat("s1"), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_inbound_lifecycle_events() {
        let fixture = Fixture::new().await;
        *fixture.api.support_chats.lock() = vec![
            support_chat("s1", SupportChatStatus::Pending),
            support_chat("s2", SupportChatStatus::Active),
        ];
        fixture.connect(SenderType::User).await;
        let session = session(&fixture, SenderType::User).await;
        session.load_chats().await.unwrap();

        fixture
            .connector
            .push(events::AGENT_ACCEPTED, json!({"chatId": "s1", "agentId": "a7"}));
        fixture.connector.push(events::SUPPORT_CHAT_CLOSED, json!({"chatId": "s2"}));
        fixture.connector.push(
            events::NEW_SUPPORT_CHAT,
            serde_json::to_value(support_chat("s3", SupportChatStatus::Pending)).unwrap(),
        );

        eventually(|| {
            let session = session.clone();
            async move { session.view().chats.len() == 3 }
        })
        .await;
        let view = session.view();
        assert_eq!(view.chats[0].id, "s3");
        let s1 = view.chats.iter().find(|c| c.id == "s1").unwrap();
        assert_eq!(s1.status, SupportChatStatus::Active);
        assert_eq!(s1.agent_id.as_deref(), Some("a7"));
        let s2 = view.chats.iter().find(|c| c.id == "s2").unwrap();
        assert_eq!(s2.status, SupportChatStatus::Closed);
    }

    #[tokio::test]
    async fn test_inbound_message_and_hub_errors() {
        let fixture = Fixture::new().await;
        *fixture.api.support_chats.lock() = vec![
            support_chat("s1", SupportChatStatus::Active),
            support_chat("s2", SupportChatStatus::Active),
        ];
        fixture.connect(SenderType::User).await;
        let session = session(&fixture, SenderType::User).await;
        session.load_chats().await.unwrap();
        session.set_active_chat("s2").await.unwrap();

        let incoming = support_message("m1", "s2", "An agent will help you shortly");
        fixture
            .connector
            .push(events::SUPPORT_MESSAGE, serde_json::to_value(&incoming).unwrap());
        fixture
            .connector
            .push(events::NO_AGENTS_AVAILABLE, json!({"message": "All agents are busy"}));

        eventually(|| {
            let session = session.clone();
            async move { session.view().last_error.is_some() }
        })
        .await;
        let view = session.view();
        assert_eq!(view.messages, vec![incoming]);
        assert_eq!(view.chats[0].id, "s2");
        assert_eq!(view.last_error.as_deref(), Some("All agents are busy"));
    }

    #[tokio::test]
    async fn test_leave_chat_clears_active_chat() {
        let fixture = Fixture::new().await;
        *fixture.api.support_messages.lock() = vec![support_message("m1", "s1", "hello")];
        let session = session(&fixture, SenderType::User).await;
        session.set_active_chat("s1").await.unwrap();
        assert_eq!(session.view().messages.len(), 1);

        session.leave_chat("s1");

        let view = session.view();
        assert!(view.active_chat_id.is_none());
        assert!(view.messages.is_empty());
    }

    #[tokio::test]
    async fn test_create_support_chat_prepends() {
        let fixture = Fixture::new().await;
        *fixture.api.support_chats.lock() = vec![support_chat("old", SupportChatStatus::Closed)];
        let session = session(&fixture, SenderType::User).await;
        session.load_chats().await.unwrap();

        let created = session
            .create_support_chat("Payment failed", "Card was charged twice", Some("billing".into()), None)
            .await
            .unwrap();

        let view = session.view();
        assert_eq!(view.chats[0].id, created.id);
        assert_eq!(view.chats[0].category, "billing");
        assert_eq!(view.chats[0].status, SupportChatStatus::Pending);
        assert_eq!(fixture.cache.get_cached_support_chats().await.len(), 2);
    }
}
