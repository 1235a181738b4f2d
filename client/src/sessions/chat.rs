//! # Marketplace Chat Session
//!
//! Buyer/seller conversations. Inbound `message_received` events are folded
//! into the view: appended when they belong to the active chat, and the
//! owning chat is moved to the top of the list either way.

use super::{
    bump_chat, bump_regular, confirmed, deliver, open_chat, push_unique, upsert_front, ChatView,
    Conversation, Outgoing, SessionState,
};
use crate::api::ChatApi;
use crate::error::{AppError, Result};
use crate::runtime::ChatRuntime;
use async_trait::async_trait;
use lib_core::{ChatCache, PendingChannel};
use lib_realtime::{listener, ChatEvent, ConnectionState};
use serde_json::Value;
use shared::dto::api::{CreateChatRequest, SendMessageRequest};
use shared::dto::chat::{Chat, Message};
use shared::dto::realtime::{events, EventFrame, NewMessagePayload};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

struct Inner {
    user_id: String,
    api: Arc<dyn ChatApi>,
    cache: ChatCache,
    state: SessionState<Chat, Message>,
}

impl ChatSession {
    pub fn new(runtime: &ChatRuntime) -> Self {
        let inner = Arc::new(Inner {
            user_id: runtime.credentials().user_id.clone(),
            api: runtime.api(),
            cache: runtime.cache().clone(),
            state: SessionState::new(runtime.connection()),
        });
        Inner::subscribe(&inner);

        Self { inner }
    }

    pub fn view(&self) -> ChatView {
        self.inner.state.snapshot()
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.guard.is_closed()
    }

    /// Show cached chats, then replace them with the server's list.
    pub async fn load_chats(&self) -> Result<()> {
        let inner = &self.inner;
        inner.state.begin_loading();

        let cached = inner.cache.get_cached_chats().await;
        if !cached.is_empty() {
            debug!(count = cached.len(), "Showing cached chats");
            inner.state.update(|view| {
                view.chats = cached;
                view.sync_active_chat();
                view.is_loading = false;
            });
        }

        let result = inner.fetch_chats().await;
        inner.state.settle(result, "Failed to load chats")
    }

    pub async fn refresh_chats(&self) -> Result<()> {
        self.inner.state.begin_loading();
        let result = self.inner.fetch_chats().await;
        self.inner.state.settle(result, "Failed to refresh chats")
    }

    /// Make `chat_id` the active chat: cached messages first, then the
    /// server's, then join its realtime room.
    pub async fn set_active_chat(&self, chat_id: &str) -> Result<()> {
        open_chat(self.inner.as_ref(), chat_id).await
    }

    /// Send a message: optimistic append, realtime emit (or outbox when
    /// offline), REST persist, in-place swap for the server copy.
    pub async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        recipient_id: &str,
    ) -> Result<Message> {
        lib_utils::validate_not_empty(content, "Message").map_err(AppError::Validation)?;

        let outgoing = Outgoing {
            chat_id,
            content,
            recipient_id: Some(recipient_id),
        };
        let inner = self.inner.as_ref();
        inner.state.sending(chat_id, deliver(inner, outgoing)).await
    }

    pub async fn create_chat(
        &self,
        ad_id: &str,
        recipient_id: &str,
        initial_message: &str,
    ) -> Result<Chat> {
        lib_utils::validate_not_empty(ad_id, "Ad id").map_err(AppError::Validation)?;
        lib_utils::validate_not_empty(recipient_id, "Recipient").map_err(AppError::Validation)?;
        lib_utils::validate_not_empty(initial_message, "Message").map_err(AppError::Validation)?;

        let inner = &self.inner;
        inner.state.begin_loading();

        let request = CreateChatRequest {
            ad_id: ad_id.to_string(),
            recipient_id: recipient_id.to_string(),
            message: initial_message.to_string(),
        };
        let result = async {
            let chat = inner.state.guard.guarded(inner.api.create_chat(&request)).await?;
            let mut chats = Vec::new();
            inner.state.update(|view| {
                upsert_front(&mut view.chats, chat.clone());
                chats = view.chats.clone();
            });
            inner.cache.cache_chats(&chats).await;
            info!(chat_id = %chat.id, ad_id, "Chat created");
            Ok::<Chat, AppError>(chat)
        }
        .await;

        inner.state.settle(result, "Failed to create chat")
    }

    /// Stop listening and discard every in-flight result.
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

        let weak = Arc::downgrade(inner);
        inner.state.guard.listen(
            events::MESSAGE_RECEIVED,
            listener(move |event| {
                if let (Some(inner), ChatEvent::Remote { data, .. }) = (weak.upgrade(), event) {
                    inner.on_message_received(data);
                }
            }),
        );
    }

    async fn fetch_chats(&self) -> Result<()> {
        let chats = self.state.guard.guarded(self.api.list_chats()).await?;
        info!(count = chats.len(), "Chats loaded");
        self.state.update(|view| {
            view.chats = chats.clone();
            view.sync_active_chat();
        });
        self.cache.cache_chats(&chats).await;
        Ok(())
    }

    fn on_state_changed(&self, state: ConnectionState) {
        self.state.set_connection_state(state, "chat");
    }

    fn on_message_received(&self, data: &Value) {
        let message: Message = match serde_json::from_value(data.clone()) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed message_received payload");
                return;
            }
        };

        let mut to_cache = None;
        self.state.update(|view| {
            if view.is_active(&message.chat_id) && push_unique(&mut view.messages, message.clone()) {
                to_cache = Some(confirmed(&view.messages, |m| m.pending));
            }
            bump_chat(&mut view.chats, &message.chat_id, |chat| bump_regular(chat, &message));
            view.sync_active_chat();
        });
        debug!(chat_id = %message.chat_id, message_id = %message.id, "Message received");

        if let Some(messages) = to_cache {
            let cache = self.cache.clone();
            let chat_id = message.chat_id;
            self.state.guard.spawn(async move {
                cache.cache_messages(&chat_id, &messages).await;
            });
        }
    }
}

#[async_trait]
impl Conversation for Inner {
    type Chat = Chat;
    type Message = Message;

    const KIND: &'static str = "chat";
    const CHANNEL: PendingChannel = PendingChannel::Regular;

    fn state(&self) -> &SessionState<Chat, Message> {
        &self.state
    }

    fn cache(&self) -> &ChatCache {
        &self.cache
    }

    fn is_pending(message: &Message) -> bool {
        message.pending
    }

    fn bump(chat: &mut Chat, message: &Message) {
        bump_regular(chat, message);
    }

    fn optimistic(&self, id: &str, chat_id: &str, content: &str) -> Message {
        Message::optimistic(id, chat_id, self.user_id.as_str(), content)
    }

    fn send_frame(&self, outgoing: &Outgoing<'_>, client_id: &str) -> serde_json::Result<EventFrame> {
        let payload = NewMessagePayload {
            chat_id: outgoing.chat_id.to_string(),
            content: outgoing.content.to_string(),
            recipient_id: outgoing.recipient_id.map(str::to_string),
            client_message_id: Some(client_id.to_string()),
            pending_id: None,
        };
        Ok(EventFrame::new(events::NEW_MESSAGE, serde_json::to_value(&payload)?))
    }

    fn join(&self, chat_id: &str) {
        self.state.guard.connection().join_chat(chat_id);
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.api.list_messages(chat_id).await
    }

    async fn persist(&self, chat_id: &str, request: &SendMessageRequest) -> Result<Message> {
        self.api.send_message(chat_id, request).await
    }

    async fn cached_messages(&self, chat_id: &str) -> Vec<Message> {
        self.cache.get_cached_messages(chat_id).await
    }

    async fn cache_messages(&self, chat_id: &str, messages: &[Message]) {
        self.cache.cache_messages(chat_id, messages).await
    }

    async fn cache_chats(&self, chats: &[Chat]) {
        self.cache.cache_chats(chats).await
    }
}
