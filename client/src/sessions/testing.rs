//! In-memory doubles for session tests.

use crate::api::ChatApi;
use crate::error::{AppError, Result};
use crate::runtime::ChatRuntime;
use async_trait::async_trait;
use chrono::Utc;
use lib_core::model::store::CACHE_EXPIRY_MS;
use lib_core::ChatCache;
use lib_realtime::{
    ConnectionManager, ConnectionState, Connector, Credentials, Link, LinkEvent, RealtimeConfig,
    RealtimeError,
};
use parking_lot::Mutex;
use serde_json::Value;
use shared::dto::api::{CreateChatRequest, CreateSupportChatRequest, SendMessageRequest};
use shared::dto::chat::{
    Chat, ClientRole, Message, SenderType, SupportChat, SupportChatStatus, SupportMessage,
};
use shared::dto::realtime::EventFrame;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

// region: --- Data

pub fn chat(id: &str) -> Chat {
    Chat {
        id: id.to_string(),
        ad_id: Some(format!("ad-{}", id)),
        participant_ids: vec!["u1".into(), "u2".into()],
        status: None,
        last_message: None,
        unread_count: 0,
        created_at: None,
        updated_at: Utc::now(),
    }
}

pub fn support_chat(id: &str, status: SupportChatStatus) -> SupportChat {
    SupportChat {
        id: id.to_string(),
        user_id: "u1".into(),
        agent_id: None,
        subject: Some("Order not delivered".into()),
        status,
        category: "general".into(),
        priority: 1,
        last_message: None,
        created_at: None,
        updated_at: Utc::now(),
    }
}

pub fn message(id: &str, chat_id: &str, content: &str) -> Message {
    let mut message = Message::optimistic(id, chat_id, "u2", content);
    message.sender = None;
    message.pending = false;
    message
}

pub fn support_message(id: &str, chat_id: &str, content: &str) -> SupportMessage {
    let mut message = SupportMessage::optimistic(id, chat_id, "a1", SenderType::Agent, content);
    message.pending = false;
    message
}

// endregion: --- Data

// region: --- Api

#[derive(Default)]
pub struct MockApi {
    pub chats: Mutex<Vec<Chat>>,
    pub messages: Mutex<Vec<Message>>,
    pub support_chats: Mutex<Vec<SupportChat>>,
    pub support_messages: Mutex<Vec<SupportMessage>>,
    pub sent: Mutex<Vec<(String, SendMessageRequest)>>,
    pub support_sent: Mutex<Vec<(ClientRole, String, SendMessageRequest)>>,
    pub resolved: Mutex<Vec<(ClientRole, String)>>,
    pub listed_roles: Mutex<Vec<ClientRole>>,
    pub fail: AtomicBool,
    /// When set, every call waits for `release` first.
    pub hold: AtomicBool,
    pub release: Notify,
    counter: AtomicUsize,
}

impl MockApi {
    pub fn failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    async fn call(&self) -> Result<()> {
        if self.hold.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Api("500 Internal Server Error: boom".into()));
        }
        Ok(())
    }

    fn next_id(&self) -> String {
        format!("srv-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.call().await?;
        Ok(self.chats.lock().clone())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.call().await?;
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn send_message(&self, chat_id: &str, request: &SendMessageRequest) -> Result<Message> {
        self.call().await?;
        self.sent.lock().push((chat_id.to_string(), request.clone()));
        let mut stored = message(&self.next_id(), chat_id, &request.content);
        stored.sender_id = "u1".into();
        Ok(stored)
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> Result<Chat> {
        self.call().await?;
        let mut created = chat(&self.next_id());
        created.ad_id = Some(request.ad_id.clone());
        Ok(created)
    }

    async fn list_support_chats(&self, role: ClientRole) -> Result<Vec<SupportChat>> {
        self.call().await?;
        self.listed_roles.lock().push(role);
        Ok(self.support_chats.lock().clone())
    }

    async fn list_support_messages(
        &self,
        _role: ClientRole,
        chat_id: &str,
    ) -> Result<Vec<SupportMessage>> {
        self.call().await?;
        Ok(self
            .support_messages
            .lock()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn send_support_message(
        &self,
        role: ClientRole,
        chat_id: &str,
        request: &SendMessageRequest,
    ) -> Result<SupportMessage> {
        self.call().await?;
        self.support_sent
            .lock()
            .push((role, chat_id.to_string(), request.clone()));
        let mut stored = support_message(&self.next_id(), chat_id, &request.content);
        stored.sender_id = "u1".into();
        stored.sender_type = role;
        Ok(stored)
    }

    async fn create_support_chat(&self, request: &CreateSupportChatRequest) -> Result<SupportChat> {
        self.call().await?;
        let mut created = support_chat(&self.next_id(), SupportChatStatus::Pending);
        created.subject = Some(request.subject.clone());
        if let Some(category) = &request.category {
            created.category = category.clone();
        }
        Ok(created)
    }

    async fn resolve_support_chat(&self, role: ClientRole, chat_id: &str) -> Result<()> {
        self.call().await?;
        self.resolved.lock().push((role, chat_id.to_string()));
        Ok(())
    }
}

// endregion: --- Api

// region: --- Transport

/// Accepts every handshake; the test drives the latest link.
#[derive(Default)]
pub struct TestConnector {
    sent: Arc<Mutex<Vec<EventFrame>>>,
    inbound: Mutex<Option<mpsc::UnboundedSender<LinkEvent>>>,
}

impl TestConnector {
    pub fn push(&self, event: &str, data: Value) {
        if let Some(tx) = self.inbound.lock().as_ref() {
            let _ = tx.send(LinkEvent::Frame(EventFrame::new(event, data)));
        }
    }

    pub fn sent(&self) -> Vec<EventFrame> {
        self.sent.lock().clone()
    }

    pub fn sent_events(&self) -> Vec<String> {
        self.sent.lock().iter().map(|f| f.event.clone()).collect()
    }
}

struct TestLink {
    inbound: mpsc::UnboundedReceiver<LinkEvent>,
    sent: Arc<Mutex<Vec<EventFrame>>>,
}

#[async_trait]
impl Link for TestLink {
    async fn send(&mut self, frame: EventFrame) -> std::result::Result<(), RealtimeError> {
        self.sent.lock().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> LinkEvent {
        self.inbound.recv().await.unwrap_or(LinkEvent::Lost(None))
    }

    async fn close(&mut self) {}
}

#[async_trait]
impl Connector for TestConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> std::result::Result<Box<dyn Link>, RealtimeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inbound.lock() = Some(tx);
        Ok(Box::new(TestLink {
            inbound: rx,
            sent: self.sent.clone(),
        }))
    }
}

// endregion: --- Transport

// region: --- Fixture

pub struct Fixture {
    pub api: Arc<MockApi>,
    pub cache: ChatCache,
    pub connector: Arc<TestConnector>,
    pub connection: Arc<ConnectionManager>,
}

impl Fixture {
    pub async fn new() -> Self {
        let cache = ChatCache::open_in_memory(CACHE_EXPIRY_MS).await.unwrap();
        let connector = Arc::new(TestConnector::default());
        let connection =
            ConnectionManager::new(RealtimeConfig::default(), connector.clone(), None);

        Self {
            api: Arc::new(MockApi::default()),
            cache,
            connector,
            connection,
        }
    }

    pub fn runtime(&self, role: ClientRole) -> ChatRuntime {
        ChatRuntime::from_parts(
            self.cache.clone(),
            self.connection.clone(),
            self.api.clone(),
            Credentials::new("token", role, "u1"),
        )
    }

    pub async fn connect(&self, role: ClientRole) {
        self.connection
            .init(Credentials::new("token", role, "u1"))
            .await;
        self.wait_for(ConnectionState::Connected).await;
    }

    pub async fn wait_for(&self, want: ConnectionState) {
        let mut rx = self.connection.watch_state();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {}", want))
            .unwrap();
    }
}

/// Poll until `check` holds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

// endregion: --- Fixture
