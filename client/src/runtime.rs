//! # Chat Runtime
//!
//! Composition root: opens the cache, builds the pending processor, the
//! connection manager and the REST client once, and hands out the same
//! instances to every session.

use crate::api::{ApiClient, ChatApi};
use crate::error::Result;
use crate::sessions::{ChatSession, SupportChatSession};
use lib_core::{ChatCache, Config};
use lib_realtime::{ConnectionManager, Credentials, PendingProcessor, RealtimeConfig, WsConnector};
use std::sync::Arc;
use tracing::info;

pub struct ChatRuntime {
    cache: ChatCache,
    connection: Arc<ConnectionManager>,
    api: Arc<dyn ChatApi>,
    credentials: Credentials,
}

impl ChatRuntime {
    /// Build everything from `config`. Does not connect.
    pub async fn start(config: &Config, credentials: Credentials) -> Result<Self> {
        let cache = ChatCache::open(&config.cache_url, config.cache_expiry_ms()).await?;
        let processor = Arc::new(PendingProcessor::new(
            cache.clone(),
            config.pending_max_retry_attempts,
        ));
        let connection = ConnectionManager::new(
            RealtimeConfig::from(config),
            Arc::new(WsConnector::new(config.socket_url.as_str())),
            Some(processor),
        );
        let api = Arc::new(ApiClient::new(config.api_base_url.as_str(), credentials.token.as_str()));

        info!(
            api = %config.api_base_url,
            socket = %config.socket_url,
            cache = %config.cache_url,
            "Chat runtime ready"
        );

        Ok(Self::from_parts(cache, connection, api, credentials))
    }

    pub fn from_parts(
        cache: ChatCache,
        connection: Arc<ConnectionManager>,
        api: Arc<dyn ChatApi>,
        credentials: Credentials,
    ) -> Self {
        Self {
            cache,
            connection,
            api,
            credentials,
        }
    }

    /// The one connection manager of this runtime.
    pub fn connection(&self) -> Arc<ConnectionManager> {
        self.connection.clone()
    }

    pub fn cache(&self) -> &ChatCache {
        &self.cache
    }

    pub fn api(&self) -> Arc<dyn ChatApi> {
        self.api.clone()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// (Re)connect with the runtime's credentials.
    pub async fn connect(&self) {
        self.connection.init(self.credentials.clone()).await;
    }

    pub fn chat_session(&self) -> ChatSession {
        ChatSession::new(self)
    }

    pub fn support_session(&self) -> SupportChatSession {
        SupportChatSession::new(self)
    }

    pub async fn shutdown(&self) {
        self.connection.disconnect().await;
        info!("Chat runtime stopped");
    }
}
