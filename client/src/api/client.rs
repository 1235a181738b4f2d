//! # API Client
//!
//! Main HTTP client for backend API communication.

use crate::api::ChatApi;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::dto::api::{CreateChatRequest, CreateSupportChatRequest, ErrorResponse, SendMessageRequest};
use shared::dto::chat::{Chat, ClientRole, Message, SupportChat, SupportMessage};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the chat REST API.
///
/// Every request carries the session's bearer token. The connection pool is
/// shared by clones.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client with a 10 second timeout.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.url(path)))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.post(self.url(path)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.token))
    }

    /// Send a request and decode a successful JSON body.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Send a request, ignoring the body of a successful response.
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<()> {
        check(request.send().await?).await?;
        Ok(())
    }
}

/// Turn a non-success status into [`AppError::Api`], preferring the server's
/// `{"error": ...}` message over the raw body.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        debug!(status = %status, url = %response.url(), "API request succeeded");
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) if !err.error.is_empty() => err.error,
        _ => body,
    };

    warn!(status = %status, url = %url, error = %message, "API request failed");
    Err(AppError::Api(format!("{}: {}", status, message)))
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn list_chats(&self) -> Result<Vec<Chat>> {
        crate::api::chats::list_chats(self).await
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        crate::api::chats::list_messages(self, chat_id).await
    }

    async fn send_message(&self, chat_id: &str, request: &SendMessageRequest) -> Result<Message> {
        crate::api::chats::send_message(self, chat_id, request).await
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> Result<Chat> {
        crate::api::chats::create_chat(self, request).await
    }

    async fn list_support_chats(&self, role: ClientRole) -> Result<Vec<SupportChat>> {
        crate::api::support::list_support_chats(self, role).await
    }

    async fn list_support_messages(
        &self,
        role: ClientRole,
        chat_id: &str,
    ) -> Result<Vec<SupportMessage>> {
        crate::api::support::list_support_messages(self, role, chat_id).await
    }

    async fn send_support_message(
        &self,
        role: ClientRole,
        chat_id: &str,
        request: &SendMessageRequest,
    ) -> Result<SupportMessage> {
        crate::api::support::send_support_message(self, role, chat_id, request).await
    }

    async fn create_support_chat(&self, request: &CreateSupportChatRequest) -> Result<SupportChat> {
        crate::api::support::create_support_chat(self, request).await
    }

    async fn resolve_support_chat(&self, role: ClientRole, chat_id: &str) -> Result<()> {
        crate::api::support::resolve_support_chat(self, role, chat_id).await
    }
}
