//! # REST API
//!
//! The [`ChatApi`] trait is the seam sessions talk to; [`ApiClient`] is the
//! reqwest implementation. Support endpoints are role-parallel:
//!
//! | Role    | Base path                  |
//! |---------|----------------------------|
//! | `user`  | `/api/user/support-chats`  |
//! | `agent` | `/api/agent/chats`         |
//! | `admin` | `/api/admin/support-chats` |
//!
//! each with `/{id}/messages` and `/{id}/resolve`.

pub mod chats;
pub mod client;
pub mod support;

pub use client::ApiClient;
pub use support::support_base_path;

use crate::error::Result;
use async_trait::async_trait;
use shared::dto::api::{CreateChatRequest, CreateSupportChatRequest, SendMessageRequest};
use shared::dto::chat::{Chat, ClientRole, Message, SupportChat, SupportMessage};

/// REST operations used by the chat sessions.
///
/// Implemented by [`ApiClient`]; tests substitute their own.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_chats(&self) -> Result<Vec<Chat>>;

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>>;

    async fn send_message(&self, chat_id: &str, request: &SendMessageRequest) -> Result<Message>;

    async fn create_chat(&self, request: &CreateChatRequest) -> Result<Chat>;

    async fn list_support_chats(&self, role: ClientRole) -> Result<Vec<SupportChat>>;

    async fn list_support_messages(
        &self,
        role: ClientRole,
        chat_id: &str,
    ) -> Result<Vec<SupportMessage>>;

    async fn send_support_message(
        &self,
        role: ClientRole,
        chat_id: &str,
        request: &SendMessageRequest,
    ) -> Result<SupportMessage>;

    /// Support chats are always opened from the user side.
    async fn create_support_chat(&self, request: &CreateSupportChatRequest) -> Result<SupportChat>;

    async fn resolve_support_chat(&self, role: ClientRole, chat_id: &str) -> Result<()>;
}
