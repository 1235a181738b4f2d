//! # Support Chat API
//!
//! Same operations for every role, under a role-specific base path.

use super::client::ApiClient;
use crate::error::Result;
use shared::dto::api::*;
use shared::dto::chat::{ClientRole, SenderType, SupportChat, SupportMessage};

/// Base path of the support endpoints for `role`.
pub fn support_base_path(role: ClientRole) -> &'static str {
    match role {
        SenderType::User => "/api/user/support-chats",
        SenderType::Agent => "/api/agent/chats",
        SenderType::Admin => "/api/admin/support-chats",
    }
}

fn chat_path(role: ClientRole, chat_id: &str, action: &str) -> String {
    format!("{}/{}/{}", support_base_path(role), chat_id, action)
}

pub async fn list_support_chats(api: &ApiClient, role: ClientRole) -> Result<Vec<SupportChat>> {
    let response: SupportChatListResponse = api.fetch(api.get(support_base_path(role))).await?;
    Ok(response.chats)
}

pub async fn list_support_messages(
    api: &ApiClient,
    role: ClientRole,
    chat_id: &str,
) -> Result<Vec<SupportMessage>> {
    let path = chat_path(role, chat_id, "messages");
    let response: SupportMessageListResponse = api.fetch(api.get(&path)).await?;
    Ok(response.messages)
}

pub async fn send_support_message(
    api: &ApiClient,
    role: ClientRole,
    chat_id: &str,
    request: &SendMessageRequest,
) -> Result<SupportMessage> {
    let path = chat_path(role, chat_id, "messages");
    let response: SupportMessageResponse = api.fetch(api.post(&path).json(request)).await?;
    Ok(response.message)
}

pub async fn create_support_chat(
    api: &ApiClient,
    request: &CreateSupportChatRequest,
) -> Result<SupportChat> {
    let path = support_base_path(SenderType::User);
    let response: SupportChatResponse = api.fetch(api.post(path).json(request)).await?;
    Ok(response.chat)
}

pub async fn resolve_support_chat(api: &ApiClient, role: ClientRole, chat_id: &str) -> Result<()> {
    let path = chat_path(role, chat_id, "resolve");
    api.execute(api.post(&path)).await
}
