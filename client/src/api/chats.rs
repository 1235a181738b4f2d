//! # Marketplace Chat API
//!
//! Buyer/seller conversations attached to an ad.

use super::client::ApiClient;
use crate::error::Result;
use shared::dto::api::*;
use shared::dto::chat::{Chat, Message};

pub async fn list_chats(api: &ApiClient) -> Result<Vec<Chat>> {
    let response: ChatListResponse = api.fetch(api.get("/api/chats")).await?;
    Ok(response.chats)
}

pub async fn list_messages(api: &ApiClient, chat_id: &str) -> Result<Vec<Message>> {
    let path = format!("/api/chats/{}/messages", chat_id);
    let response: MessageListResponse = api.fetch(api.get(&path)).await?;
    Ok(response.messages)
}

/// Persist a message. `clientMessageId` lets the server de-duplicate the
/// realtime copy of the same message.
pub async fn send_message(
    api: &ApiClient,
    chat_id: &str,
    request: &SendMessageRequest,
) -> Result<Message> {
    let path = format!("/api/chats/{}/messages", chat_id);
    let response: MessageResponse = api.fetch(api.post(&path).json(request)).await?;
    Ok(response.message)
}

pub async fn create_chat(api: &ApiClient, request: &CreateChatRequest) -> Result<Chat> {
    let response: ChatResponse = api.fetch(api.post("/api/chats").json(request)).await?;
    Ok(response.chat)
}
