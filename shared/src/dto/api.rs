//! # REST API DTOs
//!
//! Request and response bodies for the chat endpoints. Lists default to empty
//! when the backend omits the field.

use serde::{Deserialize, Serialize};

use super::chat::{Chat, Message, SupportChat, SupportMessage};

/// `GET /api/chats`, `POST /api/chats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatListResponse {
    #[serde(default)]
    pub chats: Vec<Chat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub chat: Chat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageListResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportChatListResponse {
    #[serde(default)]
    pub chats: Vec<SupportChat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportChatResponse {
    pub chat: SupportChat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportMessageListResponse {
    #[serde(default)]
    pub messages: Vec<SupportMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessageResponse {
    pub message: SupportMessage,
}

/// Body of a message POST. `client_message_id` lets the server drop the
/// duplicate that also arrives over the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub ad_id: String,
    pub recipient_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupportChatRequest {
    pub subject: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_list_field_is_empty() {
        let response: ChatListResponse = serde_json::from_str("{}").unwrap();
        assert!(response.chats.is_empty());
    }

    #[test]
    fn test_send_request_uses_camel_case() {
        let request = SendMessageRequest {
            content: "hello".into(),
            client_message_id: Some("temp-1".into()),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"content":"hello","clientMessageId":"temp-1"}"#);
    }
}
