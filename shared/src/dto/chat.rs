//! # Chat Data Transfer Objects
//!
//! Messages and chats for both the buyer/seller chat and the customer-support
//! chat. The two variants are kept as distinct types so that they can never be
//! stored in, or read from, the other variant's cache partition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_category() -> String {
    "general".to_string()
}

fn default_priority() -> i32 {
    1
}

/// Who authored a support message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Agent,
    Admin,
}

impl std::fmt::Display for SenderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SenderType::User => write!(f, "user"),
            SenderType::Agent => write!(f, "agent"),
            SenderType::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for SenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(SenderType::User),
            "agent" => Ok(SenderType::Agent),
            "admin" => Ok(SenderType::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Role a client authenticates as on the realtime socket and the REST API.
pub type ClientRole = SenderType;

/// Lifecycle of a support chat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SupportChatStatus {
    /// Waiting for an agent to accept
    Pending,
    /// An agent accepted the chat
    Active,
    /// Closed by either side
    Closed,
    /// Marked as resolved
    Resolved,
}

impl std::fmt::Display for SupportChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupportChatStatus::Pending => write!(f, "pending"),
            SupportChatStatus::Active => write!(f, "active"),
            SupportChatStatus::Closed => write!(f, "closed"),
            SupportChatStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Public profile of a message author, as embedded by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A message in a buyer/seller chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub content: String,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Participant>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while the message only exists locally and awaits the server copy.
    #[serde(default, skip_serializing_if = "is_false")]
    pub pending: bool,
}

impl Message {
    /// Build the local copy shown before the server confirms the message.
    pub fn optimistic(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let sender_id = sender_id.into();
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            sender: Some(Participant {
                id: sender_id.clone(),
                name: Some("You".to_string()),
                image: None,
            }),
            sender_id,
            read: false,
            created_at: now,
            updated_at: now,
            pending: true,
        }
    }
}

/// A message in a customer-support chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportMessage {
    pub id: String,
    pub chat_id: String,
    pub content: String,
    #[serde(alias = "sender")]
    pub sender_id: String,
    pub sender_type: SenderType,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pending: bool,
}

impl SupportMessage {
    pub fn optimistic(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        sender_type: SenderType,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            sender_id: sender_id.into(),
            sender_type,
            read: false,
            created_at: now,
            updated_at: now,
            pending: true,
        }
    }
}

/// A buyer/seller conversation, usually attached to a marketplace ad.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
    #[serde(default)]
    pub participant_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// A customer-support conversation between a user and an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportChat {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub status: SupportChatStatus,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<SupportMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_message_accepts_sender_alias() {
        let json = r#"{
            "id": "s1",
            "chatId": "sc1",
            "content": "My order never arrived",
            "sender": "u7",
            "senderType": "user",
            "createdAt": "2025-03-01T10:00:00Z",
            "updatedAt": "2025-03-01T10:00:00Z"
        }"#;

        let message: SupportMessage = serde_json::from_str(json).unwrap();

        assert_eq!(message.sender_id, "u7");
        assert_eq!(message.sender_type, SenderType::User);
        assert!(!message.read);
        assert!(!message.pending);
    }

    #[test]
    fn test_pending_flag_not_serialized_when_false() {
        let mut message = Message::optimistic("temp-1", "c1", "u1", "hello");
        message.pending = false;

        let json = serde_json::to_value(&message).unwrap();

        assert!(json.get("pending").is_none());
        assert_eq!(json["senderId"], "u1");
    }

    #[test]
    fn test_support_chat_defaults() {
        let json = r#"{
            "id": "sc1",
            "userId": "u7",
            "status": "pending",
            "updatedAt": "2025-03-01T10:00:00Z"
        }"#;

        let chat: SupportChat = serde_json::from_str(json).unwrap();

        assert_eq!(chat.category, "general");
        assert_eq!(chat.priority, 1);
        assert_eq!(chat.status, SupportChatStatus::Pending);
        assert!(chat.agent_id.is_none());
    }

    #[test]
    fn test_sender_type_round_trips_through_str() {
        for role in [SenderType::User, SenderType::Agent, SenderType::Admin] {
            assert_eq!(role.to_string().parse::<SenderType>().unwrap(), role);
        }
        assert!("courier".parse::<SenderType>().is_err());
    }
}
