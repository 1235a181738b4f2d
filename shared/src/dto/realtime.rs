//! # Realtime DTOs
//!
//! Every realtime message is a JSON text frame with an event name and an
//! arbitrary JSON payload:
//!
//! ```text
//! {"event": "message_received", "data": {"id": "m1", "chatId": "c1", ...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names understood by the socket hub.
pub mod events {
    // Synthetic, raised locally by the connection manager
    pub const CONNECTION_STATE_CHANGED: &str = "connectionStateChanged";
    pub const PENDING_MESSAGE_DROPPED: &str = "pendingMessageDropped";

    // Transport lifecycle
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const CONNECT_ERROR: &str = "connect_error";
    pub const RECONNECT_ATTEMPT: &str = "reconnect_attempt";
    pub const RECONNECT: &str = "reconnect";
    pub const RECONNECT_ERROR: &str = "reconnect_error";
    pub const RECONNECT_FAILED: &str = "reconnect_failed";

    // Outbound
    pub const JOIN_CHAT: &str = "join_chat";
    pub const LEAVE_CHAT: &str = "leave_chat";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const TYPING_STARTED: &str = "typing_started";
    pub const TYPING_STOPPED: &str = "typing_stopped";
    pub const JOIN_SUPPORT_CHAT: &str = "join_support_chat";
    pub const LEAVE_SUPPORT_CHAT: &str = "leave_support_chat";
    pub const NEW_SUPPORT_MESSAGE: &str = "new_support_message";
    pub const CLOSE_SUPPORT_CHAT: &str = "close_support_chat";
    pub const ACCEPT_SUPPORT_CHAT: &str = "accept_support_chat";

    // Inbound
    pub const MESSAGE_RECEIVED: &str = "message_received";
    pub const SUPPORT_MESSAGE: &str = "support_message";
    pub const NEW_SUPPORT_CHAT: &str = "new_support_chat";
    pub const SUPPORT_CHAT_CREATED: &str = "support_chat_created";
    pub const AGENT_ACCEPTED: &str = "agent_accepted";
    pub const SUPPORT_CHAT_CLOSED: &str = "support_chat_closed";
    pub const CHAT_STATUS_UPDATE: &str = "chat_status_update";
    pub const NO_AGENTS_AVAILABLE: &str = "no_agents_available";
    pub const ERROR: &str = "error";
}

/// Envelope of every frame on the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Payload of `new_message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub chat_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    /// Set when the message is replayed from the offline outbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_id: Option<String>,
}

/// Payload of `new_support_message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportMessagePayload {
    pub chat_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_id: Option<String>,
}

/// Payload of `typing_started` / `typing_stopped`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub chat_id: String,
}

/// Payload of `close_support_chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloseSupportChatPayload {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload of `accept_support_chat`, sent by an agent taking a waiting chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcceptSupportChatPayload {
    pub chat_id: String,
}

/// Payload of `agent_accepted`, `support_chat_closed` and `chat_status_update`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatStatusPayload {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<super::chat::SupportChatStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
