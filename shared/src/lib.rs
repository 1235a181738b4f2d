//! # Shared Data Transfer Objects Library
//!
//! This library defines the contract between the chat client and the marketplace
//! backend: the REST payloads, the realtime event envelope, and the chat entities
//! that both sides exchange.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects
//!   - **[`dto::chat`]**: Messages, chats, support chats and their enums
//!   - **[`dto::api`]**: REST request/response bodies
//!   - **[`dto::realtime`]**: Realtime event names, frame envelope and payloads
//! - **[`utils`]**: Shared utility functions
//!   - **[`utils::preview`]**: Shorten message content for chat lists
//!   - **[`utils::short_id`]**: Compact ids for logs and lists
//!
//! ## Wire Format
//!
//! The marketplace backend speaks camelCase JSON, so every DTO here carries
//! `#[serde(rename_all = "camelCase")]`:
//! - Optional fields are omitted from JSON when `None`
//! - Timestamps are RFC3339 strings (`chrono` with the `serde` feature)
//! - Enums serialize to lowercase strings
//!
//! ## Usage
//!
//! ```rust
//! use shared::dto::chat::Message;
//!
//! let message = Message::optimistic("temp-1", "c1", "u1", "Is the maize still available?");
//! assert!(message.pending);
//! let json = serde_json::to_string(&message).unwrap();
//! assert!(json.contains("\"chatId\":\"c1\""));
//! ```

pub mod dto;
pub mod utils;

pub use dto::*;
pub use utils::*;
