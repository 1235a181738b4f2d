//! # Data Transfer Objects (DTOs)
//!
//! All data structures exchanged between the chat client and the backend,
//! over REST and over the realtime socket.
//!
//! ## Module Organization
//!
//! - [`chat`] - Chat entities (messages, chats, support chats)
//! - [`api`] - REST request and response bodies
//! - [`realtime`] - Realtime event names, the frame envelope, event payloads
//!
//! ## Example JSON Communication
//!
//! ```text
//! POST /api/chats/c1/messages
//! Content-Type: application/json
//!
//! {
//!   "content": "Is the maize still available?",
//!   "clientMessageId": "temp-4a1f..."
//! }
//! ```
//!
//! ```text
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//!
//! {
//!   "message": {
//!     "id": "m_812",
//!     "chatId": "c1",
//!     "content": "Is the maize still available?",
//!     "senderId": "u1",
//!     "read": false,
//!     "createdAt": "2025-03-01T10:00:00Z",
//!     "updatedAt": "2025-03-01T10:00:00Z"
//!   }
//! }
//! ```

pub mod api;
pub mod chat;
pub mod realtime;

pub use api::*;
pub use chat::*;
pub use realtime::*;
