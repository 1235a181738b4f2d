//! # Agrimarket Chat Client - Library Root
//!
//! Realtime chat for the marketplace: buyer/seller conversations and
//! support chats, kept usable while the connection comes and goes.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              chat-client (this crate)                  │
//! │  sessions  - ChatSession / SupportChatSession          │
//! │  runtime   - one cache, one connection, one API client │
//! │  api       - REST endpoints (reqwest)                  │
//! ├────────────────────────────────────────────────────────┤
//! │  lib-realtime - connection manager, pending processor  │
//! │  lib-core     - config, SQLite chat cache, outbox      │
//! └────────────────────────────────────────────────────────┘
//!          │ HTTP                         │ WebSocket
//!          ▼                              ▼
//! ┌─────────────────┐          ┌─────────────────────────┐
//! │  Marketplace    │          │   Realtime hub          │
//! │  REST API       │          │                         │
//! └─────────────────┘          └─────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chat_client::ChatRuntime;
//! use lib_realtime::Credentials;
//! use shared::dto::chat::SenderType;
//!
//! # async fn example() -> chat_client::Result<()> {
//! let config = lib_core::config::Config::default();
//! let runtime = ChatRuntime::start(&config, Credentials::new("token", SenderType::User, "u1")).await?;
//! runtime.connect().await;
//!
//! let chats = runtime.chat_session();
//! chats.load_chats().await?;
//! chats.set_active_chat("c1").await?;
//! chats.send_message("c1", "Are the tomatoes still available?", "seller-7").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod sessions;

pub use api::{ApiClient, ChatApi};
pub use error::{AppError, Result};
pub use runtime::ChatRuntime;
pub use sessions::{ChatSession, SessionView, SupportChatSession};
