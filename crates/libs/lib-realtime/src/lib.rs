//! # Realtime Library
//!
//! Socket connection management and offline delivery for the chat client.
//!
//! ## Structure
//!
//! - [`transport`] - Transport seam ([`Connector`]/[`Link`]) and the driver task
//!   that owns one live link, with its own reconnect budget
//! - [`ws`] - WebSocket implementation of the seam (tokio-tungstenite)
//! - [`events`] - Listener registry keyed by event name
//! - [`manager`] - [`ConnectionManager`]: state machine, manager-level
//!   reconnects, emit helpers, periodic pending sweep
//! - [`pending`] - [`PendingProcessor`]: drains the offline outbox
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lib_core::model::store::{ChatCache, CACHE_EXPIRY_MS};
//! use lib_realtime::{ConnectionManager, Credentials, PendingProcessor, RealtimeConfig, WsConnector};
//! use shared::dto::chat::SenderType;
//!
//! # async fn example() -> lib_core::Result<()> {
//! let config = RealtimeConfig::default();
//! let cache = ChatCache::open_in_memory(CACHE_EXPIRY_MS).await?;
//! let processor = Arc::new(PendingProcessor::new(cache, config.max_retry_attempts));
//! let connector = Arc::new(WsConnector::new(config.socket_url.clone()));
//!
//! let manager = ConnectionManager::new(config, connector, Some(processor));
//! manager
//!     .init(Credentials::new("token", SenderType::User, "u1"))
//!     .await;
//! manager.join_chat("c1");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod pending;
pub mod transport;
pub mod ws;

// Re-export commonly used types
pub use config::{RealtimeConfig, ReconnectPolicy};
pub use error::{RealtimeError, Result};
pub use events::{listener, ChatEvent, Listener, ListenerRegistry};
pub use manager::{ConnectionManager, ConnectionState};
pub use pending::{Emitter, PendingProcessor, SweepReport};
pub use transport::{Connector, Credentials, DisconnectReason, Link, LinkEvent, TransportEvent};
pub use ws::WsConnector;
