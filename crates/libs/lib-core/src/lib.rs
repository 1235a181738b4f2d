//! # Core Library
//!
//! Configuration, error type and the durable chat cache shared by the
//! realtime layer and the client.

pub mod config;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use model::store::{ChatCache, DbPool, PendingChannel, PendingMessage, create_pool};
