//! # Centralized Error Handling
//!
//! This module defines the error type [`AppError`] used by the core library.
//! It follows the `thiserror` pattern for ergonomic error handling.
//!
//! ## Error Categories
//!
//! 1. **Caller Errors** - bad arguments
//!    - [`InvalidInput`](AppError::InvalidInput)
//!    - [`NotFound`](AppError::NotFound)
//!
//! 2. **System Errors** - configuration, storage, unexpected failures
//!    - [`Config`](AppError::Config)
//!    - [`Storage`](AppError::Storage)
//!    - [`Decoding`](AppError::Decoding)
//!    - [`Internal`](AppError::Internal)
//!
//! Cache reads and writes log and swallow their own errors; only the
//! operations that a caller must react to (queueing a pending message,
//! clearing the cache) return them.
//!
//! ## Usage Example
//!
//! ```rust
//! use lib_core::error::{AppError, Result};
//!
//! fn parse_chat_id(id: &str) -> Result<&str> {
//!     if id.trim().is_empty() {
//!         return Err(AppError::InvalidInput("chat id cannot be empty".to_string()));
//!     }
//!     Ok(id)
//! }
//! ```
//!
//! ## Error Conversion
//!
//! - `From<sqlx::Error>` - Convert database errors to AppError
//! - `From<serde_json::Error>` - Convert JSON errors to AppError

use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Core error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error during startup or environment loading.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local database failure (open, query, commit).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cached payload could not be decoded.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Invalid input validation error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (unexpected failures).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Requested record not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Convert `sqlx::Error` to `AppError`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Database record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                AppError::Storage(format!("Database error: {}", db_err.message()))
            }
            _ => AppError::Storage(format!("Database error: {}", err)),
        }
    }
}

/// Convert `serde_json::Error` to `AppError`.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decoding(format!("JSON error: {}", err))
    }
}
