//! # Common Error Types
//!
//! Consolidated error handling for the chat client.
//!
//! Errors are categorized by their source:
//!
//! - **Api**: REST communication errors (network, HTTP status, JSON parsing)
//! - **Storage**: local cache and outbox failures
//! - **Realtime**: socket failures surfaced to a caller
//! - **Validation**: rejected input (blank message, unknown role)
//! - **Cancelled**: the session was closed while the call was in flight
//!
//! ## Usage Pattern
//!
//! ```rust
//! use chat_client::error::AppError;
//!
//! fn validate_content(content: &str) -> Result<&str, AppError> {
//!     if content.trim().is_empty() {
//!         return Err(AppError::Validation("Message cannot be empty".to_string()));
//!     }
//!     Ok(content)
//! }
//! ```
//!
//! ## Error Conversion
//!
//! - `lib_core::AppError` → `AppError::Storage`
//! - `lib_realtime::RealtimeError` → `AppError::Realtime`
//! - `reqwest::Error` → `AppError::Api`

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API communication error.
    ///
    /// Network failures, non-success status codes and malformed bodies.
    #[error("API error: {0}")]
    Api(String),

    #[error("Storage error: {0}")]
    Storage(#[from] lib_core::AppError),

    #[error("Realtime error: {0}")]
    Realtime(#[from] lib_realtime::RealtimeError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The owning session was closed; the result was discarded.
    #[error("Session closed")]
    Cancelled,
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Api(format!("Request timed out: {}", err))
        } else if err.is_decode() {
            AppError::Api(format!("Failed to parse response: {}", err))
        } else {
            AppError::Api(format!("Network error: {}", err))
        }
    }
}
