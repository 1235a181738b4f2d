//! # Realtime Errors

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RealtimeError>;

#[derive(Debug, Error)]
pub enum RealtimeError {
    /// An emit was attempted while the connection is not `Connected`.
    #[error("Cannot emit {0}: socket not connected")]
    NotConnected(String),

    /// The transport driver has stopped and no longer accepts frames.
    #[error("Transport channel closed")]
    ChannelClosed,

    /// The server rejected the upgrade or the URL is unusable.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Handshake timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// I/O or protocol failure on a live link.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for RealtimeError {
    fn from(err: serde_json::Error) -> Self {
        RealtimeError::Encoding(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Http(response) => {
                RealtimeError::Handshake(format!("HTTP error: {}", response.status()))
            }
            WsError::Url(e) => RealtimeError::Handshake(e.to_string()),
            WsError::HttpFormat(e) => RealtimeError::Handshake(e.to_string()),
            other => RealtimeError::Transport(other.to_string()),
        }
    }
}
