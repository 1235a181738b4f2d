use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which chat variant a pending message belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PendingChannel {
    Regular,
    Support,
}

impl std::fmt::Display for PendingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingChannel::Regular => write!(f, "regular"),
            PendingChannel::Support => write!(f, "support"),
        }
    }
}

impl std::str::FromStr for PendingChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(PendingChannel::Regular),
            "support" => Ok(PendingChannel::Support),
            _ => Err(format!("Invalid pending channel: {}", s)),
        }
    }
}

impl TryFrom<String> for PendingChannel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A message written while offline, waiting in the outbox for a live connection.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingMessage {
    /// `pending_<enqueue millis>_<7 base36 chars>`
    pub id: String,
    pub chat_id: String,
    pub content: String,
    /// Enqueue time, epoch milliseconds
    pub timestamp: i64,
    #[sqlx(try_from = "String")]
    pub channel: PendingChannel,
    pub retry_count: i64,
}
