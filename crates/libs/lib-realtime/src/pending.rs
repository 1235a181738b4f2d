//! # Pending-Message Processor
//!
//! Drains the offline outbox kept in [`ChatCache`]. A sweep reads every
//! queued message oldest first and, for each one:
//!
//! 1. drops it once `retry_count >= max_retry_attempts` (logged at error
//!    level and kept in an in-memory failed list)
//! 2. otherwise emits it (`new_message` or `new_support_message`, tagged with
//!    `pendingId`)
//! 3. removes it when the emit succeeds, bumps its retry count when it fails
//!
//! A failure on one message never stops the sweep. Sweeps never overlap: a
//! sweep requested while another is running is skipped.

use crate::error::Result;
use lib_core::{ChatCache, PendingChannel, PendingMessage};
use parking_lot::Mutex;
use serde_json::Value;
use shared::dto::realtime::{events, NewMessagePayload, SupportMessagePayload};
use tracing::{debug, error, info, warn};

/// Where the processor sends queued messages.
pub trait Emitter: Send + Sync {
    fn try_emit(&self, event: &str, data: Value) -> Result<()>;
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub sent: usize,
    pub retried: usize,
    pub dropped: Vec<PendingMessage>,
}

pub struct PendingProcessor {
    cache: ChatCache,
    max_retry_attempts: i64,
    failed: Mutex<Vec<PendingMessage>>,
    sweeping: tokio::sync::Mutex<()>,
}

impl PendingProcessor {
    pub fn new(cache: ChatCache, max_retry_attempts: i64) -> Self {
        Self {
            cache,
            max_retry_attempts,
            failed: Mutex::new(Vec::new()),
            sweeping: tokio::sync::Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &ChatCache {
        &self.cache
    }

    /// Run one sweep. `None` when skipped because another sweep is running or
    /// the queue could not be read.
    pub async fn process_pending_messages(&self, emitter: &dyn Emitter) -> Option<SweepReport> {
        let Ok(_guard) = self.sweeping.try_lock() else {
            debug!("Pending sweep already running, skipping");
            return None;
        };

        let pending = match self.cache.try_get_pending_messages().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Failed to read pending messages, aborting sweep");
                return None;
            }
        };

        let mut report = SweepReport::default();
        if pending.is_empty() {
            return Some(report);
        }

        info!(count = pending.len(), "Processing pending messages");

        for message in pending {
            if message.retry_count >= self.max_retry_attempts {
                self.cache.remove_pending_message(&message.id).await;
                error!(
                    pending_id = %message.id,
                    chat_id = %message.chat_id,
                    retry_count = message.retry_count,
                    "Dropping pending message after max retry attempts"
                );
                self.failed.lock().push(message.clone());
                report.dropped.push(message);
                continue;
            }

            match outbound(&message).and_then(|(event, data)| emitter.try_emit(event, data)) {
                Ok(()) => {
                    self.cache.remove_pending_message(&message.id).await;
                    debug!(pending_id = %message.id, chat_id = %message.chat_id, "Pending message sent");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(
                        pending_id = %message.id,
                        retry_count = message.retry_count + 1,
                        error = %e,
                        "Failed to send pending message, will retry"
                    );
                    self.cache.update_pending_message_retry(&message.id).await;
                    report.retried += 1;
                }
            }
        }

        info!(
            sent = report.sent,
            retried = report.retried,
            dropped = report.dropped.len(),
            "Pending sweep finished"
        );
        Some(report)
    }

    /// Messages dropped after exhausting their retries, oldest first.
    pub fn failed_messages(&self) -> Vec<PendingMessage> {
        self.failed.lock().clone()
    }

    pub fn clear_failed_messages(&self) {
        self.failed.lock().clear();
    }
}

/// Realtime event for a queued message. The pending id doubles as the client
/// message id so the server can match it with the REST copy.
fn outbound(message: &PendingMessage) -> Result<(&'static str, Value)> {
    let (event, data) = match message.channel {
        PendingChannel::Regular => (
            events::NEW_MESSAGE,
            serde_json::to_value(NewMessagePayload {
                chat_id: message.chat_id.clone(),
                content: message.content.clone(),
                recipient_id: None,
                client_message_id: Some(message.id.clone()),
                pending_id: Some(message.id.clone()),
            })?,
        ),
        PendingChannel::Support => (
            events::NEW_SUPPORT_MESSAGE,
            serde_json::to_value(SupportMessagePayload {
                chat_id: message.chat_id.clone(),
                content: message.content.clone(),
                client_message_id: Some(message.id.clone()),
                pending_id: Some(message.id.clone()),
            })?,
        ),
    };
    Ok((event, data))
}
