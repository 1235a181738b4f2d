//! # Realtime Configuration
//!
//! Timing and budget knobs of the connection manager, the transport and the
//! pending sweep. Built from the process-wide [`lib_core::Config`].

use std::time::Duration;

/// A fixed-interval retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeConfig {
    pub socket_url: String,

    /// Handshake timeout for each connection attempt
    pub connect_timeout: Duration,

    /// Reconnects scheduled by the manager after a server-initiated
    /// disconnect or a failed initial connect
    pub manager_reconnect: ReconnectPolicy,

    /// Reconnects the transport runs by itself after losing a live link
    pub transport_reconnect: ReconnectPolicy,

    /// Period of the pending sweep while connected
    pub sweep_interval: Duration,

    /// Pending messages at or above this retry count are dropped
    pub max_retry_attempts: i64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self::from(&lib_core::Config::default())
    }
}

impl From<&lib_core::Config> for RealtimeConfig {
    fn from(config: &lib_core::Config) -> Self {
        Self {
            socket_url: config.socket_url.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            manager_reconnect: ReconnectPolicy {
                interval: Duration::from_millis(config.reconnect_interval_ms),
                max_attempts: config.max_reconnect_attempts,
            },
            transport_reconnect: ReconnectPolicy {
                interval: Duration::from_millis(config.transport_reconnect_delay_ms),
                max_attempts: config.transport_reconnect_attempts,
            },
            sweep_interval: Duration::from_millis(config.pending_sweep_interval_ms),
            max_retry_attempts: config.pending_max_retry_attempts,
        }
    }
}
