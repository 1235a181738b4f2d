//! # Application Configuration
//!
//! This module manages application configuration loaded from environment variables.
//! All configuration is validated on startup to fail fast if misconfigured.
//!
//! ## Global Config Access
//!
//! Use [`core_config()`] to access the global configuration instance:
//!
//! ```rust,no_run
//! use lib_core::config::core_config;
//!
//! let config = core_config();
//! let socket_url = &config.socket_url;
//! ```
//!
//! The config must be initialized once at application startup using [`init_config()`].
//!
//! ## Variables
//!
//! | Variable                              | Default                      |
//! |---------------------------------------|------------------------------|
//! | `API_BASE_URL`                        | `http://localhost:3000`      |
//! | `SOCKET_URL`                          | `ws://localhost:3002/socket` |
//! | `CHAT_CACHE_URL`                      | `sqlite:data/chat-cache.db`  |
//! | `CHAT_CACHE_EXPIRY_HOURS`             | `24`                         |
//! | `SOCKET_RECONNECT_INTERVAL_MS`        | `5000`                       |
//! | `SOCKET_MAX_RECONNECT_ATTEMPTS`       | `10`                         |
//! | `SOCKET_CONNECT_TIMEOUT_MS`           | `10000`                      |
//! | `SOCKET_TRANSPORT_RECONNECT_ATTEMPTS` | `5`                          |
//! | `SOCKET_TRANSPORT_RECONNECT_DELAY_MS` | `3000`                       |
//! | `PENDING_SWEEP_INTERVAL_MS`           | `30000`                      |
//! | `PENDING_MAX_RETRY_ATTEMPTS`          | `5`                          |

use lib_utils::envs::{get_env_or, get_env_parse_or};
use std::sync::OnceLock;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:3002/socket";
pub const DEFAULT_CACHE_URL: &str = "sqlite:data/chat-cache.db";

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base URL of the marketplace REST API
    pub api_base_url: String,

    /// WebSocket endpoint of the realtime hub
    pub socket_url: String,

    /// SQLite URL of the local chat cache
    pub cache_url: String,

    /// Cached entries older than this are never returned.
    ///
    /// Valid range: 1-720 hours
    pub cache_expiry_hours: i64,

    /// Delay between reconnects scheduled by the connection manager
    pub reconnect_interval_ms: u64,

    /// Reconnects the connection manager schedules before giving up
    pub max_reconnect_attempts: u32,

    /// Handshake timeout for one connection attempt
    pub connect_timeout_ms: u64,

    /// Reconnects the transport attempts on its own after losing the link
    pub transport_reconnect_attempts: u32,

    /// Delay between transport-level reconnects
    pub transport_reconnect_delay_ms: u64,

    /// Period of the pending-message sweep while connected
    pub pending_sweep_interval_ms: u64,

    /// A pending message is dropped once its retry count reaches this value
    pub pending_max_retry_attempts: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            cache_url: DEFAULT_CACHE_URL.to_string(),
            cache_expiry_hours: 24,
            reconnect_interval_ms: 5_000,
            max_reconnect_attempts: 10,
            connect_timeout_ms: 10_000,
            transport_reconnect_attempts: 5,
            transport_reconnect_delay_ms: 3_000,
            pending_sweep_interval_ms: 30_000,
            pending_max_retry_attempts: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Config::default();

        Ok(Self {
            api_base_url: get_env_or("API_BASE_URL", DEFAULT_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            socket_url: get_env_or("SOCKET_URL", DEFAULT_SOCKET_URL),
            cache_url: get_env_or("CHAT_CACHE_URL", DEFAULT_CACHE_URL),
            cache_expiry_hours: parse("CHAT_CACHE_EXPIRY_HOURS", defaults.cache_expiry_hours)?,
            reconnect_interval_ms: parse(
                "SOCKET_RECONNECT_INTERVAL_MS",
                defaults.reconnect_interval_ms,
            )?,
            max_reconnect_attempts: parse(
                "SOCKET_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            )?,
            connect_timeout_ms: parse("SOCKET_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms)?,
            transport_reconnect_attempts: parse(
                "SOCKET_TRANSPORT_RECONNECT_ATTEMPTS",
                defaults.transport_reconnect_attempts,
            )?,
            transport_reconnect_delay_ms: parse(
                "SOCKET_TRANSPORT_RECONNECT_DELAY_MS",
                defaults.transport_reconnect_delay_ms,
            )?,
            pending_sweep_interval_ms: parse(
                "PENDING_SWEEP_INTERVAL_MS",
                defaults.pending_sweep_interval_ms,
            )?,
            pending_max_retry_attempts: parse(
                "PENDING_MAX_RETRY_ATTEMPTS",
                defaults.pending_max_retry_attempts,
            )?,
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err("API_BASE_URL must start with http:// or https://".to_string());
        }

        if !(self.socket_url.starts_with("ws://") || self.socket_url.starts_with("wss://")) {
            return Err("SOCKET_URL must start with ws:// or wss://".to_string());
        }

        if !self.cache_url.starts_with("sqlite:") {
            return Err("CHAT_CACHE_URL must be a sqlite: URL".to_string());
        }

        if self.cache_expiry_hours < 1 || self.cache_expiry_hours > 720 {
            return Err("CHAT_CACHE_EXPIRY_HOURS must be between 1 and 720 (30 days)".to_string());
        }

        if self.reconnect_interval_ms == 0
            || self.transport_reconnect_delay_ms == 0
            || self.pending_sweep_interval_ms == 0
            || self.connect_timeout_ms == 0
        {
            return Err("Socket intervals and timeouts must be greater than zero".to_string());
        }

        if self.max_reconnect_attempts == 0 || self.transport_reconnect_attempts == 0 {
            return Err("Reconnect attempt budgets must be at least 1".to_string());
        }

        if self.pending_max_retry_attempts < 1 {
            return Err("PENDING_MAX_RETRY_ATTEMPTS must be at least 1".to_string());
        }

        Ok(())
    }

    /// Cache expiry in milliseconds.
    pub fn cache_expiry_ms(&self) -> i64 {
        self.cache_expiry_hours * 60 * 60 * 1000
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, String> {
    get_env_parse_or(name, default).map_err(|_| format!("{} must be a valid number", name))
}

/// Global configuration instance (initialized once at startup).
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize the global configuration.
///
/// This should be called once at application startup, before the runtime or
/// any session that needs configuration is built.
///
/// # Errors
///
/// Returns an error if:
/// - Environment variables are invalid
/// - Configuration validation fails
/// - Config has already been initialized
///
/// # Example
///
/// ```rust,no_run
/// use lib_core::config::init_config;
///
/// fn main() -> Result<(), String> {
///     init_config()?;
///     // ... rest of application startup
///     Ok(())
/// }
/// ```
pub fn init_config() -> Result<&'static Config, String> {
    let config = Config::from_env()?;
    config.validate()?;

    CONFIG
        .set(config)
        .map_err(|_| "Config has already been initialized".to_string())?;

    CONFIG
        .get()
        .ok_or_else(|| "Config missing after initialization".to_string())
}

/// Get a reference to the global configuration.
///
/// # Panics
///
/// Panics if [`init_config()`] has not been called yet.
pub fn core_config() -> &'static Config {
    CONFIG.get().expect("Config must be initialized with init_config() before use")
}
