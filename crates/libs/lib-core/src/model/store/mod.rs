//! # Database Store
//!
//! SQLite connection pool and the chat cache built on it.

// region: --- Modules
pub mod chat_cache;
pub mod models;
// endregion: --- Modules

// region: --- Re-exports
pub use chat_cache::{CacheRecord, ChatCache, Partition, CACHE_EXPIRY_MS, SCHEMA_VERSION};
pub use models::{PendingChannel, PendingMessage};
// endregion: --- Re-exports

// region: --- Types and Functions
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new SQLite connection pool, creating the database file and its
/// parent directory when missing.
pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    if let Some(parent) = database_file(database_url).and_then(|path| path.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::AppError::Storage(format!("Failed to create cache directory: {}", e))
            })?;
        }
    }

    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    Ok(pool)
}

/// Create a private in-memory pool.
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool is
/// pinned to a single connection that never expires.
pub async fn create_memory_pool() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    Ok(pool)
}

fn database_file(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}
// endregion: --- Types and Functions
