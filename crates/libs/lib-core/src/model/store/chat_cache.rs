//! # Chat Cache
//!
//! Durable client-side cache for chats and messages, plus the outbox of
//! messages written while offline.
//!
//! One SQLite database holds five partitions:
//!
//! | Table              | Key | Read order                  |
//! |--------------------|-----|-----------------------------|
//! | `messages`         | id  | `created_at` ascending      |
//! | `chats`            | id  | `updated_at` descending     |
//! | `support_messages` | id  | `created_at` ascending      |
//! | `support_chats`    | id  | `updated_at` descending     |
//! | `pending_messages` | id  | enqueue timestamp ascending |
//!
//! Cached entities are stored as JSON payloads stamped with `cached_at`
//! (epoch ms). Expiry is lazy: rows are filtered at read time, never deleted
//! in the background. Reads and writes of cached entities log their failures
//! and fall back to "nothing cached"; only queueing a pending message reports
//! storage errors to the caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lib_core::model::store::{ChatCache, PendingChannel, CACHE_EXPIRY_MS};
//!
//! # async fn example() -> lib_core::Result<()> {
//! let cache = ChatCache::open("sqlite:data/chat-cache.db", CACHE_EXPIRY_MS).await?;
//!
//! let id = cache
//!     .store_pending_message("c1", "Still selling the goats?", PendingChannel::Regular)
//!     .await?;
//! assert!(id.starts_with("pending_"));
//!
//! let queued = cache.get_pending_messages().await;
//! assert_eq!(queued.len(), 1);
//! # Ok(())
//! # }
//! ```

use super::models::{PendingChannel, PendingMessage};
use super::{create_memory_pool, create_pool, DbPool};
use crate::error::{AppError, Result};
use lib_utils::time::now_millis;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::dto::chat::{Chat, Message, SupportChat, SupportMessage};
use sqlx::query_as;
use tracing::{debug, error, info, warn};

/// Default entry lifetime: 24 hours.
pub const CACHE_EXPIRY_MS: i64 = 24 * 60 * 60 * 1000;

/// Stored in `PRAGMA user_version`. Version 2 moved `sort_key` from epoch
/// ms to epoch µs.
pub const SCHEMA_VERSION: i64 = 2;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL,
        sort_key INTEGER NOT NULL,
        payload TEXT NOT NULL,
        cached_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages (chat_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_cached_at ON messages (cached_at)",
    r#"
    CREATE TABLE IF NOT EXISTS chats (
        id TEXT PRIMARY KEY,
        sort_key INTEGER NOT NULL,
        payload TEXT NOT NULL,
        cached_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_chats_updated_at ON chats (sort_key)",
    r#"
    CREATE TABLE IF NOT EXISTS support_messages (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL,
        sort_key INTEGER NOT NULL,
        payload TEXT NOT NULL,
        cached_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_support_messages_chat_id ON support_messages (chat_id)",
    "CREATE INDEX IF NOT EXISTS idx_support_messages_cached_at ON support_messages (cached_at)",
    r#"
    CREATE TABLE IF NOT EXISTS support_chats (
        id TEXT PRIMARY KEY,
        sort_key INTEGER NOT NULL,
        payload TEXT NOT NULL,
        cached_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_support_chats_updated_at ON support_chats (sort_key)",
    r#"
    CREATE TABLE IF NOT EXISTS pending_messages (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        channel TEXT NOT NULL,
        retry_count INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pending_timestamp ON pending_messages (timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_pending_retry_count ON pending_messages (retry_count)",
];

// region: --- Partitions

/// A cache table holding one kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Messages,
    Chats,
    SupportMessages,
    SupportChats,
}

impl Partition {
    pub const ALL: [Partition; 4] = [
        Partition::Messages,
        Partition::Chats,
        Partition::SupportMessages,
        Partition::SupportChats,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Partition::Messages => "messages",
            Partition::Chats => "chats",
            Partition::SupportMessages => "support_messages",
            Partition::SupportChats => "support_chats",
        }
    }

    /// Chat lists read newest first, message lists oldest first.
    fn order(self) -> &'static str {
        match self {
            Partition::Messages | Partition::SupportMessages => "ASC",
            Partition::Chats | Partition::SupportChats => "DESC",
        }
    }
}

/// An entity the cache can store. The partition is fixed per type so regular
/// and support records can never land in each other's table.
pub trait CacheRecord: Serialize + DeserializeOwned + Send + Sync {
    const PARTITION: Partition;

    fn record_id(&self) -> &str;

    /// Business ordering key in epoch µs. Two records written in the same
    /// millisecond still sort by their real timestamps.
    fn sort_key(&self) -> i64;
}

impl CacheRecord for Message {
    const PARTITION: Partition = Partition::Messages;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        self.created_at.timestamp_micros()
    }
}

impl CacheRecord for SupportMessage {
    const PARTITION: Partition = Partition::SupportMessages;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        self.created_at.timestamp_micros()
    }
}

impl CacheRecord for Chat {
    const PARTITION: Partition = Partition::Chats;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        self.updated_at.timestamp_micros()
    }
}

impl CacheRecord for SupportChat {
    const PARTITION: Partition = Partition::SupportChats;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        self.updated_at.timestamp_micros()
    }
}

// endregion: --- Partitions

/// Handle to the chat cache. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct ChatCache {
    pool: DbPool,
    expiry_ms: i64,
}

impl ChatCache {
    /// Open (or create) the cache database at `database_url`.
    pub async fn open(database_url: &str, expiry_ms: i64) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Self::with_pool(pool, expiry_ms).await
    }

    /// Open a throwaway cache that lives as long as the returned handle.
    pub async fn open_in_memory(expiry_ms: i64) -> Result<Self> {
        let pool = create_memory_pool().await?;
        Self::with_pool(pool, expiry_ms).await
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub async fn with_pool(pool: DbPool, expiry_ms: i64) -> Result<Self> {
        if expiry_ms <= 0 {
            return Err(AppError::InvalidInput(
                "cache expiry must be positive".to_string(),
            ));
        }

        let cache = Self { pool, expiry_ms };
        cache.init_schema().await?;
        Ok(cache)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn expiry_ms(&self) -> i64 {
        self.expiry_ms
    }

    async fn init_schema(&self) -> Result<()> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;

        if version > SCHEMA_VERSION {
            warn!(
                found = version,
                expected = SCHEMA_VERSION,
                "Chat cache schema is newer than this client"
            );
        }

        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        // Older sort keys use another unit. Cached records are only a copy of
        // the server's data, so they are dropped; the outbox is kept.
        if (1..SCHEMA_VERSION).contains(&version) {
            for partition in Partition::ALL {
                let sql = format!("DELETE FROM {}", partition.table());
                sqlx::query(&sql).execute(&self.pool).await?;
            }
            info!(from = version, to = SCHEMA_VERSION, "Chat cache records reset after schema upgrade");
        }

        let pragma = format!("PRAGMA user_version = {}", SCHEMA_VERSION);
        sqlx::query(&pragma).execute(&self.pool).await?;

        debug!(version = SCHEMA_VERSION, "Chat cache schema ready");
        Ok(())
    }

    // region: --- Generic partition access

    async fn put_at<T: CacheRecord>(
        &self,
        chat_id: Option<&str>,
        records: &[T],
        now_ms: i64,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let table = T::PARTITION.table();
        let sql = match chat_id {
            Some(_) => format!(
                "INSERT OR REPLACE INTO {} (id, chat_id, sort_key, payload, cached_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                table
            ),
            None => format!(
                "INSERT OR REPLACE INTO {} (id, sort_key, payload, cached_at) VALUES (?1, ?2, ?3, ?4)",
                table
            ),
        };

        let mut tx = self.pool.begin().await?;
        for record in records {
            let payload = serde_json::to_string(record)?;
            let query = sqlx::query(&sql).bind(record.record_id());
            let query = match chat_id {
                Some(chat_id) => query.bind(chat_id),
                None => query,
            };
            query
                .bind(record.sort_key())
                .bind(payload)
                .bind(now_ms)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(table, count = records.len(), "Cached records");
        Ok(())
    }

    async fn load_at<T: CacheRecord>(&self, chat_id: Option<&str>, now_ms: i64) -> Result<Vec<T>> {
        let partition = T::PARTITION;
        let table = partition.table();
        // age < expiry  <=>  cached_at > now - expiry
        let cutoff = now_ms - self.expiry_ms;

        let payloads: Vec<String> = match chat_id {
            Some(chat_id) => {
                let sql = format!(
                    "SELECT payload FROM {} WHERE chat_id = ?1 AND cached_at > ?2 ORDER BY sort_key {}, rowid ASC",
                    table,
                    partition.order()
                );
                sqlx::query_scalar(&sql)
                    .bind(chat_id)
                    .bind(cutoff)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT payload FROM {} WHERE cached_at > ?1 ORDER BY sort_key {}, rowid ASC",
                    table,
                    partition.order()
                );
                sqlx::query_scalar(&sql)
                    .bind(cutoff)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut records = Vec::with_capacity(payloads.len());
        for payload in payloads {
            match serde_json::from_str::<T>(&payload) {
                Ok(record) => records.push(record),
                Err(e) => warn!(table, error = %e, "Skipping undecodable cache entry"),
            }
        }
        Ok(records)
    }

    // endregion: --- Generic partition access

    // region: --- Regular chats

    /// Upsert `messages` under `chat_id`. Each message's `chat_id` is set to
    /// the argument. Failures are logged, never returned.
    pub async fn cache_messages(&self, chat_id: &str, messages: &[Message]) {
        self.cache_messages_at(chat_id, messages, now_millis()).await
    }

    pub(crate) async fn cache_messages_at(&self, chat_id: &str, messages: &[Message], now_ms: i64) {
        let scoped: Vec<Message> = messages
            .iter()
            .cloned()
            .map(|mut message| {
                message.chat_id = chat_id.to_string();
                message
            })
            .collect();

        if let Err(e) = self.put_at(Some(chat_id), &scoped, now_ms).await {
            error!(chat_id = %chat_id, count = messages.len(), error = %e, "Failed to cache messages");
        }
    }

    /// Unexpired messages of `chat_id`, oldest first.
    pub async fn get_cached_messages(&self, chat_id: &str) -> Vec<Message> {
        self.get_cached_messages_at(chat_id, now_millis()).await
    }

    pub(crate) async fn get_cached_messages_at(&self, chat_id: &str, now_ms: i64) -> Vec<Message> {
        self.load_at(Some(chat_id), now_ms).await.unwrap_or_else(|e| {
            error!(chat_id = %chat_id, error = %e, "Failed to read cached messages");
            Vec::new()
        })
    }

    pub async fn cache_chats(&self, chats: &[Chat]) {
        self.cache_chats_at(chats, now_millis()).await
    }

    pub(crate) async fn cache_chats_at(&self, chats: &[Chat], now_ms: i64) {
        if let Err(e) = self.put_at(None, chats, now_ms).await {
            error!(count = chats.len(), error = %e, "Failed to cache chats");
        }
    }

    /// Unexpired chats, most recently updated first.
    pub async fn get_cached_chats(&self) -> Vec<Chat> {
        self.get_cached_chats_at(now_millis()).await
    }

    pub(crate) async fn get_cached_chats_at(&self, now_ms: i64) -> Vec<Chat> {
        self.load_at(None, now_ms).await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to read cached chats");
            Vec::new()
        })
    }

    // endregion: --- Regular chats

    // region: --- Support chats

    pub async fn cache_support_messages(&self, chat_id: &str, messages: &[SupportMessage]) {
        self.cache_support_messages_at(chat_id, messages, now_millis()).await
    }

    pub(crate) async fn cache_support_messages_at(
        &self,
        chat_id: &str,
        messages: &[SupportMessage],
        now_ms: i64,
    ) {
        let scoped: Vec<SupportMessage> = messages
            .iter()
            .cloned()
            .map(|mut message| {
                message.chat_id = chat_id.to_string();
                message
            })
            .collect();

        if let Err(e) = self.put_at(Some(chat_id), &scoped, now_ms).await {
            error!(chat_id = %chat_id, count = messages.len(), error = %e, "Failed to cache support messages");
        }
    }

    pub async fn get_cached_support_messages(&self, chat_id: &str) -> Vec<SupportMessage> {
        self.get_cached_support_messages_at(chat_id, now_millis()).await
    }

    pub(crate) async fn get_cached_support_messages_at(
        &self,
        chat_id: &str,
        now_ms: i64,
    ) -> Vec<SupportMessage> {
        self.load_at(Some(chat_id), now_ms).await.unwrap_or_else(|e| {
            error!(chat_id = %chat_id, error = %e, "Failed to read cached support messages");
            Vec::new()
        })
    }

    pub async fn cache_support_chats(&self, chats: &[SupportChat]) {
        self.cache_support_chats_at(chats, now_millis()).await
    }

    pub(crate) async fn cache_support_chats_at(&self, chats: &[SupportChat], now_ms: i64) {
        if let Err(e) = self.put_at(None, chats, now_ms).await {
            error!(count = chats.len(), error = %e, "Failed to cache support chats");
        }
    }

    pub async fn get_cached_support_chats(&self) -> Vec<SupportChat> {
        self.get_cached_support_chats_at(now_millis()).await
    }

    pub(crate) async fn get_cached_support_chats_at(&self, now_ms: i64) -> Vec<SupportChat> {
        self.load_at(None, now_ms).await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to read cached support chats");
            Vec::new()
        })
    }

    // endregion: --- Support chats

    // region: --- Pending messages

    /// Queue a message for delivery once a connection is available.
    ///
    /// Returns the generated id after the write commits. Unlike the rest of
    /// the cache, storage errors are returned: a caller that loses the outbox
    /// write has lost the message.
    pub async fn store_pending_message(
        &self,
        chat_id: &str,
        content: &str,
        channel: PendingChannel,
    ) -> Result<String> {
        self.store_pending_message_at(chat_id, content, channel, now_millis())
            .await
    }

    pub(crate) async fn store_pending_message_at(
        &self,
        chat_id: &str,
        content: &str,
        channel: PendingChannel,
        now_ms: i64,
    ) -> Result<String> {
        let id = pending_id(now_ms);

        sqlx::query(
            r#"
            INSERT INTO pending_messages (id, chat_id, content, timestamp, channel, retry_count)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            "#,
        )
        .bind(&id)
        .bind(chat_id)
        .bind(content)
        .bind(now_ms)
        .bind(channel.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(chat_id = %chat_id, channel = %channel, error = %e, "Failed to queue pending message");
            AppError::from(e)
        })?;

        debug!(pending_id = %id, chat_id = %chat_id, channel = %channel, "Queued pending message");
        Ok(id)
    }

    /// All queued messages, oldest first. Empty on failure.
    pub async fn get_pending_messages(&self) -> Vec<PendingMessage> {
        self.try_get_pending_messages().await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to read pending messages");
            Vec::new()
        })
    }

    /// All queued messages, oldest first, surfacing storage errors.
    pub async fn try_get_pending_messages(&self) -> Result<Vec<PendingMessage>> {
        let pending = query_as::<_, PendingMessage>(
            r#"
            SELECT id, chat_id, content, timestamp, channel, retry_count
            FROM pending_messages
            ORDER BY timestamp ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(pending)
    }

    /// Delete a queued message. Deleting an absent id is not an error.
    pub async fn remove_pending_message(&self, id: &str) {
        if let Err(e) = sqlx::query("DELETE FROM pending_messages WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            error!(pending_id = %id, error = %e, "Failed to remove pending message");
        }
    }

    /// Increment the retry count of a queued message. No-op when it is gone.
    pub async fn update_pending_message_retry(&self, id: &str) {
        if let Err(e) =
            sqlx::query("UPDATE pending_messages SET retry_count = retry_count + 1 WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await
        {
            error!(pending_id = %id, error = %e, "Failed to update pending message retry count");
        }
    }

    // endregion: --- Pending messages

    /// Wipe every partition, including the outbox.
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for table in [
            "messages",
            "chats",
            "support_messages",
            "support_chats",
            "pending_messages",
        ] {
            let sql = format!("DELETE FROM {}", table);
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!("Chat cache cleared");
        Ok(())
    }
}

/// `pending_<millis>_<7 base36 chars>`
fn pending_id(now_ms: i64) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .filter_map(|_| std::char::from_digit(rng.random_range(0..36u32), 36))
        .collect();
    format!("pending_{}_{}", now_ms, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared::dto::chat::{SenderType, SupportChatStatus};

    const HOUR_MS: i64 = 60 * 60 * 1000;
    const NOW: i64 = 1_740_823_200_000; // 2025-03-01T10:00:00Z

    async fn setup_test_cache() -> ChatCache {
        ChatCache::open_in_memory(CACHE_EXPIRY_MS)
            .await
            .expect("Failed to create test cache")
    }

    fn message(id: &str, chat_id: &str, created_ms: i64) -> Message {
        let at = Utc.timestamp_millis_opt(created_ms).unwrap();
        Message {
            id: id.to_string(),
            chat_id: chat_id.to_string(),
            content: format!("content of {}", id),
            sender_id: "u1".to_string(),
            sender: None,
            read: false,
            created_at: at,
            updated_at: at,
            pending: false,
        }
    }

    fn chat(id: &str, updated_ms: i64) -> Chat {
        Chat {
            id: id.to_string(),
            ad_id: None,
            participant_ids: vec!["u1".to_string(), "u2".to_string()],
            status: None,
            last_message: None,
            unread_count: 0,
            created_at: None,
            updated_at: Utc.timestamp_millis_opt(updated_ms).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let cache = setup_test_cache().await;

        cache
            .cache_messages_at("c1", &[message("fresh", "c1", NOW)], NOW - 86_399_999)
            .await;
        cache
            .cache_messages_at("c1", &[message("stale", "c1", NOW)], NOW - 86_400_000)
            .await;

        let messages = cache.get_cached_messages_at("c1", NOW).await;

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "fresh");
    }

    #[tokio::test]
    async fn test_mixed_ages_sorted_by_creation() {
        let cache = setup_test_cache().await;

        // Cached at now-1ms but created last
        cache
            .cache_messages_at("c1", &[message("m1", "c1", NOW - 10)], NOW - 1)
            .await;
        cache
            .cache_messages_at("c1", &[message("m2", "c1", NOW - 20)], NOW - 25 * HOUR_MS)
            .await;
        cache
            .cache_messages_at("c1", &[message("m3", "c1", NOW - 30)], NOW - HOUR_MS)
            .await;

        let ids: Vec<String> = cache
            .get_cached_messages_at("c1", NOW)
            .await
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(ids, vec!["m3", "m1"]);
    }

    #[tokio::test]
    async fn test_cache_messages_overwrites_chat_id() {
        let cache = setup_test_cache().await;

        cache
            .cache_messages("c1", &[message("m1", "somewhere-else", NOW)])
            .await;

        let messages = cache.get_cached_messages("c1").await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].chat_id, "c1");
        assert!(cache.get_cached_messages("somewhere-else").await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_messages_upserts_by_id() {
        let cache = setup_test_cache().await;

        let mut m1 = message("m1", "c1", NOW);
        cache.cache_messages("c1", &[m1.clone()]).await;
        m1.content = "edited".to_string();
        cache.cache_messages("c1", &[m1]).await;

        let messages = cache.get_cached_messages("c1").await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "edited");
    }

    #[tokio::test]
    async fn test_chats_newest_first() {
        let cache = setup_test_cache().await;

        cache
            .cache_chats_at(
                &[chat("old", NOW - 3 * HOUR_MS), chat("new", NOW - HOUR_MS), chat("mid", NOW - 2 * HOUR_MS)],
                NOW,
            )
            .await;

        let ids: Vec<String> = cache
            .get_cached_chats_at(NOW)
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_same_millisecond_messages_keep_creation_order() {
        let cache = setup_test_cache().await;
        let base = Utc.timestamp_millis_opt(NOW).unwrap();

        let mut late = message("late", "c1", NOW);
        late.created_at = base + chrono::Duration::microseconds(700);
        let mut early = message("early", "c1", NOW);
        early.created_at = base + chrono::Duration::microseconds(200);
        // Inserted newest first so rowid order disagrees with creation order
        cache.cache_messages_at("c1", &[late, early], NOW).await;

        let ids: Vec<String> = cache
            .get_cached_messages_at("c1", NOW)
            .await
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_schema_upgrade_drops_records_but_keeps_outbox() {
        let cache = setup_test_cache().await;
        cache.cache_messages("c1", &[message("m1", "c1", NOW)]).await;
        cache.cache_chats(&[chat("c1", NOW)]).await;
        cache
            .store_pending_message("c1", "hello", PendingChannel::Regular)
            .await
            .unwrap();
        sqlx::query("PRAGMA user_version = 1")
            .execute(cache.pool())
            .await
            .unwrap();

        let reopened = ChatCache::with_pool(cache.pool().clone(), CACHE_EXPIRY_MS)
            .await
            .unwrap();

        assert!(reopened.get_cached_messages("c1").await.is_empty());
        assert!(reopened.get_cached_chats().await.is_empty());
        assert_eq!(reopened.get_pending_messages().await.len(), 1);
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    fn support_message(id: &str, chat_id: &str, created_ms: i64) -> SupportMessage {
        let at = Utc.timestamp_millis_opt(created_ms).unwrap();
        SupportMessage {
            id: id.to_string(),
            chat_id: chat_id.to_string(),
            content: format!("content of {}", id),
            sender_id: "u1".to_string(),
            sender_type: SenderType::User,
            read: false,
            created_at: at,
            updated_at: at,
            pending: false,
        }
    }

    fn support_chat(id: &str, updated_ms: i64) -> SupportChat {
        SupportChat {
            id: id.to_string(),
            user_id: "u1".to_string(),
            agent_id: None,
            subject: Some("Late delivery".to_string()),
            status: SupportChatStatus::Pending,
            category: "general".to_string(),
            priority: 1,
            last_message: None,
            created_at: None,
            updated_at: Utc.timestamp_millis_opt(updated_ms).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_support_partitions_are_separate() {
        let cache = setup_test_cache().await;

        cache
            .cache_support_messages("c1", &[support_message("s1", "c1", NOW)])
            .await;
        cache.cache_support_chats(&[support_chat("c1", NOW)]).await;

        assert!(cache.get_cached_messages("c1").await.is_empty());
        assert!(cache.get_cached_chats().await.is_empty());
        assert_eq!(cache.get_cached_support_messages("c1").await.len(), 1);
        assert_eq!(cache.get_cached_support_chats().await.len(), 1);
    }

    #[tokio::test]
    async fn test_support_expiry_boundary() {
        let cache = setup_test_cache().await;

        cache
            .cache_support_messages_at("c1", &[support_message("fresh", "c1", NOW)], NOW - 86_399_999)
            .await;
        cache
            .cache_support_messages_at("c1", &[support_message("stale", "c1", NOW)], NOW - 86_400_000)
            .await;
        cache
            .cache_support_chats_at(&[support_chat("fresh", NOW)], NOW - 86_399_999)
            .await;
        cache
            .cache_support_chats_at(&[support_chat("stale", NOW)], NOW - 86_400_000)
            .await;

        let messages = cache.get_cached_support_messages_at("c1", NOW).await;
        let chats = cache.get_cached_support_chats_at(NOW).await;

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "fresh");
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, "fresh");
    }

    #[tokio::test]
    async fn test_support_messages_oldest_first_chats_newest_first() {
        let cache = setup_test_cache().await;

        cache
            .cache_support_messages_at(
                "c1",
                &[
                    support_message("m3", "c1", NOW - 10),
                    support_message("m1", "c1", NOW - 30),
                    support_message("m2", "c1", NOW - 20),
                ],
                NOW,
            )
            .await;
        cache
            .cache_support_chats_at(
                &[
                    support_chat("old", NOW - 3 * HOUR_MS),
                    support_chat("new", NOW - HOUR_MS),
                    support_chat("mid", NOW - 2 * HOUR_MS),
                ],
                NOW,
            )
            .await;

        let message_ids: Vec<String> = cache
            .get_cached_support_messages_at("c1", NOW)
            .await
            .into_iter()
            .map(|m| m.id)
            .collect();
        let chat_ids: Vec<String> = cache
            .get_cached_support_chats_at(NOW)
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(message_ids, vec!["m1", "m2", "m3"]);
        assert_eq!(chat_ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_pending_id_format() {
        let cache = setup_test_cache().await;

        let id = cache
            .store_pending_message_at("c1", "hello", PendingChannel::Regular, NOW)
            .await
            .unwrap();

        let prefix = format!("pending_{}_", NOW);
        assert!(id.starts_with(&prefix));
        let suffix = &id[prefix.len()..];
        assert_eq!(suffix.len(), 7);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn test_pending_fifo_by_timestamp() {
        let cache = setup_test_cache().await;

        for (content, ts) in [("third", NOW + 300), ("first", NOW + 100), ("second", NOW + 200)] {
            cache
                .store_pending_message_at("c1", content, PendingChannel::Regular, ts)
                .await
                .unwrap();
        }

        let contents: Vec<String> = cache
            .get_pending_messages()
            .await
            .into_iter()
            .map(|p| p.content)
            .collect();

        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_pending_round_trip_fields() {
        let cache = setup_test_cache().await;

        let id = cache
            .store_pending_message_at("sc9", "where is my refund", PendingChannel::Support, NOW)
            .await
            .unwrap();

        let pending = cache.get_pending_messages().await;
        assert_eq!(
            pending,
            vec![PendingMessage {
                id,
                chat_id: "sc9".to_string(),
                content: "where is my refund".to_string(),
                timestamp: NOW,
                channel: PendingChannel::Support,
                retry_count: 0,
            }]
        );
    }

    #[tokio::test]
    async fn test_retry_increment_and_idempotent_removal() {
        let cache = setup_test_cache().await;

        let id = cache
            .store_pending_message("c1", "hello", PendingChannel::Regular)
            .await
            .unwrap();

        cache.update_pending_message_retry(&id).await;
        cache.update_pending_message_retry(&id).await;
        assert_eq!(cache.get_pending_messages().await[0].retry_count, 2);

        cache.remove_pending_message(&id).await;
        cache.remove_pending_message(&id).await;
        cache.update_pending_message_retry(&id).await;

        assert!(cache.get_pending_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let cache = setup_test_cache().await;

        cache.cache_messages("c1", &[message("m1", "c1", NOW)]).await;
        cache.cache_chats(&[chat("c1", NOW)]).await;
        cache
            .store_pending_message("c1", "hello", PendingChannel::Regular)
            .await
            .unwrap();

        cache.clear_all().await.unwrap();

        assert!(cache.get_cached_messages("c1").await.is_empty());
        assert!(cache.get_cached_chats().await.is_empty());
        assert!(cache.get_pending_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_only_surfaces_on_store_pending() {
        let cache = setup_test_cache().await;
        cache.pool().close().await;

        cache.cache_messages("c1", &[message("m1", "c1", NOW)]).await;
        assert!(cache.get_cached_messages("c1").await.is_empty());
        assert!(cache.get_pending_messages().await.is_empty());
        cache.remove_pending_message("pending_1_abcdefg").await;

        let result = cache
            .store_pending_message("c1", "hello", PendingChannel::Regular)
            .await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert!(cache.try_get_pending_messages().await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_expiry() {
        let pool = create_memory_pool().await.unwrap();
        assert!(matches!(
            ChatCache::with_pool(pool, 0).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
