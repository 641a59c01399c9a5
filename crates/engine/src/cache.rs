//! Two-tier read-through cache.
//!
//! A `moka` in-memory tier sits in front of the `cache` table. The memory
//! tier holds entries for at most the refresh window, so a value served
//! from memory is never staler than that window; the store tier honors the
//! entry's absolute expiry. Writers never update entries in place: they
//! write the source of truth first and then invalidate here, and the
//! invalidation of both tiers completes before the write reports success.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use tracing::debug;

use crate::config::CacheConfig;
use crate::db::{RepositoryError, now_ts};

/// A memory-tier entry: the serialized value plus its absolute expiry.
#[derive(Clone)]
struct MemoryEntry {
    value: Arc<str>,
    expires_at: Option<i64>,
}

impl MemoryEntry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// The cache layer shared by every service.
#[derive(Clone)]
pub struct CacheLayer {
    memory: Cache<String, MemoryEntry>,
    pool: SqlitePool,
}

impl CacheLayer {
    /// Build the layer over a pool, sizing the memory tier from config.
    #[must_use]
    pub fn new(pool: SqlitePool, config: &CacheConfig) -> Self {
        let memory = Cache::builder()
            .max_capacity(config.memory_capacity)
            .time_to_live(config.memory_refresh)
            .build();
        Self { memory, pool }
    }

    /// Read a value through both tiers.
    ///
    /// A memory hit that has passed its absolute expiry is dropped and the
    /// store tier is consulted; an expired store row is deleted lazily and
    /// reads as a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a cached value fails to
    /// deserialize; `RepositoryError::Database` if the store tier fails.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let now = now_ts();

        if let Some(entry) = self.memory.get(key).await {
            if entry.is_expired(now) {
                self.memory.invalidate(key).await;
            } else {
                debug!(key, tier = "memory", "cache hit");
                return deserialize(key, &entry.value).map(Some);
            }
        }

        let row = sqlx::query_as::<_, (String, Option<i64>)>(
            "SELECT value, expires_at FROM cache WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some((value, expires_at)) = row else {
            debug!(key, "cache miss");
            return Ok(None);
        };

        if expires_at.is_some_and(|at| at <= now) {
            sqlx::query("DELETE FROM cache WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await?;
            debug!(key, "cache miss (expired)");
            return Ok(None);
        }

        let entry = MemoryEntry {
            value: Arc::from(value.as_str()),
            expires_at,
        };
        self.memory.insert(key.to_owned(), entry).await;
        debug!(key, tier = "store", "cache hit");
        deserialize(key, &value).map(Some)
    }

    /// Write a value to both tiers.
    ///
    /// `ttl` of `None` means the entry never expires on its own (it still
    /// leaves the memory tier at the refresh window).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the value fails to
    /// serialize; `RepositoryError::Database` if the store tier fails.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), RepositoryError> {
        let serialized = serde_json::to_string(value)
            .map_err(|e| RepositoryError::DataCorruption(format!("serialize {key}: {e}")))?;
        #[allow(clippy::cast_possible_wrap)]
        let expires_at = ttl.map(|ttl| now_ts() + ttl.as_secs() as i64);

        sqlx::query(
            "INSERT INTO cache (key, value, expires_at, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(&serialized)
        .bind(expires_at)
        .bind(now_ts())
        .execute(&self.pool)
        .await?;

        let entry = MemoryEntry {
            value: Arc::from(serialized.as_str()),
            expires_at,
        };
        self.memory.insert(key.to_owned(), entry).await;
        Ok(())
    }

    /// Drop a key from both tiers.
    ///
    /// Returns only after both tiers have forgotten the key, so a reader
    /// arriving afterwards re-reads the source of truth.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the store tier fails.
    pub async fn invalidate(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        self.memory.invalidate(key).await;
        Ok(())
    }

    /// Delete every expired row from the store tier.
    ///
    /// Returns the number of rows removed. Meant for a periodic sweep;
    /// reads already treat expired rows as misses, so this only reclaims
    /// space.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the sweep fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM cache WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now_ts())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

fn deserialize<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("deserialize {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::db::memory_pool;

    async fn layer() -> CacheLayer {
        let pool = memory_pool().await.unwrap();
        CacheLayer::new(pool, &CacheConfig::default())
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = layer().await;
        cache.set("greeting", &"hello".to_owned(), None).await.unwrap();
        let got: Option<String> = cache.get("greeting").await.unwrap();
        assert_eq!(got.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache = layer().await;
        let got: Option<String> = cache.get("nothing-here").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn invalidate_hides_the_key_from_both_tiers() {
        let cache = layer().await;
        cache.set("victim", &42_i64, None).await.unwrap();
        cache.invalidate("victim").await.unwrap();
        let got: Option<i64> = cache.get("victim").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn expired_store_row_reads_as_miss() {
        let cache = layer().await;
        cache.set("flash", &1_i64, None).await.unwrap();
        // Backdate the expiry, then clear the memory tier so the read
        // must consult the store.
        sqlx::query("UPDATE cache SET expires_at = 1 WHERE key = 'flash'")
            .execute(&cache.pool)
            .await
            .unwrap();
        cache.memory.invalidate("flash").await;
        let got: Option<i64> = cache.get("flash").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn purge_expired_reclaims_rows() {
        let cache = layer().await;
        cache.set("old", &1_i64, None).await.unwrap();
        cache.set("fresh", &2_i64, None).await.unwrap();
        sqlx::query("UPDATE cache SET expires_at = 1 WHERE key = 'old'")
            .execute(&cache.pool)
            .await
            .unwrap();
        let purged = cache.purge_expired().await.unwrap();
        assert_eq!(purged, 1);
        let fresh: Option<i64> = cache.get("fresh").await.unwrap();
        assert_eq!(fresh, Some(2));
    }
}
