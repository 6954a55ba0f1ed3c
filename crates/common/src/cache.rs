//! Expiring key-value cache.
//!
//! The analytics rollup caches its result under one well-known key. The
//! backing store is chosen at startup: Redis when configured, otherwise an
//! in-process map.

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::Expiration;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::{AppError, AppResult};

/// A string cache with per-entry TTL.
#[async_trait]
pub trait KvCache: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;

    /// Remove an entry. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// In-process cache backed by a map of `(value, deadline)`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvCache for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, deadline)| Instant::now() < *deadline)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, deadline)| Instant::now() < *deadline);
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Redis-backed cache. Keys are namespaced with a prefix.
#[derive(Clone)]
pub struct RedisCache {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisCache {
    /// Wrap an already connected client.
    #[must_use]
    pub const fn new(redis: Arc<RedisClient>, prefix: String) -> Self {
        Self { redis, prefix }
    }

    /// Connect to Redis at `url`.
    pub async fn connect(url: &str, prefix: &str) -> AppResult<Self> {
        let config = fred::types::config::Config::from_url(url)
            .map_err(|e| AppError::Config(format!("invalid Redis URL: {e}")))?;
        let client = RedisClient::new(config, None, None, None);
        client.connect();
        client
            .wait_for_connect()
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        Ok(Self::new(Arc::new(client), prefix.to_string()))
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }
}

#[async_trait]
impl KvCache for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let value: Option<String> = self
            .redis
            .get(self.key(key))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        debug!(key = %key, hit = value.is_some(), "Redis cache lookup");
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let secs = ttl.as_secs().max(1) as i64;
        self.redis
            .set::<(), _, _>(self.key(key), value, Some(Expiration::EX(secs)), None, false)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.redis
            .del::<(), _>(self.key(key))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("summary", "[]".to_string(), Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(cache.get("summary").await.unwrap().as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("summary").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("summary").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_delete() {
        let cache = MemoryCache::new();
        cache
            .set("summary", "x".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("summary").await.unwrap();
        assert!(cache.get("summary").await.unwrap().is_none());
        // Deleting again is fine.
        cache.delete("summary").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_cache_overwrite() {
        let cache = MemoryCache::new();
        cache.set("k", "a".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.set("k", "b".to_string(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("b"));
    }
}
