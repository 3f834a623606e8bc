//! Redis-backed cache.
//!
//! Values are marshalled to JSON before storage so the encoding stays
//! portable; a value that fails to decode on read is treated as a miss
//! rather than an error. Uses a multiplexed connection, `SET .. EX` for
//! TTLs and a single `MGET` for batched lookups.

use crate::{Cache, CacheStats, CachedValue};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Networked cache backend.
pub struct RedisCache {
    conn: MultiplexedConnection,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl RedisCache {
    /// Connect to Redis at `url` (password and db index embedded in the
    /// URL).
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self {
            conn,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        })
    }

    fn decode(key: &str, raw: Vec<u8>) -> Option<CachedValue> {
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "cached value failed to decode, treating as miss");
                None
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<CachedValue> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "redis get failed");
                None
            }
        };

        let value = raw.and_then(|bytes| Self::decode(key, bytes));
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "redis cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    async fn set(&self, key: &str, value: CachedValue, ttl: Duration) {
        let bytes = match serde_json::to_vec(&value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode cache value");
                return;
            }
        };

        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> =
            conn.set_ex(key, bytes, ttl.as_secs().max(1)).await;
        if let Err(e) = result {
            warn!(key = %key, error = %e, "redis set failed");
        }
    }

    async fn mget(&self, keys: &[String]) -> HashMap<String, CachedValue> {
        if keys.is_empty() {
            return HashMap::new();
        }

        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }

        let raw: Vec<Option<Vec<u8>>> = match cmd.query_async(&mut conn).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, count = keys.len(), "redis mget failed");
                self.misses.fetch_add(keys.len(), Ordering::Relaxed);
                return HashMap::new();
            }
        };

        let mut found = HashMap::new();
        for (key, slot) in keys.iter().zip(raw) {
            match slot.and_then(|bytes| Self::decode(key, bytes)) {
                Some(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    found.insert(key.clone(), value);
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        found
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: None,
        }
    }
}
