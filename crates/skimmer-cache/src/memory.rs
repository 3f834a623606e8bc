//! Sharded in-memory cache.
//!
//! N shards (power of two), shard picked by a non-cryptographic hash of
//! the key. Each shard carries its own lock and its own expiration
//! sweep, so high request fan-out never serializes on a global lock.

use crate::{Cache, CacheStats, CachedValue};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_SHARDS: usize = 256;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    value: CachedValue,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Shard = RwLock<HashMap<String, Entry>>;

/// In-memory cache with per-shard locking and sweeping.
pub struct ShardedCache {
    shards: Vec<Shard>,
    mask: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ShardedCache {
    /// Create a cache with the default shard count (256).
    pub fn new() -> Arc<Self> {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a cache with `shards` shards, rounded up to a power of
    /// two so shard selection stays a mask.
    pub fn with_shards(shards: usize) -> Arc<Self> {
        let count = shards.max(1).next_power_of_two();
        let shards = (0..count).map(|_| RwLock::new(HashMap::new())).collect();
        Arc::new(Self {
            shards,
            mask: count - 1,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        })
    }

    /// Spawn one background sweep task per shard. Starts are staggered
    /// across the interval so the sweeps do not fire in lockstep.
    pub fn spawn_sweepers(self: &Arc<Self>) {
        for index in 0..self.shards.len() {
            let cache = Arc::clone(self);
            let stagger =
                SWEEP_INTERVAL.mul_f64(index as f64 / cache.shards.len() as f64);
            tokio::spawn(async move {
                tokio::time::sleep(stagger).await;
                let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
                loop {
                    ticker.tick().await;
                    cache.sweep_shard(index);
                }
            });
        }
    }

    fn shard_for(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) & self.mask]
    }

    fn sweep_shard(&self, index: usize) {
        let now = Instant::now();
        let mut shard = self.shards[index].write();
        let before = shard.len();
        shard.retain(|_, entry| !entry.is_expired(now));
        let removed = before - shard.len();
        if removed > 0 {
            debug!(shard = index, removed, "swept expired cache entries");
        }
    }

    fn lookup(&self, key: &str) -> Option<CachedValue> {
        let now = Instant::now();
        let shard = self.shard_for(key);
        {
            let guard = shard.read();
            match guard.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired entry: drop it eagerly instead of waiting for the sweep.
        let mut guard = shard.write();
        if guard.get(key).map(|e| e.is_expired(now)).unwrap_or(false) {
            guard.remove(key);
        }
        None
    }

    fn entry_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }
}

#[async_trait]
impl Cache for ShardedCache {
    async fn get(&self, key: &str) -> Option<CachedValue> {
        let found = self.lookup(key);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    async fn set(&self, key: &str, value: CachedValue, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.shard_for(key).write().insert(key.to_string(), entry);
    }

    async fn mget(&self, keys: &[String]) -> HashMap<String, CachedValue> {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.lookup(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                found.insert(key.clone(), value);
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        found
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: Some(self.entry_count()),
        }
    }
}
