//! # Skimmer Cache
//!
//! Keyed storage with TTL for search URL lists and per-URL extraction
//! results. Two backends satisfy the same [`Cache`] contract:
//!
//! - [`ShardedCache`]: in-process, lock-per-shard, per-shard expiry
//!   sweeps. The default.
//! - [`RedisCache`]: networked, JSON-marshalled values, batched `MGET`.
//!
//! The cache is concurrent-safe but deliberately does not coalesce
//! concurrent computations of the same key; duplicate work on a miss is
//! tolerated and the last writer wins.

pub mod memory;
pub mod redis_backend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skimmer_types::{ExtractError, ExtractedResult};
use std::collections::HashMap;
use std::time::Duration;

pub use memory::ShardedCache;
pub use redis_backend::RedisCache;

/// TTL for cached permanent-looking failures. Short on purpose: it only
/// has to stop a burst of requests from hammering a dead URL.
pub const FAILURE_CACHE_TTL: Duration = Duration::from_secs(300);

/// What the cache stores: a search result URL list or a per-URL record.
///
/// Untagged JSON keeps the encoding portable across backends; an array
/// is a URL list, an object is an extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedValue {
    Urls(Vec<String>),
    Result(ExtractedResult),
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: Option<usize>,
}

/// The storage contract shared by both backends.
///
/// `set` is fire-and-forget: backend failures are logged, never
/// surfaced to the request path. `get` treats decode failures as
/// misses.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedValue>;

    async fn set(&self, key: &str, value: CachedValue, ttl: Duration);

    /// Batched lookup; absent and expired keys are simply missing from
    /// the returned map.
    async fn mget(&self, keys: &[String]) -> HashMap<String, CachedValue>;

    fn stats(&self) -> CacheStats;
}

/// Whether a failed extraction should be negatively cached.
///
/// Conservative: everything permanent-looking is cached for
/// [`FAILURE_CACHE_TTL`]; timeouts and cancellations never are.
pub fn should_cache_failure(error: &ExtractError) -> bool {
    error.is_likely_permanent()
}
