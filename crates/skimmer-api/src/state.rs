//! Shared application state.

use skimmer_cache::Cache;
use skimmer_search::SearchClient;
use skimmer_workers::WorkerPool;
use std::sync::Arc;
use std::time::Duration;

/// Everything the handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
    pub search: Arc<SearchClient>,
    pub http_pool: Arc<WorkerPool>,
    pub browser_pool: Arc<WorkerPool>,
    pub search_cache_ttl: Duration,
    pub content_cache_ttl: Duration,
}

impl AppState {
    pub fn new(
        cache: Arc<dyn Cache>,
        search: Arc<SearchClient>,
        http_pool: Arc<WorkerPool>,
        browser_pool: Arc<WorkerPool>,
        search_cache_ttl: Duration,
        content_cache_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            search,
            http_pool,
            browser_pool,
            search_cache_ttl,
            content_cache_ttl,
        }
    }
}
