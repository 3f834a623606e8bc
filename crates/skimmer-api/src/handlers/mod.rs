//! HTTP handlers.

pub mod extract;
pub mod health;
pub mod search;

use crate::state::AppState;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use skimmer_cache::{CachedValue, FAILURE_CACHE_TTL};
use skimmer_extract::{pool_class, PoolClass};
use skimmer_types::{content_key, Endpoint, ExtractedResult, SourceType};
use skimmer_workers::Job;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancels its token when dropped, tying job cancellation to the
/// lifetime of the request future: a disconnected client drops the
/// handler, which cancels everything still in flight.
pub(crate) struct CancelOnDrop(pub CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Run a batch of URLs through the content cache and the worker pools.
///
/// Every input URL yields exactly one result. Cached entries come back
/// immediately; the rest are enqueued on the pool matching their URL
/// class and aggregated in completion order. Fresh results are written
/// back to the cache (successes at the content TTL, permanent-looking
/// failures briefly).
pub(crate) async fn process_urls(
    state: &AppState,
    urls: &[String],
    endpoint: Endpoint,
    max_chars: Option<usize>,
    cancel: &CancellationToken,
) -> Vec<ExtractedResult> {
    let keys: Vec<String> = urls.iter().map(|url| content_key(url, max_chars)).collect();
    let cached = state.cache.mget(&keys).await;

    let mut results = Vec::with_capacity(urls.len());
    let mut pending = FuturesUnordered::new();

    for (url, key) in urls.iter().zip(&keys) {
        if let Some(CachedValue::Result(result)) = cached.get(key) {
            debug!(url = %url, "content cache hit");
            results.push(result.clone());
            continue;
        }

        let (job, rx) = Job::new(url.clone(), endpoint, max_chars, cancel.clone());
        let pool = match pool_class(url, endpoint) {
            PoolClass::Http => &state.http_pool,
            PoolClass::Browser => &state.browser_pool,
        };

        match pool.submit(job).await {
            Ok(()) => {
                let url = url.clone();
                pending.push(async move {
                    rx.await.unwrap_or_else(|_| {
                        ExtractedResult::failure(
                            &url,
                            SourceType::Unknown,
                            "worker dropped the result channel",
                        )
                    })
                });
            }
            Err(failure) => results.push(failure),
        }
    }

    while let Some(result) = pending.next().await {
        let key = content_key(&result.url, max_chars);
        if result.processed_successfully {
            state
                .cache
                .set(&key, CachedValue::Result(result.clone()), state.content_cache_ttl)
                .await;
        } else if !result.transient_failure {
            // Permanent-looking failures are cached briefly so dead
            // URLs do not get hammered.
            state
                .cache
                .set(&key, CachedValue::Result(result.clone()), FAILURE_CACHE_TTL)
                .await;
        }
        results.push(result);
    }

    results
}
