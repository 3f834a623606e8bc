//! # Skimmer Search
//!
//! Search provider abstraction over two backends:
//!
//! - **SearXNG**: self-hosted aggregator; pages are fetched
//!   concurrently, merged, sorted by score and trimmed.
//! - **Serper**: hosted Google-search API; results come back in
//!   provider order.
//!
//! [`SearchClient`] pairs a primary provider with an optional fallback:
//! if the primary errors or returns nothing, the fallback runs before
//! the whole search fails with [`SearchError::NoResults`].

pub mod searxng;
pub mod serper;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub use searxng::SearxngProvider;
pub use serper::SerperProvider;

/// Search failures surfaced to the HTTP layer.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search query cannot be empty")]
    EmptyQuery,

    #[error("{backend} request failed: {message}")]
    Backend { backend: SearchBackend, message: String },

    #[error("{backend} returned status {status}")]
    BackendStatus { backend: SearchBackend, status: u16 },

    #[error("no search results from any configured engine")]
    NoResults,
}

/// Available search backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    Searxng,
    Serper,
}

impl fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchBackend::Searxng => write!(f, "searxng"),
            SearchBackend::Serper => write!(f, "serper"),
        }
    }
}

/// One scored search hit. Serper results carry no score and keep the
/// provider's ordering via rank.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub score: f64,
}

/// A search backend able to produce an ordered URL list for a query.
///
/// Implementations are thread-safe and own their error recovery; the
/// caller only distinguishes "gave me URLs" from "did not".
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fetch up to `max_results` URLs for `query`, best first.
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError>;

    fn backend_type(&self) -> SearchBackend;
}

/// Primary/fallback pair over [`SearchProvider`]s.
pub struct SearchClient {
    primary: Arc<dyn SearchProvider>,
    fallback: Option<Arc<dyn SearchProvider>>,
}

impl SearchClient {
    pub fn new(
        primary: Arc<dyn SearchProvider>,
        fallback: Option<Arc<dyn SearchProvider>>,
    ) -> Self {
        // A fallback identical to the primary would only repeat the
        // same failure.
        let fallback = fallback
            .filter(|candidate| candidate.backend_type() != primary.backend_type());
        Self { primary, fallback }
    }

    /// Resolve `query` to an ordered URL list.
    ///
    /// `max_results <= 0` (pre-coerced by the handler to 10) never
    /// reaches here; the list is always trimmed to `max_results`.
    pub async fn fetch(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        match self.primary.fetch(query, max_results).await {
            Ok(urls) if !urls.is_empty() => {
                info!(
                    backend = %self.primary.backend_type(),
                    count = urls.len(),
                    "primary search engine returned results"
                );
                return Ok(urls);
            }
            Ok(_) => {
                warn!(backend = %self.primary.backend_type(), "primary search engine returned no results");
            }
            Err(e) => {
                warn!(backend = %self.primary.backend_type(), error = %e, "primary search engine failed");
            }
        }

        if let Some(fallback) = &self.fallback {
            match fallback.fetch(query, max_results).await {
                Ok(urls) if !urls.is_empty() => {
                    info!(
                        backend = %fallback.backend_type(),
                        count = urls.len(),
                        "fallback search engine returned results"
                    );
                    return Ok(urls);
                }
                Ok(_) => {
                    warn!(backend = %fallback.backend_type(), "fallback search engine returned no results");
                }
                Err(e) => {
                    warn!(backend = %fallback.backend_type(), error = %e, "fallback search engine failed");
                }
            }
        }

        Err(SearchError::NoResults)
    }
}

/// Merge hits from several pages: dedupe by URL keeping the higher
/// score, stable-sort by score descending, trim to `max_results`.
pub(crate) fn merge_and_rank(hits: Vec<SearchHit>, max_results: usize) -> Vec<String> {
    let mut best: Vec<SearchHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        match best.iter_mut().find(|seen| seen.url == hit.url) {
            Some(seen) => {
                if hit.score > seen.score {
                    seen.score = hit.score;
                }
            }
            None => best.push(hit),
        }
    }

    best.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    best.truncate(max_results);
    best.into_iter().map(|hit| hit.url).collect()
}
