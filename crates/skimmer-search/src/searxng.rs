//! SearXNG aggregator backend.
//!
//! Pages 1..=PAGE_CAP are fetched concurrently. Accumulation
//! early-stops once 2x `max_results` candidates exist; the merged set
//! is deduped, stably sorted by score descending and trimmed.

use crate::{merge_and_rank, SearchBackend, SearchError, SearchHit, SearchProvider};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const PAGE_CAP: usize = 5;

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngHit>,
}

#[derive(Debug, Deserialize)]
struct SearxngHit {
    url: String,
    #[serde(default)]
    score: f64,
}

/// Self-hosted SearXNG instance client.
pub struct SearxngProvider {
    base_url: String,
    client: reqwest::Client,
}

impl SearxngProvider {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    async fn fetch_page(&self, query: &str, page: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("pageno", &page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Backend {
                backend: SearchBackend::Searxng,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SearchError::BackendStatus {
                backend: SearchBackend::Searxng,
                status: response.status().as_u16(),
            });
        }

        let parsed: SearxngResponse =
            response.json().await.map_err(|e| SearchError::Backend {
                backend: SearchBackend::Searxng,
                message: format!("invalid json: {}", e),
            })?;

        Ok(parsed
            .results
            .into_iter()
            .map(|hit| SearchHit {
                url: hit.url,
                score: hit.score,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for SearxngProvider {
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let pages = futures::future::join_all(
            (1..=PAGE_CAP).map(|page| self.fetch_page(query, page)),
        )
        .await;

        let target = max_results * 2;
        let mut candidates: Vec<SearchHit> = Vec::new();
        let mut last_error = None;

        // Pages come back in page order; stop accumulating once enough
        // candidates exist so deep pages cannot displace early ones.
        for (index, page) in pages.into_iter().enumerate() {
            match page {
                Ok(hits) => {
                    debug!(page = index + 1, count = hits.len(), "searxng page fetched");
                    candidates.extend(hits);
                    if candidates.len() >= target {
                        break;
                    }
                }
                Err(e) => {
                    warn!(page = index + 1, error = %e, "searxng page failed");
                    last_error = Some(e);
                }
            }
        }

        if candidates.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
            return Ok(Vec::new());
        }

        Ok(merge_and_rank(candidates, max_results))
    }

    fn backend_type(&self) -> SearchBackend {
        SearchBackend::Searxng
    }
}
