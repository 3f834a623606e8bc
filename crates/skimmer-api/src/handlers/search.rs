//! `POST /search`: query → URL list → concurrent extraction.

use super::{process_urls, CancelOnDrop};
use crate::errors::ApiError;
use crate::models::{QueryDetails, SearchRequest, SearchResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use skimmer_cache::CachedValue;
use skimmer_types::{search_key, Endpoint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[tracing::instrument(name = "search", skip(state, request), fields(query = %request.query))]
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::validation("query must not be empty"));
    }
    let max_results = request.effective_max_results();

    let cancel = CancellationToken::new();
    let _guard = CancelOnDrop(cancel.clone());

    let key = search_key(&request.query);
    let urls = match state.cache.get(&key).await {
        Some(CachedValue::Urls(mut cached)) => {
            debug!(query = %request.query, "search cache hit");
            cached.truncate(max_results);
            cached
        }
        _ => {
            let urls = state
                .search
                .fetch(&request.query, max_results)
                .await
                .map_err(|e| ApiError::search(e.to_string()))?;
            state
                .cache
                .set(&key, CachedValue::Urls(urls.clone()), state.search_cache_ttl)
                .await;
            urls
        }
    };

    let results = process_urls(
        &state,
        &urls,
        Endpoint::Search,
        request.max_char_per_url,
        &cancel,
    )
    .await;

    info!(
        query = %request.query,
        requested = max_results,
        found = results.len(),
        "search completed"
    );

    Ok(Json(SearchResponse {
        query_details: QueryDetails {
            query: request.query,
            max_results_requested: max_results,
            actual_results_found: results.len(),
        },
        results,
        error: None,
    }))
}
