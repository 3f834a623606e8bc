//! `POST /extract`: explicit URL list → concurrent extraction with the
//! JS-capable path forced for generic hosts.

use super::{process_urls, CancelOnDrop};
use crate::errors::ApiError;
use crate::models::{ExtractRequest, ExtractResponse, RequestDetails, MAX_EXTRACT_URLS};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use skimmer_types::Endpoint;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tracing::instrument(name = "extract", skip(state, request), fields(urls = request.urls.len()))]
pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    if request.urls.is_empty() {
        return Err(ApiError::validation("urls must not be empty"));
    }
    if request.urls.len() > MAX_EXTRACT_URLS {
        return Err(ApiError::validation(format!(
            "too many urls: {} (max {})",
            request.urls.len(),
            MAX_EXTRACT_URLS
        )));
    }

    let cancel = CancellationToken::new();
    let _guard = CancelOnDrop(cancel.clone());

    let results = process_urls(
        &state,
        &request.urls,
        Endpoint::Extract,
        request.max_char_per_url,
        &cancel,
    )
    .await;

    info!(
        requested = request.urls.len(),
        processed = results.len(),
        "extract completed"
    );

    Ok(Json(ExtractResponse {
        request_details: RequestDetails {
            urls_requested: request.urls.len(),
            urls_processed: results.len(),
        },
        results,
        error: None,
    }))
}
