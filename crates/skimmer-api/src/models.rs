//! Request and response payloads.
//!
//! These shapes are a wire contract; key names must not drift.

use serde::{Deserialize, Serialize};
use skimmer_types::ExtractedResult;

pub const DEFAULT_MAX_RESULTS: i64 = 10;
pub const MAX_RESULTS_CAP: i64 = 50;
pub const MAX_EXTRACT_URLS: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<i64>,
    #[serde(default)]
    pub max_char_per_url: Option<usize>,
}

impl SearchRequest {
    /// Requested result count with defaulting and clamping: zero or
    /// negative coerces to the default.
    pub fn effective_max_results(&self) -> usize {
        let requested = self.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let coerced = if requested <= 0 {
            DEFAULT_MAX_RESULTS
        } else {
            requested.min(MAX_RESULTS_CAP)
        };
        coerced as usize
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryDetails {
    pub query: String,
    pub max_results_requested: usize,
    pub actual_results_found: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query_details: QueryDetails,
    pub results: Vec<ExtractedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub max_char_per_url: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetails {
    pub urls_requested: usize,
    pub urls_processed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractResponse {
    pub request_details: RequestDetails,
    pub results: Vec<ExtractedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}
