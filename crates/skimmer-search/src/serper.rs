//! Serper.dev hosted search backend.
//!
//! The API accepts `num` only in supported increments; we round the
//! requested count up to the next of 10/20/30 and trim client-side.

use crate::{SearchBackend, SearchError, SearchProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Round a requested result count up to the next API-supported `num`.
fn supported_num(max_results: usize) -> usize {
    match max_results {
        0..=10 => 10,
        11..=20 => 20,
        _ => 30,
    }
}

/// Hosted search API client.
pub struct SerperProvider {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
}

impl SerperProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            client,
        }
    }

    fn parse_response(&self, response: Value, max_results: usize) -> Vec<String> {
        let mut urls = Vec::new();
        if let Some(organic) = response.get("organic").and_then(|v| v.as_array()) {
            for result in organic {
                if let Some(link) = result.get("link").and_then(|v| v.as_str()) {
                    urls.push(link.to_string());
                    if urls.len() >= max_results {
                        break;
                    }
                }
            }
        }
        urls
    }
}

#[async_trait]
impl SearchProvider for SerperProvider {
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let num = supported_num(max_results);
        let body = serde_json::json!({ "q": query, "num": num });

        debug!(num, "querying serper");

        let response = self
            .client
            .post(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Backend {
                backend: SearchBackend::Serper,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SearchError::BackendStatus {
                backend: SearchBackend::Serper,
                status: response.status().as_u16(),
            });
        }

        let parsed: Value = response.json().await.map_err(|e| SearchError::Backend {
            backend: SearchBackend::Serper,
            message: format!("invalid json: {}", e),
        })?;

        Ok(self.parse_response(parsed, max_results))
    }

    fn backend_type(&self) -> SearchBackend {
        SearchBackend::Serper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_rounds_up_to_supported_increment() {
        assert_eq!(supported_num(1), 10);
        assert_eq!(supported_num(10), 10);
        assert_eq!(supported_num(11), 20);
        assert_eq!(supported_num(25), 30);
        assert_eq!(supported_num(100), 30);
    }

    #[test]
    fn parse_trims_client_side() {
        let provider = SerperProvider::new("k", "https://api", reqwest::Client::new());
        let response = serde_json::json!({
            "organic": [
                {"link": "https://a", "title": "A"},
                {"link": "https://b", "title": "B"},
                {"link": "https://c", "title": "C"},
            ]
        });
        assert_eq!(
            provider.parse_response(response, 2),
            vec!["https://a", "https://b"]
        );
    }
}
