//! Handler-level tests over the assembled router with stub processors
//! and a mocked search backend. No browser is involved: the worker
//! seam takes a stub and the cache is the in-memory backend.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use skimmer_api::state::AppState;
use skimmer_api::build_router;
use skimmer_cache::{Cache, ShardedCache};
use skimmer_search::{SearchClient, SearxngProvider, SerperProvider};
use skimmer_types::{Endpoint, ExtractError, ExtractedResult, SourceData, SourceType};
use skimmer_workers::{JobProcessor, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StubProcessor {
    calls: AtomicUsize,
}

impl StubProcessor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl JobProcessor for StubProcessor {
    async fn process(
        &self,
        url: &str,
        _endpoint: Endpoint,
        _max_chars: Option<usize>,
    ) -> ExtractedResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ExtractedResult::success(
            url,
            SourceType::Webpage,
            SourceData::Webpage {
                title: "stub".to_string(),
                text_content: format!("content of {}", url),
            },
        )
    }
}

fn state_with(search_client: SearchClient, processor: Arc<dyn JobProcessor>) -> AppState {
    let cache: Arc<dyn Cache> = ShardedCache::with_shards(16);
    let http_pool = Arc::new(WorkerPool::start("http-test", 4, processor.clone()));
    let browser_pool = Arc::new(WorkerPool::start("browser-test", 2, processor));
    AppState::new(
        cache,
        Arc::new(search_client),
        http_pool,
        browser_pool,
        Duration::from_secs(60),
        Duration::from_secs(60),
    )
}

fn searxng_client(uri: &str) -> SearchClient {
    SearchClient::new(
        Arc::new(SearxngProvider::new(uri, reqwest::Client::new())),
        None,
    )
}

async fn send_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_status_and_timestamp() {
    let state = state_with(searxng_client("http://127.0.0.1:1"), StubProcessor::new());
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["status"], "healthy");
    assert!(value["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn search_rejects_empty_query() {
    let state = state_with(searxng_client("http://127.0.0.1:1"), StubProcessor::new());
    let (status, body) = send_json(
        build_router(state),
        "/search",
        serde_json::json!({"query": "   "}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn search_returns_score_ordered_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageno", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                {"url": "https://a", "score": 0.5},
                {"url": "https://b", "score": 0.9},
                {"url": "https://c", "score": 0.7},
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
        .mount(&server)
        .await;

    let state = state_with(searxng_client(&server.uri()), StubProcessor::new());
    let (status, body) = send_json(
        build_router(state),
        "/search",
        serde_json::json!({"query": "foo", "max_results": 2}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query_details"]["query"], "foo");
    assert_eq!(body["query_details"]["max_results_requested"], 2);
    assert_eq!(body["query_details"]["actual_results_found"], 2);

    // Aggregation is completion-ordered; the URL set is what matters.
    let urls: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls.len(), 2);
    assert!(urls.contains(&"https://b"));
    assert!(urls.contains(&"https://c"));
}

#[tokio::test]
async fn search_uses_fallback_when_primary_times_out() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let working = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/serper"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "organic": [{"link": "https://u"}]
        })))
        .mount(&working)
        .await;

    let client = SearchClient::new(
        Arc::new(SearxngProvider::new(broken.uri(), reqwest::Client::new())),
        Some(Arc::new(SerperProvider::new(
            "key",
            format!("{}/serper", working.uri()),
            reqwest::Client::new(),
        ))),
    );

    let state = state_with(client, StubProcessor::new());
    let (status, body) = send_json(
        build_router(state),
        "/search",
        serde_json::json!({"query": "x"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none());
    assert_eq!(body["results"][0]["url"], "https://u");
}

#[tokio::test]
async fn search_fails_with_500_when_no_engine_produces_urls() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let state = state_with(searxng_client(&broken.uri()), StubProcessor::new());
    let (status, body) = send_json(
        build_router(state),
        "/search",
        serde_json::json!({"query": "x"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "search_error");
}

#[tokio::test]
async fn extract_rejects_empty_and_oversized_lists() {
    let state = state_with(searxng_client("http://127.0.0.1:1"), StubProcessor::new());
    let app = build_router(state);

    let (status, _) = send_json(app.clone(), "/extract", serde_json::json!({"urls": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let urls: Vec<String> = (0..21).map(|i| format!("https://example.com/{}", i)).collect();
    let (status, body) = send_json(app, "/extract", serde_json::json!({"urls": urls})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("too many urls"));
}

#[tokio::test]
async fn extract_produces_one_result_per_url() {
    let state = state_with(searxng_client("http://127.0.0.1:1"), StubProcessor::new());
    let urls = vec![
        "https://example.com/a",
        "https://example.com/b",
        "https://example.com/c",
    ];
    let (status, body) = send_json(
        build_router(state),
        "/extract",
        serde_json::json!({"urls": urls}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request_details"]["urls_requested"], 3);
    assert_eq!(body["request_details"]["urls_processed"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
    for result in body["results"].as_array().unwrap() {
        assert_eq!(result["processed_successfully"], true);
        assert_eq!(result["source_type"], "webpage");
    }
}

#[tokio::test]
async fn repeated_extracts_hit_the_content_cache() {
    let processor = StubProcessor::new();
    let state = state_with(
        searxng_client("http://127.0.0.1:1"),
        processor.clone() as Arc<dyn JobProcessor>,
    );
    let app = build_router(state);

    let request = serde_json::json!({"urls": ["https://example.com/cached"]});
    let (status, _) = send_json(app.clone(), "/extract", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);

    let (status, body) = send_json(app, "/extract", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1, "second hit must come from cache");
    assert_eq!(body["results"][0]["processed_successfully"], true);
}

/// Fails every call with a configurable error class.
struct FailingProcessor {
    calls: AtomicUsize,
    transient: bool,
}

impl FailingProcessor {
    fn new(transient: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            transient,
        })
    }
}

#[async_trait]
impl JobProcessor for FailingProcessor {
    async fn process(
        &self,
        url: &str,
        _endpoint: Endpoint,
        _max_chars: Option<usize>,
    ) -> ExtractedResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let error = if self.transient {
            ExtractError::Timeout("upstream too slow".to_string())
        } else {
            ExtractError::UpstreamStatus {
                status: 404,
                message: "gone".to_string(),
            }
        };
        ExtractedResult::failure_typed(url, SourceType::Webpage, &error)
    }
}

#[tokio::test]
async fn permanent_failures_are_negatively_cached() {
    let processor = FailingProcessor::new(false);
    let state = state_with(
        searxng_client("http://127.0.0.1:1"),
        processor.clone() as Arc<dyn JobProcessor>,
    );
    let app = build_router(state);

    let request = serde_json::json!({"urls": ["https://example.com/dead"]});
    let (status, body) = send_json(app.clone(), "/extract", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["processed_successfully"], false);
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);

    // The 404-style failure was cached; the dead URL is not re-fetched.
    let (_, body) = send_json(app, "/extract", request).await;
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(body["results"][0]["processed_successfully"], false);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let processor = FailingProcessor::new(true);
    let state = state_with(
        searxng_client("http://127.0.0.1:1"),
        processor.clone() as Arc<dyn JobProcessor>,
    );
    let app = build_router(state);

    let request = serde_json::json!({"urls": ["https://example.com/slow"]});
    let (_, _) = send_json(app.clone(), "/extract", request.clone()).await;
    let (_, _) = send_json(app, "/extract", request).await;

    // Timeouts are never cached, so both requests did the work.
    assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn per_cap_cache_entries_are_distinct() {
    let processor = StubProcessor::new();
    let state = state_with(
        searxng_client("http://127.0.0.1:1"),
        processor.clone() as Arc<dyn JobProcessor>,
    );
    let app = build_router(state);

    let url = "https://example.com/capped";
    let (_, _) = send_json(
        app.clone(),
        "/extract",
        serde_json::json!({"urls": [url], "max_char_per_url": 100}),
    )
    .await;
    let (_, _) = send_json(
        app,
        "/extract",
        serde_json::json!({"urls": [url], "max_char_per_url": 200}),
    )
    .await;

    // Different caps are distinct cache keys, so both runs did work.
    assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
}
