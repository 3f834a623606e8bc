//! Provider behavior against mocked HTTP backends.

use skimmer_search::{SearchClient, SearchError, SearxngProvider, SerperProvider};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn searxng_page(results: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": results }))
}

#[tokio::test]
async fn searxng_sorts_by_score_and_trims() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageno", "1"))
        .respond_with(searxng_page(serde_json::json!([
            {"url": "https://a", "score": 0.5},
            {"url": "https://b", "score": 0.9},
            {"url": "https://c", "score": 0.7},
        ])))
        .mount(&server)
        .await;
    // Remaining pages are empty.
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(searxng_page(serde_json::json!([])))
        .mount(&server)
        .await;

    let provider = SearxngProvider::new(server.uri(), reqwest::Client::new());
    let urls = skimmer_search::SearchProvider::fetch(&provider, "foo", 2)
        .await
        .unwrap();

    assert_eq!(urls, vec!["https://b", "https://c"]);
}

#[tokio::test]
async fn searxng_merges_pages_and_dedupes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageno", "1"))
        .respond_with(searxng_page(serde_json::json!([
            {"url": "https://a", "score": 0.2},
            {"url": "https://b", "score": 0.4},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageno", "2"))
        .respond_with(searxng_page(serde_json::json!([
            {"url": "https://a", "score": 0.8},
            {"url": "https://c", "score": 0.6},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(searxng_page(serde_json::json!([])))
        .mount(&server)
        .await;

    let provider = SearxngProvider::new(server.uri(), reqwest::Client::new());
    let urls = skimmer_search::SearchProvider::fetch(&provider, "foo", 10)
        .await
        .unwrap();

    // a keeps its higher score from page 2.
    assert_eq!(urls, vec!["https://a", "https://c", "https://b"]);
}

#[tokio::test]
async fn serper_parses_links_in_provider_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "organic": [
                {"link": "https://first", "title": "1"},
                {"link": "https://second", "title": "2"},
                {"link": "https://third", "title": "3"},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = SerperProvider::new(
        "test-key",
        format!("{}/search", server.uri()),
        reqwest::Client::new(),
    );
    let urls = skimmer_search::SearchProvider::fetch(&provider, "foo", 2)
        .await
        .unwrap();

    assert_eq!(urls, vec!["https://first", "https://second"]);
}

#[tokio::test]
async fn client_falls_back_when_primary_fails() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let working = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "organic": [{"link": "https://u"}]
        })))
        .mount(&working)
        .await;

    let client = SearchClient::new(
        Arc::new(SearxngProvider::new(broken.uri(), reqwest::Client::new())),
        Some(Arc::new(SerperProvider::new(
            "key",
            format!("{}/search", working.uri()),
            reqwest::Client::new(),
        ))),
    );

    let urls = client.fetch("x", 10).await.unwrap();
    assert_eq!(urls, vec!["https://u"]);
}

#[tokio::test]
async fn client_reports_no_results_when_everything_fails() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let client = SearchClient::new(
        Arc::new(SearxngProvider::new(broken.uri(), reqwest::Client::new())),
        None,
    );

    assert!(matches!(
        client.fetch("x", 10).await,
        Err(SearchError::NoResults)
    ));
}

#[tokio::test]
async fn empty_query_is_rejected_before_any_request() {
    let client = SearchClient::new(
        Arc::new(SearxngProvider::new(
            "http://127.0.0.1:1",
            reqwest::Client::new(),
        )),
        None,
    );
    assert!(matches!(
        client.fetch("   ", 10).await,
        Err(SearchError::EmptyQuery)
    ));
}
