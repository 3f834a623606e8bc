//! Reddit adapter against a mocked JSON endpoint (unauthenticated
//! path: the adapter fetches `<url>.json` from the post's own host).

use skimmer_extract::RedditAdapter;
use skimmer_types::SourceData;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter() -> RedditAdapter {
    RedditAdapter::new(
        reqwest::Client::new(),
        None,
        None,
        "skimmer-test/0.1".to_string(),
    )
}

fn comment(body: &str, replies: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "kind": "t1",
        "data": {
            "author": "someone",
            "score": 3,
            "body": body,
            "replies": replies,
        }
    })
}

#[tokio::test]
async fn post_with_nested_tree_flattens_depth_first() {
    let server = MockServer::start().await;

    let payload = serde_json::json!([
        {"data": {"children": [{"data": {
            "title": "Post title",
            "selftext": "Post body",
            "score": 42,
            "author": "op",
        }}]}},
        {"data": {"children": [
            comment("c1", serde_json::json!({"data": {"children": [
                comment("c1a", serde_json::json!("")),
                {"kind": "more", "data": {"children": ["abc"]}},
            ]}})),
            comment("c2", serde_json::json!("")),
        ]}},
    ]);

    Mock::given(method("GET"))
        .and(path("/r/x/comments/abc/y.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&server)
        .await;

    let url = format!("{}/r/x/comments/abc/y/", server.uri());
    let data = adapter().extract(&url, None).await.unwrap();

    match data {
        SourceData::RedditPost {
            post_title,
            post_body,
            score,
            author,
            comments,
        } => {
            assert_eq!(post_title, "Post title");
            assert_eq!(post_body, "Post body");
            assert_eq!(score, 42);
            assert_eq!(author, "op");
            let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
            assert_eq!(texts, vec!["c1", "c1a", "c2"]);
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn upstream_error_statuses_are_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/x/comments/gone/y.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/r/x/comments/gone/y", server.uri());
    let err = adapter().extract(&url, None).await.unwrap_err();
    assert!(err.to_string().contains("404"));
    assert!(err.is_likely_permanent());
}

#[tokio::test]
async fn search_urls_are_rejected() {
    let err = adapter()
        .extract("https://www.reddit.com/search?q=rust", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not supported"));
}
