//! YouTube partial-success semantics and the transcript resolver
//! against a mocked transcript microservice.

use skimmer_extract::YoutubeAdapter;
use skimmer_types::SourceData;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// No API key: metadata and comments fail fast with a credentials
/// error, transcript comes from the service, and the result still
/// counts as a success with the sub-errors joined.
#[tokio::test]
async fn transcript_alone_is_a_partial_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get_transcript"))
        .and(body_partial_json(serde_json::json!({"video_id": "dQw4w9WgXcQ"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transcript": "hello from the transcript"
        })))
        .mount(&server)
        .await;

    let adapter = YoutubeAdapter::new(
        reqwest::Client::new(),
        None,
        vec!["ytapi".to_string()],
        Some(server.uri()),
    );

    let (data, errors) = adapter.extract_video(VIDEO_URL, None).await.unwrap();

    match data {
        SourceData::Youtube {
            transcript,
            title,
            comments,
            ..
        } => {
            assert_eq!(transcript, "hello from the transcript");
            assert!(title.is_empty());
            assert!(comments.is_empty());
        }
        other => panic!("unexpected payload: {:?}", other),
    }

    // metadata and comments both failed on missing credentials
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.contains("YOUTUBE_API_KEY")));
}

#[tokio::test]
async fn all_sub_operations_failing_fails_the_video() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get_transcript"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "detail": "no transcript available"
        })))
        .mount(&server)
        .await;

    let adapter = YoutubeAdapter::new(
        reqwest::Client::new(),
        None,
        vec!["ytapi".to_string()],
        Some(server.uri()),
    );

    let err = adapter.extract_video(VIDEO_URL, None).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("no content for video"));
    assert!(message.contains("no transcript available"));
}

#[tokio::test]
async fn transcript_truncation_applies_before_comments() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get_transcript"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transcript": "0123456789ABCDEF"
        })))
        .mount(&server)
        .await;

    let adapter = YoutubeAdapter::new(
        reqwest::Client::new(),
        None,
        vec!["ytapi".to_string()],
        Some(server.uri()),
    );

    let (data, _) = adapter.extract_video(VIDEO_URL, Some(10)).await.unwrap();
    match data {
        SourceData::Youtube { transcript, .. } => assert_eq!(transcript, "0123456789"),
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn unknown_transcript_methods_are_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get_transcript"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transcript": "resolved by the second method"
        })))
        .mount(&server)
        .await;

    let adapter = YoutubeAdapter::new(
        reqwest::Client::new(),
        None,
        vec!["bogus".to_string(), "ytapi".to_string()],
        Some(server.uri()),
    );

    let (data, _) = adapter.extract_video(VIDEO_URL, None).await.unwrap();
    match data {
        SourceData::Youtube { transcript, .. } => {
            assert_eq!(transcript, "resolved by the second method");
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}
