//! PDF adapter gating: size cap and content sniffing happen before any
//! external tool is involved.

use skimmer_extract::PdfAdapter;
use skimmer_types::ExtractError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn html_body_yields_the_not_pdf_sentinel() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<!DOCTYPE html><html><body>404 page</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let adapter = PdfAdapter::new(reqwest::Client::new());
    let err = adapter
        .extract(&format!("{}/doc.pdf", server.uri()), None)
        .await
        .unwrap_err();

    match err {
        ExtractError::NotPdf { detected } => assert_eq!(detected, "html"),
        other => panic!("expected NotPdf, got {:?}", other),
    }
}

#[tokio::test]
async fn zip_body_is_detected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"PK\x03\x04somezipdata".to_vec(), "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let adapter = PdfAdapter::new(reqwest::Client::new());
    let err = adapter
        .extract(&format!("{}/doc.pdf", server.uri()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::NotPdf { ref detected } if detected == "zip"));
}

#[tokio::test]
async fn oversized_content_length_is_rejected_before_download() {
    let server = MockServer::start().await;

    // 21 MiB body; the Content-Length gate fires before any sniffing.
    let mut body = b"%PDF-1.7\n".to_vec();
    body.resize(21 * 1024 * 1024, 0);

    Mock::given(method("GET"))
        .and(path("/big.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/pdf"))
        .mount(&server)
        .await;

    let adapter = PdfAdapter::new(reqwest::Client::new());
    let err = adapter
        .extract(&format!("{}/big.pdf", server.uri()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::TooLarge { .. }));
}

#[tokio::test]
async fn upstream_404_is_surfaced_as_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = PdfAdapter::new(reqwest::Client::new());
    let err = adapter
        .extract(&format!("{}/missing.pdf", server.uri()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::UpstreamStatus { status: 404, .. }));
}
