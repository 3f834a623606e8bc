//! Generic webpage extraction.
//!
//! Two paths share the same output shape: a plain HTTP fetch with
//! server-rendered HTML (the `/search` default), and a headless-browser
//! render for `/extract`, where JavaScript-built pages are expected.

use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use once_cell::sync::Lazy;
use reqwest::header::USER_AGENT;
use scraper::{Html, Node, Selector};
use serde::Deserialize;
use skimmer_fetch::random_desktop_user_agent;
use skimmer_headless::BrowserPool;
use skimmer_types::{truncate_to_chars, ExtractError, SourceData};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Element categories removed before text extraction.
const STRIPPED_ELEMENTS: [&str; 10] = [
    "script", "style", "noscript", "iframe", "nav", "footer", "header", "aside", "form", "menu",
];

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("static selector"));

/// In-page cleanup script for the JS path: strips non-content elements
/// and hands back the title plus the body's rendered text.
const CLEAN_PAGE_SCRIPT: &str = r#"
(() => {
    const strip = ['script', 'style', 'nav', 'header', 'footer', 'iframe', 'svg'];
    for (const tag of strip) {
        document.querySelectorAll(tag).forEach((el) => el.remove());
    }
    return {
        title: document.title || '',
        text: document.body ? document.body.innerText : '',
    };
})()
"#;

#[derive(Debug, Deserialize)]
struct RenderedPage {
    title: String,
    text: String,
}

/// Extracts titles and body text from ordinary web pages.
pub struct WebpageAdapter {
    client: reqwest::Client,
    pool: Arc<BrowserPool>,
}

impl WebpageAdapter {
    pub fn new(client: reqwest::Client, pool: Arc<BrowserPool>) -> Self {
        Self { client, pool }
    }

    /// Plain fetch-and-parse path; no JavaScript execution.
    pub async fn extract_static(
        &self,
        url: &str,
        max_chars: Option<usize>,
    ) -> Result<SourceData, ExtractError> {
        let response = self
            .client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .header(USER_AGENT, random_desktop_user_agent())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: format!("fetching {}", url),
            });
        }

        let html = response.text().await?;
        let (title, mut text) = parse_page(&html);

        if text.is_empty() && title.is_empty() {
            return Err(ExtractError::ContentShape(
                "page produced no extractable text".to_string(),
            ));
        }

        if let Some(cap) = max_chars {
            truncate_to_chars(&mut text, cap);
        }

        Ok(SourceData::Webpage {
            title,
            text_content: text,
        })
    }

    /// Headless-render path for JavaScript-built pages.
    pub async fn extract_js(
        &self,
        url: &str,
        max_chars: Option<usize>,
    ) -> Result<SourceData, ExtractError> {
        let guard = self
            .pool
            .acquire()
            .await
            .map_err(|e| ExtractError::Request(format!("browser pool: {}", e)))?;

        let result = tokio::time::timeout(RENDER_TIMEOUT, async {
            let page = guard
                .new_page("about:blank")
                .await
                .map_err(|e| ExtractError::Request(format!("opening page: {}", e)))?;

            let outcome = async {
                page.set_user_agent(SetUserAgentOverrideParams::new(
                    random_desktop_user_agent(),
                ))
                .await
                .map_err(|e| ExtractError::Request(format!("setting user agent: {}", e)))?;

                page.goto(url)
                    .await
                    .map_err(|e| ExtractError::Request(format!("navigating: {}", e)))?;
                page.wait_for_navigation()
                    .await
                    .map_err(|e| ExtractError::Request(format!("waiting for load: {}", e)))?;

                let rendered: RenderedPage = page
                    .evaluate(CLEAN_PAGE_SCRIPT)
                    .await
                    .map_err(|e| ExtractError::Request(format!("evaluating page: {}", e)))?
                    .into_value()
                    .map_err(|e| {
                        ExtractError::ContentShape(format!("render result: {}", e))
                    })?;

                Ok::<RenderedPage, ExtractError>(rendered)
            }
            .await;

            if let Err(e) = page.close().await {
                debug!(url = %url, error = %e, "page close failed");
            }
            outcome
        })
        .await
        .map_err(|_| ExtractError::Timeout(format!("rendering {}", url)))??;

        let mut text = normalize_whitespace(&result.text);
        if text.is_empty() && result.title.is_empty() {
            return Err(ExtractError::ContentShape(
                "rendered page produced no text".to_string(),
            ));
        }

        if let Some(cap) = max_chars {
            truncate_to_chars(&mut text, cap);
        }

        Ok(SourceData::Webpage {
            title: result.title,
            text_content: text,
        })
    }
}

/// Parse server-rendered HTML into (title, cleaned body text).
pub fn parse_page(html: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    let text = document
        .select(&BODY_SELECTOR)
        .next()
        .map(|body| {
            let mut collected = String::new();
            collect_text(body, &mut collected);
            normalize_whitespace(&collected)
        })
        .unwrap_or_default();

    (title, text)
}

/// Depth-first text collection that skips stripped subtrees.
fn collect_text(element: scraper::ElementRef<'_>, out: &mut String) {
    if STRIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_element) = scraper::ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
