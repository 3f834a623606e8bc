//! Twitter extraction.
//!
//! Public API access is gone, so the adapter drives an authenticated
//! browser session and captures the site's own `TweetDetail` GraphQL
//! response in flight. Each request walks an explicit state machine:
//!
//! 1. **Probe**: restore cookies and navigate to the home timeline; a
//!    non-home landing URL means the session is stale.
//! 2. **Login**: interactive credential flow; only reached when the
//!    probe fails or no cookie file exists.
//! 3. **Save**: persist fresh cookies after a successful login.
//! 4. **Fetch**: navigate to the tweet with a response listener keyed
//!    on `TweetDetail`, racing capture against stream loss and a
//!    timeout.
//!
//! Profile URLs take a shorter path: wait for rendered articles,
//! collect the first five `/status/` links and fan out single-tweet
//! extractions.

mod cookies;
mod parse;

pub use cookies::{CookieStore, StoredCookie};
pub use parse::{parse_tweet_detail, ParsedConversation};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EventResponseReceived, GetResponseBodyParams, SetUserAgentOverrideParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use skimmer_fetch::random_desktop_user_agent;
use skimmer_headless::BrowserPool;
use skimmer_types::{CharBudget, ExtractError, ProfileTweet, SourceData};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

const HOME_URL: &str = "https://x.com/home";
const LOGIN_URL: &str = "https://x.com/i/flow/login";

/// Overall budget for one Twitter extraction.
const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(120);
/// Session probe navigation budget.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// How long to wait for the `TweetDetail` response after navigation.
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);
/// Element polling budget during the login flow.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(20);

const PROFILE_TWEET_LIMIT: usize = 5;

/// Collects up to five unique tweet permalinks in DOM order.
const COLLECT_STATUS_LINKS: &str = r#"
(() => {
    const links = [];
    const seen = new Set();
    for (const a of document.querySelectorAll('article a[href*="/status/"]')) {
        const href = a.getAttribute('href') || '';
        if (!/^\/[^/]+\/status\/\d+$/.test(href) || seen.has(href)) continue;
        seen.add(href);
        links.push('https://x.com' + href);
        if (links.length >= 5) break;
    }
    return links;
})()
"#;

/// Per-request session state. Transitions are driven by observable
/// events only: the post-navigation URL, element visibility, and the
/// captured response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Probe,
    Login,
    Fetch,
}

/// Browser-driven Twitter adapter.
pub struct TwitterAdapter {
    pool: Arc<BrowserPool>,
    username: Option<String>,
    password: Option<String>,
    cookies: CookieStore,
}

impl TwitterAdapter {
    pub fn new(
        pool: Arc<BrowserPool>,
        username: Option<String>,
        password: Option<String>,
        cookie_file: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            pool,
            username,
            password,
            cookies: CookieStore::new(cookie_file),
        }
    }

    /// Extract a single tweet with its replies.
    pub async fn extract_tweet(
        &self,
        url: &str,
        max_chars: Option<usize>,
    ) -> Result<SourceData, ExtractError> {
        let conversation = self.fetch_conversation(url).await?;
        Ok(conversation_to_data(conversation, max_chars))
    }

    /// Extract a profile: the first five tweets linked from the
    /// rendered timeline, fetched concurrently. Returns the payload
    /// plus the errors of sub-extractions that failed.
    pub async fn extract_profile(
        &self,
        url: &str,
        max_chars: Option<usize>,
    ) -> Result<(SourceData, Vec<String>), ExtractError> {
        let links = self.collect_profile_links(url).await?;
        if links.is_empty() {
            return Err(ExtractError::ContentShape(format!(
                "no tweet links found on profile {}",
                url
            )));
        }

        let fetched = futures::future::join_all(links.iter().map(|link| async move {
            (link.clone(), self.fetch_conversation(link).await)
        }))
        .await;

        let mut latest_tweets = Vec::new();
        let mut errors = Vec::new();
        for (link, outcome) in fetched {
            match outcome {
                Ok(conversation) => latest_tweets.push(ProfileTweet {
                    url: link,
                    data: Box::new(conversation_to_data(conversation, max_chars)),
                }),
                Err(e) => errors.push(format!("{}: {}", link, e)),
            }
        }

        if latest_tweets.is_empty() {
            return Err(ExtractError::ContentShape(format!(
                "all profile tweets failed: {}",
                errors.join("; ")
            )));
        }

        Ok((
            SourceData::TwitterProfile {
                profile_url: url.to_string(),
                latest_tweets,
            },
            errors,
        ))
    }

    async fn fetch_conversation(&self, url: &str) -> Result<ParsedConversation, ExtractError> {
        let guard = self
            .pool
            .acquire()
            .await
            .map_err(|e| ExtractError::Request(format!("browser pool: {}", e)))?;
        let page = guard
            .new_page("about:blank")
            .await
            .map_err(|e| ExtractError::Request(format!("opening page: {}", e)))?;

        let outcome = timeout(EXTRACTION_TIMEOUT, self.drive(&page, url)).await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "page close failed");
        }

        outcome.map_err(|_| ExtractError::Timeout(format!("extracting {}", url)))?
    }

    /// Run the state machine to a captured conversation.
    async fn drive(&self, page: &Page, tweet_url: &str) -> Result<ParsedConversation, ExtractError> {
        if let Err(e) = page
            .set_user_agent(SetUserAgentOverrideParams::new(random_desktop_user_agent()))
            .await
        {
            debug!(error = %e, "setting user agent failed");
        }

        let mut state = SessionState::Probe;
        loop {
            state = match state {
                SessionState::Probe => {
                    if self.probe_session(page).await {
                        debug!("session probe succeeded");
                        SessionState::Fetch
                    } else {
                        debug!("session probe failed, logging in");
                        SessionState::Login
                    }
                }
                SessionState::Login => {
                    self.login(page).await?;
                    self.save_cookies(page).await?;
                    SessionState::Fetch
                }
                SessionState::Fetch => return self.capture_tweet(page, tweet_url).await,
            };
        }
    }

    /// Load cookies and check whether they still authenticate: navigate
    /// home and require the final URL to actually be the home timeline.
    async fn probe_session(&self, page: &Page) -> bool {
        let Some(stored) = self.cookies.load().await else {
            return false;
        };
        if stored.is_empty() {
            return false;
        }

        let mut params = Vec::with_capacity(stored.len());
        for cookie in &stored {
            match CookieParam::builder()
                .name(&cookie.name)
                .value(&cookie.value)
                .domain(&cookie.domain)
                .path(&cookie.path)
                .secure(cookie.secure)
                .http_only(cookie.http_only)
                .build()
            {
                Ok(param) => params.push(param),
                Err(e) => {
                    warn!(cookie = %cookie.name, error = %e, "skipping malformed stored cookie");
                }
            }
        }
        if params.is_empty() || page.set_cookies(params).await.is_err() {
            return false;
        }

        let navigated = timeout(PROBE_TIMEOUT, async {
            page.goto(HOME_URL).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;

        match navigated {
            Ok(Ok(())) => self
                .current_url(page)
                .await
                .map(|url| url.contains("/home"))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Interactive login: username, `Next`, password, `Log in`, then
    /// require a home or status URL.
    async fn login(&self, page: &Page) -> Result<(), ExtractError> {
        let username = self
            .username
            .as_deref()
            .ok_or(ExtractError::MissingCredentials("TWITTER_USERNAME"))?;
        let password = self
            .password
            .as_deref()
            .ok_or(ExtractError::MissingCredentials("TWITTER_PASSWORD"))?;

        info!("starting twitter login flow");

        page.goto(LOGIN_URL)
            .await
            .map_err(|e| ExtractError::Request(format!("opening login page: {}", e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ExtractError::Request(format!("loading login page: {}", e)))?;

        let username_input = self
            .wait_for_element(page, r#"input[autocomplete="username"]"#)
            .await?;
        username_input
            .click()
            .await
            .map_err(|e| ExtractError::LoginFailed(format!("focusing username: {}", e)))?;
        username_input
            .type_str(username)
            .await
            .map_err(|e| ExtractError::LoginFailed(format!("typing username: {}", e)))?;

        self.click_button_by_text(page, "Next").await?;

        let password_input = self
            .wait_for_element(page, r#"input[name="password"]"#)
            .await?;
        password_input
            .click()
            .await
            .map_err(|e| ExtractError::LoginFailed(format!("focusing password: {}", e)))?;
        password_input
            .type_str(password)
            .await
            .map_err(|e| ExtractError::LoginFailed(format!("typing password: {}", e)))?;

        self.click_button_by_text(page, "Log in").await?;

        if let Err(e) = page.wait_for_navigation().await {
            return Err(ExtractError::LoginFailed(format!(
                "post-login navigation: {}",
                e
            )));
        }

        let landed = self.current_url(page).await.unwrap_or_default();
        if landed.contains("/home") || landed.contains("/i/status") {
            info!("twitter login succeeded");
            Ok(())
        } else {
            Err(ExtractError::LoginFailed(format!(
                "unexpected post-login url: {}",
                landed
            )))
        }
    }

    async fn save_cookies(&self, page: &Page) -> Result<(), ExtractError> {
        let cookies = page
            .get_cookies()
            .await
            .map_err(|e| ExtractError::Request(format!("reading cookies: {}", e)))?;

        let stored: Vec<StoredCookie> = cookies
            .into_iter()
            .filter(|c| c.domain.contains("x.com") || c.domain.contains("twitter.com"))
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect();

        self.cookies.save(&stored).await
    }

    /// Navigate to the tweet with a response listener installed, racing
    /// capture against listener loss and the capture timeout.
    async fn capture_tweet(
        &self,
        page: &Page,
        tweet_url: &str,
    ) -> Result<ParsedConversation, ExtractError> {
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| ExtractError::Request(format!("installing interceptor: {}", e)))?;

        page.goto(tweet_url)
            .await
            .map_err(|e| ExtractError::Request(format!("navigating to tweet: {}", e)))?;

        let deadline = Instant::now() + CAPTURE_TIMEOUT;
        loop {
            let event = tokio::select! {
                event = responses.next() => event,
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(ExtractError::Timeout(
                        "waiting for TweetDetail response".to_string(),
                    ));
                }
            };

            let Some(event) = event else {
                return Err(ExtractError::Request(
                    "browser event stream closed before TweetDetail arrived".to_string(),
                ));
            };

            if !event.response.url.contains("TweetDetail") {
                continue;
            }
            debug!(url = %event.response.url, "TweetDetail response captured");

            let body = self.response_body(page, &event).await?;
            let payload: Value = serde_json::from_str(&body).map_err(|e| {
                ExtractError::ContentShape(format!("TweetDetail body not json: {}", e))
            })?;
            return parse_tweet_detail(&payload);
        }
    }

    /// The body may lag the response event while the browser finishes
    /// loading it; retry once before giving up.
    async fn response_body(
        &self,
        page: &Page,
        event: &EventResponseReceived,
    ) -> Result<String, ExtractError> {
        let mut last_error = None;
        for attempt in 0..2 {
            if attempt > 0 {
                sleep(Duration::from_millis(500)).await;
            }
            match page
                .execute(GetResponseBodyParams::new(event.request_id.clone()))
                .await
            {
                Ok(response) => {
                    let body = if response.result.base64_encoded {
                        let decoded = BASE64.decode(&response.result.body).map_err(|e| {
                            ExtractError::ContentShape(format!("body decode: {}", e))
                        })?;
                        String::from_utf8_lossy(&decoded).into_owned()
                    } else {
                        response.result.body.clone()
                    };
                    return Ok(body);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(ExtractError::Request(format!(
            "fetching TweetDetail body: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn collect_profile_links(&self, url: &str) -> Result<Vec<String>, ExtractError> {
        let guard = self
            .pool
            .acquire()
            .await
            .map_err(|e| ExtractError::Request(format!("browser pool: {}", e)))?;
        let page = guard
            .new_page("about:blank")
            .await
            .map_err(|e| ExtractError::Request(format!("opening page: {}", e)))?;

        let outcome = timeout(EXTRACTION_TIMEOUT, async {
            if let Err(e) = page
                .set_user_agent(SetUserAgentOverrideParams::new(random_desktop_user_agent()))
                .await
            {
                debug!(error = %e, "setting user agent failed");
            }
            // Profiles render for signed-in sessions; reuse the probe /
            // login machinery before navigating to the profile itself.
            if !self.probe_session(&page).await {
                self.login(&page).await?;
                self.save_cookies(&page).await?;
            }

            page.goto(url)
                .await
                .map_err(|e| ExtractError::Request(format!("navigating to profile: {}", e)))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| ExtractError::Request(format!("loading profile: {}", e)))?;

            self.wait_for_element(&page, "article").await?;

            let links: Vec<String> = page
                .evaluate(COLLECT_STATUS_LINKS)
                .await
                .map_err(|e| ExtractError::Request(format!("collecting links: {}", e)))?
                .into_value()
                .map_err(|e| ExtractError::ContentShape(format!("link payload: {}", e)))?;

            Ok::<_, ExtractError>(links.into_iter().take(PROFILE_TWEET_LIMIT).collect())
        })
        .await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "page close failed");
        }

        outcome.map_err(|_| ExtractError::Timeout(format!("collecting links from {}", url)))?
    }

    async fn wait_for_element(
        &self,
        page: &Page,
        selector: &str,
    ) -> Result<chromiumoxide::element::Element, ExtractError> {
        let deadline = Instant::now() + ELEMENT_TIMEOUT;
        loop {
            if let Ok(element) = page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(ExtractError::Timeout(format!(
                    "waiting for element {}",
                    selector
                )));
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    /// Find a clickable element by its visible text.
    async fn click_button_by_text(&self, page: &Page, label: &str) -> Result<(), ExtractError> {
        let deadline = Instant::now() + ELEMENT_TIMEOUT;
        loop {
            for selector in ["button", r#"div[role="button"]"#] {
                let Ok(elements) = page.find_elements(selector).await else {
                    continue;
                };
                for element in elements {
                    let Ok(Some(text)) = element.inner_text().await else {
                        continue;
                    };
                    if text.trim() == label {
                        element.click().await.map_err(|e| {
                            ExtractError::LoginFailed(format!(
                                "clicking '{}': {}",
                                label, e
                            ))
                        })?;
                        return Ok(());
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(ExtractError::LoginFailed(format!(
                    "button '{}' never appeared",
                    label
                )));
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    async fn current_url(&self, page: &Page) -> Option<String> {
        page.url().await.ok().flatten()
    }
}

/// Shape a parsed conversation into the wire payload, applying the
/// character budget to the main tweet first and then greedily across
/// replies.
fn conversation_to_data(
    conversation: ParsedConversation,
    max_chars: Option<usize>,
) -> SourceData {
    let ParsedConversation {
        mut tweet_content,
        tweet_author,
        mut replies,
    } = conversation;

    if let Some(cap) = max_chars {
        let mut budget = CharBudget::new(cap);
        budget.take(&mut tweet_content);
        for reply in &mut replies {
            budget.take(&mut reply.content);
        }
        replies.retain(|reply| !reply.content.is_empty());
    }

    let total_comments = replies.len();
    SourceData::Twitter {
        tweet_content,
        tweet_author,
        comments: replies,
        total_comments,
    }
}
