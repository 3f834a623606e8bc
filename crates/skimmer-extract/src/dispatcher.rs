//! URL-type dispatch.
//!
//! Routing priority: `.pdf` path suffix, then hostname matching for the
//! specialized sources, then the webpage adapter (JS-capable when the
//! request came through `/extract`). Classification is a pure function
//! of the URL; the endpoint only changes which webpage path runs and
//! whether Twitter profiles are allowed.

use crate::{PdfAdapter, RedditAdapter, TwitterAdapter, WebpageAdapter, YoutubeAdapter};
use skimmer_types::{Endpoint, ExtractError, ExtractedResult, SourceType};
use tracing::debug;
use url::Url;

/// Which worker pool a URL's job belongs on. Must stay consistent with
/// [`Dispatcher::dispatch`]: Twitter and the JS webpage path hold a
/// browser, everything else is plain HTTP work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolClass {
    Http,
    Browser,
}

/// Classify a URL into its source type. Unparseable input is `Unknown`.
pub fn classify(url: &str) -> SourceType {
    let parsed = match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => parsed,
        _ => return SourceType::Unknown,
    };

    if parsed.path().to_ascii_lowercase().ends_with(".pdf") {
        return SourceType::Pdf;
    }

    let host = match parsed.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return SourceType::Unknown,
    };

    if host_matches(&host, &["youtube.com", "youtu.be"]) {
        return match crate::youtube::classify_youtube(&parsed) {
            Some(crate::youtube::YoutubeUrl::Playlist(_)) => SourceType::YoutubePlaylist,
            _ => SourceType::Youtube,
        };
    }

    if host_matches(&host, &["reddit.com", "redd.it"]) {
        return SourceType::Reddit;
    }

    if host_matches(&host, &["twitter.com", "x.com"]) {
        return if parsed.path().contains("/status/") {
            SourceType::Twitter
        } else {
            SourceType::TwitterProfile
        };
    }

    SourceType::Webpage
}

/// Exact or subdomain match (`m.youtube.com`, `old.reddit.com`,
/// `mobile.twitter.com`).
fn host_matches(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

/// Decide which worker pool serves this URL on this endpoint.
pub fn pool_class(url: &str, endpoint: Endpoint) -> PoolClass {
    match classify(url) {
        SourceType::Twitter | SourceType::TwitterProfile => PoolClass::Browser,
        SourceType::Webpage | SourceType::Unknown if endpoint == Endpoint::Extract => {
            PoolClass::Browser
        }
        _ => PoolClass::Http,
    }
}

/// Routes a URL to its adapter and materializes failures.
pub struct Dispatcher {
    pub pdf: PdfAdapter,
    pub webpage: WebpageAdapter,
    pub reddit: RedditAdapter,
    pub youtube: YoutubeAdapter,
    pub twitter: TwitterAdapter,
}

impl Dispatcher {
    /// Extract one URL. Never panics and never returns early with a
    /// transport error: every failure comes back as an
    /// [`ExtractedResult`] with `error` populated.
    pub async fn dispatch(
        &self,
        url: &str,
        endpoint: Endpoint,
        max_chars: Option<usize>,
    ) -> ExtractedResult {
        let source_type = classify(url);
        debug!(url = %url, source_type = %source_type, endpoint = %endpoint, "dispatching");

        match source_type {
            SourceType::Unknown => ExtractedResult::failure_typed(
                url,
                SourceType::Unknown,
                &ExtractError::InvalidUrl(url.to_string()),
            ),
            SourceType::Pdf => match self.pdf.extract(url, max_chars).await {
                Ok(data) => ExtractedResult::success(url, SourceType::Pdf, data),
                // Not actually a PDF: fall back to the webpage adapter,
                // keeping the sniff result visible if that fails too.
                // Always the static path: PDF jobs run on HTTP workers,
                // which must not grab a browser.
                Err(ExtractError::NotPdf { detected }) => {
                    let fallback = self.webpage.extract_static(url, max_chars).await;
                    match fallback {
                        Ok(data) => ExtractedResult::success(url, SourceType::Webpage, data),
                        Err(_) => ExtractedResult::failure_typed(
                            url,
                            SourceType::Pdf,
                            &ExtractError::NotPdf { detected },
                        ),
                    }
                }
                Err(e) => ExtractedResult::failure_typed(url, SourceType::Pdf, &e),
            },
            SourceType::Reddit => match self.reddit.extract(url, max_chars).await {
                Ok(data) => ExtractedResult::success(url, SourceType::Reddit, data),
                Err(e) => ExtractedResult::failure_typed(url, SourceType::Reddit, &e),
            },
            SourceType::Youtube => match self.youtube.extract_video(url, max_chars).await {
                Ok((data, errors)) => {
                    ExtractedResult::partial(url, SourceType::Youtube, data, errors)
                }
                Err(e) => ExtractedResult::failure_typed(url, SourceType::Youtube, &e),
            },
            SourceType::YoutubePlaylist => {
                match self.youtube.extract_playlist(url, max_chars).await {
                    Ok(data) => ExtractedResult::success(url, SourceType::YoutubePlaylist, data),
                    Err(e) => ExtractedResult::failure_typed(url, SourceType::YoutubePlaylist, &e),
                }
            }
            SourceType::Twitter => match self.twitter.extract_tweet(url, max_chars).await {
                Ok(data) => ExtractedResult::success(url, SourceType::Twitter, data),
                Err(e) => ExtractedResult::failure_typed(url, SourceType::Twitter, &e),
            },
            SourceType::TwitterProfile => {
                if endpoint != Endpoint::Extract {
                    return ExtractedResult::failure_typed(
                        url,
                        SourceType::TwitterProfile,
                        &ExtractError::Unsupported(
                            "twitter profile urls are only supported via /extract".to_string(),
                        ),
                    );
                }
                match self.twitter.extract_profile(url, max_chars).await {
                    Ok((data, errors)) => {
                        ExtractedResult::partial(url, SourceType::TwitterProfile, data, errors)
                    }
                    Err(e) => ExtractedResult::failure_typed(url, SourceType::TwitterProfile, &e),
                }
            }
            SourceType::Webpage => match self.run_webpage(url, endpoint, max_chars).await {
                Ok(data) => ExtractedResult::success(url, SourceType::Webpage, data),
                Err(e) => ExtractedResult::failure_typed(url, SourceType::Webpage, &e),
            },
        }
    }

    async fn run_webpage(
        &self,
        url: &str,
        endpoint: Endpoint,
        max_chars: Option<usize>,
    ) -> Result<skimmer_types::SourceData, ExtractError> {
        match endpoint {
            Endpoint::Extract => self.webpage.extract_js(url, max_chars).await,
            Endpoint::Search => self.webpage.extract_static(url, max_chars).await,
        }
    }
}
