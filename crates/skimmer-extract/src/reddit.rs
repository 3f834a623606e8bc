//! Reddit extraction.
//!
//! Posts go through the OAuth endpoint when credentials are configured
//! (bearer token refreshed on demand under a mutex), otherwise through
//! the public `.json` mirror of the post URL. Subreddit and user URLs
//! hit the listing endpoint. Comment trees are flattened iteratively;
//! continuation markers and placeholder bodies never appear in output.

use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::Value;
use skimmer_types::{
    CharBudget, ExtractError, RedditComment, RedditPostSummary, SourceData,
};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

const COMMENT_CAP: usize = 50;
const LISTING_LIMIT: usize = 25;
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// Refresh the bearer token this long before it actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// What kind of Reddit URL we were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedditUrl {
    /// A post or a comment permalink (treated as its post).
    Post { path: String },
    Subreddit { name: String },
    User { name: String },
    /// Reddit search pages are not supported.
    Search,
}

/// Classify a reddit.com / redd.it URL by its path shape.
pub fn classify_reddit(url: &Url) -> Result<RedditUrl, ExtractError> {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|parts| parts.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if url.host_str().map(|h| h.ends_with("redd.it")).unwrap_or(false) {
        // Short links resolve to posts.
        return Ok(RedditUrl::Post {
            path: url.path().to_string(),
        });
    }

    match segments.as_slice() {
        ["search", ..] => Ok(RedditUrl::Search),
        ["r", sub, "comments", ..] => Ok(RedditUrl::Post {
            path: format!("/r/{}/comments/{}", sub, segments[3..].join("/")),
        }),
        ["r", _, "search", ..] => Ok(RedditUrl::Search),
        ["r", sub] | ["r", sub, "hot" | "new" | "top" | "rising"] => Ok(RedditUrl::Subreddit {
            name: (*sub).to_string(),
        }),
        ["user", name, ..] | ["u", name, ..] => Ok(RedditUrl::User {
            name: (*name).to_string(),
        }),
        _ => Err(ExtractError::Unsupported(format!(
            "unrecognized reddit url: {}",
            url
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct BearerToken {
    token: String,
    expires_at: Instant,
}

impl BearerToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Reddit adapter with optional OAuth credentials.
pub struct RedditAdapter {
    client: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: String,
    token: Mutex<Option<BearerToken>>,
}

impl RedditAdapter {
    pub fn new(
        client: reqwest::Client,
        client_id: Option<String>,
        client_secret: Option<String>,
        user_agent: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            user_agent,
            token: Mutex::new(None),
        }
    }

    fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    pub async fn extract(
        &self,
        url: &str,
        max_chars: Option<usize>,
    ) -> Result<SourceData, ExtractError> {
        let parsed =
            Url::parse(url).map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", url, e)))?;

        match classify_reddit(&parsed)? {
            RedditUrl::Post { path } => self.extract_post(url, &path, max_chars).await,
            RedditUrl::Subreddit { name } => {
                self.extract_listing(&format!("/r/{}", name), &format!("r/{}", name))
                    .await
            }
            RedditUrl::User { name } => {
                self.extract_listing(&format!("/user/{}", name), &format!("u/{}", name))
                    .await
            }
            RedditUrl::Search => Err(ExtractError::Unsupported(
                "reddit search pages are not supported".to_string(),
            )),
        }
    }

    async fn extract_post(
        &self,
        original_url: &str,
        path: &str,
        max_chars: Option<usize>,
    ) -> Result<SourceData, ExtractError> {
        let payload = if self.has_credentials() {
            let token = self.bearer_token().await?;
            self.get_json(&format!("{}{}", OAUTH_BASE, path), Some(&token))
                .await?
        } else {
            let stripped = original_url.trim_end_matches('/');
            self.get_json(&format!("{}.json", stripped), None).await?
        };

        parse_post(&payload, max_chars)
    }

    async fn extract_listing(
        &self,
        path: &str,
        display_name: &str,
    ) -> Result<SourceData, ExtractError> {
        let payload = if self.has_credentials() {
            let token = self.bearer_token().await?;
            self.get_json(
                &format!("{}{}?limit={}", OAUTH_BASE, path, LISTING_LIMIT),
                Some(&token),
            )
            .await?
        } else {
            self.get_json(
                &format!("https://www.reddit.com{}.json?limit={}", path, LISTING_LIMIT),
                None,
            )
            .await?
        };

        let posts = parse_listing(&payload);
        if posts.is_empty() {
            return Err(ExtractError::ContentShape(format!(
                "no posts found in {} listing",
                display_name
            )));
        }

        Ok(SourceData::RedditListing {
            post_title: format!("{} - Recent Posts", display_name),
            post_body: String::new(),
            score: 0,
            author: String::new(),
            posts,
        })
    }

    /// Current bearer token, refreshed under the mutex when stale.
    async fn bearer_token(&self) -> Result<String, ExtractError> {
        let mut slot = self.token.lock().await;
        if let Some(existing) = slot.as_ref() {
            if existing.is_fresh() {
                return Ok(existing.token.clone());
            }
        }

        let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) else {
            return Err(ExtractError::MissingCredentials("REDDIT_CLIENT_ID"));
        };

        debug!("refreshing reddit oauth token");
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(id, Some(secret))
            .header(USER_AGENT, &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: "reddit token endpoint".to_string(),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::ContentShape(format!("token response: {}", e)))?;

        let bearer = BearerToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        };
        *slot = Some(bearer);
        Ok(token.access_token)
    }

    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value, ExtractError> {
        let mut request = self.client.get(url).header(USER_AGENT, &self.user_agent);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: format!("fetching {}", url),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ExtractError::ContentShape(format!("invalid json: {}", e)))
    }
}

/// Parse the two-listing post payload `[post, comments]`.
fn parse_post(payload: &Value, max_chars: Option<usize>) -> Result<SourceData, ExtractError> {
    let listings = payload
        .as_array()
        .ok_or_else(|| ExtractError::ContentShape("expected [post, comments] payload".into()))?;

    let post_data = listings
        .first()
        .and_then(|listing| listing.pointer("/data/children/0/data"))
        .ok_or_else(|| ExtractError::ContentShape("missing post data".into()))?;

    let post_title = text_field(post_data, "title");
    let mut post_body = text_field(post_data, "selftext");
    let score = post_data.get("score").and_then(Value::as_i64).unwrap_or(0);
    let author = text_field(post_data, "author");

    let mut comments = listings
        .get(1)
        .map(|listing| flatten_comments(listing, COMMENT_CAP))
        .unwrap_or_default();

    // The cap covers the post body first, then the comments; the title
    // is metadata and stays intact.
    if let Some(cap) = max_chars {
        let mut budget = CharBudget::new(cap);
        budget.take(&mut post_body);
        for comment in &mut comments {
            budget.take(&mut comment.text);
        }
        comments.retain(|comment| !comment.text.is_empty());
    }

    Ok(SourceData::RedditPost {
        post_title,
        post_body,
        score,
        author,
        comments,
    })
}

/// Flatten a comment tree depth-first with an explicit stack.
///
/// Nodes are emitted before their replies; sibling order is preserved
/// by pushing children in reverse. Continuation markers
/// (`kind == "more"`), empty bodies and `[deleted]`/`[removed]`
/// placeholders are skipped. Stops at `cap` comments.
pub fn flatten_comments(listing: &Value, cap: usize) -> Vec<RedditComment> {
    let mut out = Vec::new();
    let mut stack: Vec<&Value> = Vec::new();

    if let Some(children) = listing.pointer("/data/children").and_then(Value::as_array) {
        for child in children.iter().rev() {
            stack.push(child);
        }
    }

    while let Some(node) = stack.pop() {
        if out.len() >= cap {
            break;
        }

        let kind = node.get("kind").and_then(Value::as_str).unwrap_or("");
        if kind == "more" {
            continue;
        }

        let Some(data) = node.get("data") else {
            continue;
        };

        let body = data.get("body").and_then(Value::as_str).unwrap_or("");
        let trimmed = body.trim();
        if !trimmed.is_empty() && trimmed != "[deleted]" && trimmed != "[removed]" {
            out.push(RedditComment {
                author: text_field(data, "author"),
                score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
                text: trimmed.to_string(),
                replies: None,
            });
        }

        // Replies may be an empty string instead of a listing object.
        if let Some(children) = data
            .pointer("/replies/data/children")
            .and_then(Value::as_array)
        {
            for child in children.iter().rev() {
                stack.push(child);
            }
        }
    }

    out
}

fn parse_listing(payload: &Value) -> Vec<RedditPostSummary> {
    let mut posts = Vec::new();
    let Some(children) = payload.pointer("/data/children").and_then(Value::as_array) else {
        return posts;
    };

    for child in children {
        let Some(data) = child.get("data") else {
            continue;
        };
        let title = text_field(data, "title");
        if title.is_empty() {
            // User listings mix in comments; only posts carry titles.
            continue;
        }
        let permalink = text_field(data, "permalink");
        let url = if permalink.is_empty() {
            text_field(data, "url")
        } else {
            format!("https://www.reddit.com{}", permalink)
        };
        posts.push(RedditPostSummary {
            title,
            url,
            score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
            author: text_field(data, "author"),
            num_comments: data.get("num_comments").and_then(Value::as_i64).unwrap_or(0),
        });
    }

    if posts.is_empty() {
        warn!("reddit listing contained no posts");
    }
    posts
}

fn text_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
