//! Canonical per-URL extraction record and source payload shapes.
//!
//! The JSON produced here is a wire contract: clients of `/search` and
//! `/extract` match on `source_type` and the exact key sets below, so
//! field names must not drift.

use serde::{Deserialize, Serialize};

/// Which HTTP endpoint a request entered through.
///
/// Routing is endpoint-sensitive: `/extract` forces the JS-capable
/// webpage path for unmatched hosts and is the only entry point for
/// Twitter profile URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    Extract,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Search => write!(f, "/search"),
            Endpoint::Extract => write!(f, "/extract"),
        }
    }
}

/// Closed set of content sources the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Youtube,
    YoutubePlaylist,
    Reddit,
    Pdf,
    Twitter,
    TwitterProfile,
    Webpage,
    Unknown,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceType::Youtube => "youtube",
            SourceType::YoutubePlaylist => "youtube_playlist",
            SourceType::Reddit => "reddit",
            SourceType::Pdf => "pdf",
            SourceType::Twitter => "twitter",
            SourceType::TwitterProfile => "twitter_profile",
            SourceType::Webpage => "webpage",
            SourceType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A single top-level YouTube comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeComment {
    pub author: String,
    pub text: String,
}

/// One entry of a playlist's first page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistVideo {
    pub title: String,
    pub video_id: String,
}

/// A flattened Reddit comment.
///
/// `replies` is part of the wire shape but stays `None` in practice:
/// the adapter flattens the tree depth-first instead of nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedditComment {
    pub author: String,
    pub score: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<RedditComment>>,
}

/// Summary of one post in a subreddit or user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedditPostSummary {
    pub title: String,
    pub url: String,
    pub score: i64,
    pub author: String,
    pub num_comments: i64,
}

/// One reply below a tweet. Counts are stringified as captured from the
/// upstream payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetReply {
    pub author: String,
    pub username: String,
    pub content: String,
    pub timestamp: String,
    pub likes: String,
    pub replies: String,
    pub retweets: String,
}

/// One tweet extracted from a profile page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTweet {
    pub url: String,
    pub data: Box<SourceData>,
}

/// Source-specific payload of an [`ExtractedResult`].
///
/// Serialized untagged: the variant's fields become the `data` object
/// directly, keyed exactly as clients expect. Variant order matters for
/// deserialization (cache round-trips): shapes with more specific
/// required keys come first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceData {
    Youtube {
        title: String,
        channel_name: String,
        transcript: String,
        comments: Vec<YoutubeComment>,
    },
    YoutubePlaylist {
        title: String,
        channel_name: String,
        videos: Vec<PlaylistVideo>,
    },
    Twitter {
        tweet_content: String,
        tweet_author: String,
        comments: Vec<TweetReply>,
        total_comments: usize,
    },
    TwitterProfile {
        profile_url: String,
        latest_tweets: Vec<ProfileTweet>,
    },
    RedditListing {
        post_title: String,
        post_body: String,
        score: i64,
        author: String,
        posts: Vec<RedditPostSummary>,
    },
    RedditPost {
        post_title: String,
        post_body: String,
        score: i64,
        author: String,
        comments: Vec<RedditComment>,
    },
    Webpage {
        title: String,
        text_content: String,
    },
    Pdf {
        text_content: String,
    },
}

/// The canonical per-URL record returned by both endpoints.
///
/// Invariant: exactly one of `data` / `error` is populated, enforced by
/// the [`ExtractedResult::success`] and [`ExtractedResult::failure`]
/// constructors. `url` is the input URL verbatim and is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResult {
    pub url: String,
    pub source_type: SourceType,
    pub processed_successfully: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SourceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the failure is transient (timeout, cancellation) and
    /// must not be negatively cached. Process-local metadata, never
    /// serialized.
    #[serde(skip)]
    pub transient_failure: bool,
}

impl ExtractedResult {
    /// A successful extraction carrying `data` and no `error`.
    pub fn success(url: impl Into<String>, source_type: SourceType, data: SourceData) -> Self {
        Self {
            url: url.into(),
            source_type,
            processed_successfully: true,
            data: Some(data),
            error: None,
            transient_failure: false,
        }
    }

    /// A failed extraction carrying `error` and no `data`.
    pub fn failure(
        url: impl Into<String>,
        source_type: SourceType,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            url: url.into(),
            source_type,
            processed_successfully: false,
            data: None,
            error: Some(error.to_string()),
            transient_failure: false,
        }
    }

    /// Failure constructor that keeps the error's caching class: a
    /// transient failure (timeout, cancellation) is flagged so callers
    /// skip negative caching.
    pub fn failure_typed(
        url: impl Into<String>,
        source_type: SourceType,
        error: &crate::ExtractError,
    ) -> Self {
        let mut result = Self::failure(url, source_type, error);
        result.transient_failure = !error.is_likely_permanent();
        result
    }

    /// Partial-success constructor: data plus joined sub-operation
    /// errors. `processed_successfully` stays true because at least one
    /// sub-operation yielded content.
    pub fn partial(
        url: impl Into<String>,
        source_type: SourceType,
        data: SourceData,
        errors: Vec<String>,
    ) -> Self {
        let error = if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        };
        Self {
            url: url.into(),
            source_type,
            processed_successfully: true,
            data: Some(data),
            error,
            transient_failure: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_type_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_value(SourceType::YoutubePlaylist).unwrap(),
            json!("youtube_playlist")
        );
        assert_eq!(
            serde_json::to_value(SourceType::TwitterProfile).unwrap(),
            json!("twitter_profile")
        );
        assert_eq!(serde_json::to_value(SourceType::Pdf).unwrap(), json!("pdf"));
    }

    #[test]
    fn success_omits_error_key() {
        let result = ExtractedResult::success(
            "https://example.com",
            SourceType::Webpage,
            SourceData::Webpage {
                title: "t".into(),
                text_content: "body".into(),
            },
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["processed_successfully"], json!(true));
        assert_eq!(value["data"]["title"], json!("t"));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failure_omits_data_key() {
        let result =
            ExtractedResult::failure("https://example.com", SourceType::Pdf, "not a pdf");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["processed_successfully"], json!(false));
        assert_eq!(value["error"], json!("not a pdf"));
        assert!(value.get("data").is_none());
    }

    #[test]
    fn typed_failures_carry_their_caching_class() {
        let transient = ExtractedResult::failure_typed(
            "https://example.com",
            SourceType::Webpage,
            &crate::ExtractError::Timeout("slow".into()),
        );
        assert!(transient.transient_failure);

        let permanent = ExtractedResult::failure_typed(
            "https://example.com",
            SourceType::Webpage,
            &crate::ExtractError::UpstreamStatus {
                status: 404,
                message: "gone".into(),
            },
        );
        assert!(!permanent.transient_failure);

        // The flag is process-local and never serialized.
        let value = serde_json::to_value(&transient).unwrap();
        assert!(value.get("transient_failure").is_none());
    }

    #[test]
    fn twitter_data_keys_match_contract() {
        let data = SourceData::Twitter {
            tweet_content: "T".into(),
            tweet_author: "Name (@name)".into(),
            comments: vec![TweetReply {
                author: "A".into(),
                username: "@a".into(),
                content: "R".into(),
                timestamp: "Wed Oct 01 00:00:00 +0000 2025".into(),
                likes: "1".into(),
                replies: "0".into(),
                retweets: "2".into(),
            }],
            total_comments: 1,
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["total_comments"], json!(1));
        assert_eq!(value["comments"][0]["retweets"], json!("2"));
    }

    #[test]
    fn payload_round_trips_through_untagged_decode() {
        let original = SourceData::RedditPost {
            post_title: "title".into(),
            post_body: "body".into(),
            score: 42,
            author: "author".into(),
            comments: vec![RedditComment {
                author: "c".into(),
                score: 1,
                text: "hi".into(),
                replies: None,
            }],
        };
        let bytes = serde_json::to_vec(&original).unwrap();
        let decoded: SourceData = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn pdf_payload_not_mistaken_for_webpage() {
        let original = SourceData::Pdf {
            text_content: "Hello".into(),
        };
        let bytes = serde_json::to_vec(&original).unwrap();
        let decoded: SourceData = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }
}
