//! # Skimmer Types
//!
//! Shared data model for the Skimmer extraction service.
//!
//! This crate defines the canonical per-URL record ([`ExtractedResult`]),
//! the source-specific payload shapes that clients depend on, the error
//! taxonomy used across adapters, and the cache key scheme.

pub mod error;
pub mod keys;
pub mod result;
pub mod truncate;

pub use error::ExtractError;
pub use keys::{content_key, search_key};
pub use result::{
    Endpoint, ExtractedResult, PlaylistVideo, ProfileTweet, RedditComment, RedditPostSummary,
    SourceData, SourceType, TweetReply, YoutubeComment,
};
pub use truncate::{truncate_to_chars, CharBudget};
