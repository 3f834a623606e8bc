//! TweetDetail payload parsing.
//!
//! The captured GraphQL response nests the conversation under
//! `data.threaded_conversation_with_injections_v2.instructions`. Only
//! `TimelineAddEntries` instructions matter: `tweet-` entries carry the
//! main tweet, `conversationthread-` entries carry the replies.

use serde_json::Value;
use skimmer_types::{ExtractError, TweetReply};

/// Parsed conversation: the main tweet plus its replies.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConversation {
    pub tweet_content: String,
    pub tweet_author: String,
    pub replies: Vec<TweetReply>,
}

/// Walk a captured TweetDetail payload.
///
/// Fails with [`ExtractError::ContentShape`] when no main tweet content
/// is found after the walk.
pub fn parse_tweet_detail(payload: &Value) -> Result<ParsedConversation, ExtractError> {
    let instructions = payload
        .pointer("/data/threaded_conversation_with_injections_v2/instructions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ExtractError::ContentShape("payload missing conversation instructions".to_string())
        })?;

    let mut tweet_content = String::new();
    let mut tweet_author = String::new();
    let mut replies = Vec::new();

    for instruction in instructions {
        if instruction.get("type").and_then(Value::as_str) != Some("TimelineAddEntries") {
            continue;
        }
        let Some(entries) = instruction.get("entries").and_then(Value::as_array) else {
            continue;
        };

        for entry in entries {
            let entry_id = entry.get("entryId").and_then(Value::as_str).unwrap_or("");

            if entry_id.starts_with("tweet-") {
                let result = entry.pointer("/content/itemContent/tweet_results/result");
                if let Some(tweet) = result.and_then(unwrap_tweet) {
                    if let Some((content, name, screen_name)) = tweet_fields(tweet) {
                        tweet_content = content;
                        tweet_author = format!("{} (@{})", name, screen_name);
                    }
                }
            } else if entry_id.starts_with("conversationthread-") {
                let Some(items) = entry.pointer("/content/items").and_then(Value::as_array)
                else {
                    continue;
                };
                for item in items {
                    let result = item.pointer("/item/itemContent/tweet_results/result");
                    if let Some(tweet) = result.and_then(unwrap_tweet) {
                        if let Some(reply) = reply_fields(tweet) {
                            replies.push(reply);
                        }
                    }
                }
            }
        }
    }

    if tweet_content.is_empty() {
        return Err(ExtractError::ContentShape(
            "no main tweet content in captured payload".to_string(),
        ));
    }

    Ok(ParsedConversation {
        tweet_content,
        tweet_author,
        replies,
    })
}

/// Resolve a `tweet_results.result` node to a `Tweet`, descending
/// through the visibility wrapper when present.
fn unwrap_tweet(result: &Value) -> Option<&Value> {
    match result.get("__typename").and_then(Value::as_str) {
        Some("Tweet") => Some(result),
        Some("TweetWithVisibilityResults") => result
            .get("tweet")
            .filter(|t| t.get("legacy").is_some()),
        _ => None,
    }
}

fn tweet_fields(tweet: &Value) -> Option<(String, String, String)> {
    let content = tweet
        .pointer("/legacy/full_text")
        .and_then(Value::as_str)?
        .to_string();
    let user = tweet.pointer("/core/user_results/result/legacy")?;
    let name = user.get("name").and_then(Value::as_str).unwrap_or("");
    let screen_name = user
        .get("screen_name")
        .and_then(Value::as_str)
        .unwrap_or("");
    Some((content, name.to_string(), screen_name.to_string()))
}

fn reply_fields(tweet: &Value) -> Option<TweetReply> {
    let legacy = tweet.get("legacy")?;
    let content = legacy.get("full_text").and_then(Value::as_str)?.to_string();
    let user = tweet.pointer("/core/user_results/result/legacy");

    let name = user
        .and_then(|u| u.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let screen_name = user
        .and_then(|u| u.get("screen_name"))
        .and_then(Value::as_str)
        .unwrap_or("");

    Some(TweetReply {
        author: name.to_string(),
        username: format!("@{}", screen_name),
        content,
        timestamp: legacy
            .get("created_at")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        likes: count_field(legacy, "favorite_count"),
        replies: count_field(legacy, "reply_count"),
        retweets: count_field(legacy, "retweet_count"),
    })
}

/// Counts arrive as numbers; the wire shape wants strings.
fn count_field(legacy: &Value, key: &str) -> String {
    match legacy.get(key) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "0".to_string(),
    }
}
