//! YouTube extraction.
//!
//! Video pages fan out three concurrent sub-operations (metadata,
//! top comments, transcript) and join their failures instead of
//! failing the whole URL: the result counts as successful when any
//! sub-operation yielded content. Playlists get their details plus the
//! first page of items.

use serde_json::Value;
use skimmer_types::{CharBudget, ExtractError, PlaylistVideo, SourceData, YoutubeComment};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const TACTIQ_URL: &str = "https://tactiq-apps-prod.tactiq.io/transcript";
const TRANSCRIPT_TIMEOUT: Duration = Duration::from_secs(10);
const COMMENT_LIMIT: usize = 50;
const PLAYLIST_PAGE_SIZE: usize = 50;

const VIDEO_ID_LEN: usize = 11;

/// A parsed YouTube URL: a single video or a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YoutubeUrl {
    Video(String),
    Playlist(String),
}

/// Pull a video or playlist id out of any of the URL shapes YouTube
/// serves. A URL carrying both `v=` and `list=` resolves to the video.
pub fn classify_youtube(url: &Url) -> Option<YoutubeUrl> {
    let list_id = url
        .query_pairs()
        .find(|(k, _)| k == "list")
        .map(|(_, v)| v.to_string());

    if let Some(id) = video_id_from_url(url) {
        return Some(YoutubeUrl::Video(id));
    }

    if url.path() == "/playlist" || list_id.is_some() {
        return list_id.map(YoutubeUrl::Playlist);
    }

    None
}

fn video_id_from_url(url: &Url) -> Option<String> {
    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        return validate_video_id(&v);
    }

    let host = url.host_str()?.to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|parts| parts.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if host == "youtu.be" || host.ends_with(".youtu.be") {
        return segments.first().and_then(|s| validate_video_id(s));
    }

    match segments.as_slice() {
        ["embed", id, ..] | ["v", id, ..] | ["shorts", id, ..] | ["live", id, ..] => {
            validate_video_id(id)
        }
        _ => None,
    }
}

/// Video ids are 11 chars of `[A-Za-z0-9_-]`. Validation is permissive:
/// unknown trailing characters are dropped rather than rejected.
fn validate_video_id(raw: &str) -> Option<String> {
    let id: String = raw
        .chars()
        .take(VIDEO_ID_LEN)
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (id.len() == VIDEO_ID_LEN).then_some(id)
}

/// YouTube adapter over the hosted data API and the transcript
/// resolver's backends.
pub struct YoutubeAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    transcript_order: Vec<String>,
    transcript_service_url: Option<String>,
}

impl YoutubeAdapter {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        transcript_order: Vec<String>,
        transcript_service_url: Option<String>,
    ) -> Self {
        Self {
            client,
            api_key,
            transcript_order,
            transcript_service_url,
        }
    }

    /// Extract a video: metadata, comments and transcript concurrently.
    /// Returns the payload plus the joined sub-operation errors.
    pub async fn extract_video(
        &self,
        url: &str,
        max_chars: Option<usize>,
    ) -> Result<(SourceData, Vec<String>), ExtractError> {
        let parsed =
            Url::parse(url).map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", url, e)))?;
        let video_id = match classify_youtube(&parsed) {
            Some(YoutubeUrl::Video(id)) => id,
            _ => {
                return Err(ExtractError::InvalidUrl(format!(
                    "no video id found in {}",
                    url
                )))
            }
        };

        let (metadata, comments, transcript) = tokio::join!(
            self.fetch_metadata(&video_id),
            self.fetch_comments(&video_id),
            self.resolve_transcript(&video_id),
        );

        let mut errors = Vec::new();

        let (title, channel_name) = match metadata {
            Ok(pair) => pair,
            Err(e) => {
                errors.push(format!("metadata: {}", e));
                (String::new(), String::new())
            }
        };
        let mut comments = match comments {
            Ok(list) => list,
            Err(e) => {
                errors.push(format!("comments: {}", e));
                Vec::new()
            }
        };
        let mut transcript = match transcript {
            Ok(text) => text,
            Err(e) => {
                errors.push(format!("transcript: {}", e));
                String::new()
            }
        };

        if title.is_empty() && comments.is_empty() && transcript.is_empty() {
            return Err(ExtractError::ContentShape(format!(
                "no content for video {}: {}",
                video_id,
                errors.join("; ")
            )));
        }

        // Transcript first, then comment texts greedily.
        if let Some(cap) = max_chars {
            let mut budget = CharBudget::new(cap);
            budget.take(&mut transcript);
            for comment in &mut comments {
                budget.take(&mut comment.text);
            }
            comments.retain(|comment| !comment.text.is_empty());
        }

        Ok((
            SourceData::Youtube {
                title,
                channel_name,
                transcript,
                comments,
            },
            errors,
        ))
    }

    /// Extract a playlist: details plus the first page of items.
    pub async fn extract_playlist(
        &self,
        url: &str,
        _max_chars: Option<usize>,
    ) -> Result<SourceData, ExtractError> {
        let parsed =
            Url::parse(url).map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", url, e)))?;
        let playlist_id = match classify_youtube(&parsed) {
            Some(YoutubeUrl::Playlist(id)) => id,
            _ => {
                return Err(ExtractError::InvalidUrl(format!(
                    "no playlist id found in {}",
                    url
                )))
            }
        };

        let api_key = self.require_api_key()?;

        let details = self
            .get_api_json(&format!(
                "{}/playlists?part=snippet&id={}&key={}",
                DATA_API_BASE, playlist_id, api_key
            ))
            .await?;
        let snippet = details.pointer("/items/0/snippet").ok_or_else(|| {
            ExtractError::ContentShape(format!("playlist {} not found", playlist_id))
        })?;
        let title = string_at(snippet, "/title");
        let channel_name = string_at(snippet, "/channelTitle");

        let items = self
            .get_api_json(&format!(
                "{}/playlistItems?part=snippet&maxResults={}&playlistId={}&key={}",
                DATA_API_BASE, PLAYLIST_PAGE_SIZE, playlist_id, api_key
            ))
            .await?;

        let videos = items
            .pointer("/items")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let snippet = entry.get("snippet")?;
                        let video_id = snippet
                            .pointer("/resourceId/videoId")?
                            .as_str()?
                            .to_string();
                        Some(PlaylistVideo {
                            title: string_at(snippet, "/title"),
                            video_id,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(SourceData::YoutubePlaylist {
            title,
            channel_name,
            videos,
        })
    }

    async fn fetch_metadata(&self, video_id: &str) -> Result<(String, String), ExtractError> {
        let api_key = self.require_api_key()?;
        let payload = self
            .get_api_json(&format!(
                "{}/videos?part=snippet&id={}&key={}",
                DATA_API_BASE, video_id, api_key
            ))
            .await?;

        let snippet = payload
            .pointer("/items/0/snippet")
            .ok_or_else(|| ExtractError::ContentShape(format!("video {} not found", video_id)))?;

        Ok((string_at(snippet, "/title"), string_at(snippet, "/channelTitle")))
    }

    async fn fetch_comments(&self, video_id: &str) -> Result<Vec<YoutubeComment>, ExtractError> {
        let api_key = self.require_api_key()?;
        let payload = self
            .get_api_json(&format!(
                "{}/commentThreads?part=snippet&videoId={}&order=relevance&maxResults={}&textFormat=plainText&key={}",
                DATA_API_BASE, video_id, COMMENT_LIMIT, api_key
            ))
            .await?;

        let comments = payload
            .pointer("/items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let snippet = item.pointer("/snippet/topLevelComment/snippet")?;
                        let text = string_at(snippet, "/textDisplay");
                        if text.is_empty() {
                            return None;
                        }
                        Some(YoutubeComment {
                            author: string_at(snippet, "/authorDisplayName"),
                            text,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(comments)
    }

    /// Try the configured transcript methods in order; the first one
    /// returning a non-empty transcript wins.
    async fn resolve_transcript(&self, video_id: &str) -> Result<String, ExtractError> {
        let mut errors = Vec::new();

        for method in &self.transcript_order {
            let attempt = match method.as_str() {
                "ytapi" => self.transcript_via_service(video_id).await,
                "tactiq" => self.transcript_via_tactiq(video_id).await,
                other => {
                    warn!(method = other, "unknown transcript method, skipping");
                    continue;
                }
            };

            match attempt {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(method = method.as_str(), video_id, "transcript resolved");
                    return Ok(text);
                }
                Ok(_) => errors.push(format!("{}: empty transcript", method)),
                Err(e) => errors.push(format!("{}: {}", method, e)),
            }
        }

        Err(ExtractError::ContentShape(if errors.is_empty() {
            "no transcript methods configured".to_string()
        } else {
            errors.join("; ")
        }))
    }

    async fn transcript_via_service(&self, video_id: &str) -> Result<String, ExtractError> {
        let base = self
            .transcript_service_url
            .as_deref()
            .ok_or(ExtractError::MissingCredentials("TRANSCRIPT_SERVICE_URL"))?;

        let response = self
            .client
            .post(format!("{}/get_transcript", base.trim_end_matches('/')))
            .timeout(TRANSCRIPT_TIMEOUT)
            .json(&serde_json::json!({ "video_id": video_id }))
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::ContentShape(format!("transcript response: {}", e)))?;

        if !status.is_success() {
            let detail = string_at(&payload, "/detail");
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: if detail.is_empty() {
                    "transcript service error".to_string()
                } else {
                    detail
                },
            });
        }

        Ok(string_at(&payload, "/transcript"))
    }

    async fn transcript_via_tactiq(&self, video_id: &str) -> Result<String, ExtractError> {
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let response = self
            .client
            .post(TACTIQ_URL)
            .timeout(TRANSCRIPT_TIMEOUT)
            .json(&serde_json::json!({ "videoUrl": video_url, "langCode": "en" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: "tactiq transcript endpoint".to_string(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::ContentShape(format!("tactiq response: {}", e)))?;

        let segments = payload
            .pointer("/captions")
            .and_then(Value::as_array)
            .map(|captions| {
                captions
                    .iter()
                    .filter_map(|caption| caption.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        Ok(segments)
    }

    fn require_api_key(&self) -> Result<&str, ExtractError> {
        self.api_key
            .as_deref()
            .ok_or(ExtractError::MissingCredentials("YOUTUBE_API_KEY"))
    }

    async fn get_api_json(&self, url: &str) -> Result<Value, ExtractError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: "youtube data api".to_string(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| ExtractError::ContentShape(format!("invalid json: {}", e)))
    }
}

fn string_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
