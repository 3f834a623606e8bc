//! Error taxonomy shared by the dispatcher, adapters and handlers.

use thiserror::Error;

/// Everything that can go wrong while extracting one URL.
///
/// Adapters return these; the dispatcher materializes them into an
/// [`crate::ExtractedResult`] with `error` populated, so nothing here
/// ever escapes the per-URL boundary.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The input URL could not be parsed or is structurally unusable.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The URL parses but names an operation we do not support
    /// (e.g. a Reddit search page, a profile URL via `/search`).
    #[error("unsupported url: {0}")]
    Unsupported(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Connection-level failure talking to an upstream.
    #[error("request failed: {0}")]
    Request(String),

    /// The response arrived but is missing the fields we need.
    #[error("unexpected response shape: {0}")]
    ContentShape(String),

    /// Dedicated sentinel: the body sniffed as something other than a
    /// PDF, so callers can fall back to the webpage adapter.
    #[error("content is not a pdf (detected {detected})")]
    NotPdf { detected: String },

    /// Declared Content-Length exceeds the PDF size cap.
    #[error("pdf exceeds size limit ({size} bytes > {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    /// An adapter needs credentials that were not configured.
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    /// The interactive login flow was rejected.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// An external tool (pdftotext) failed or was unavailable.
    #[error("external tool failed: {0}")]
    Tool(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Whether a failure looks unlikely to change on a quick retry.
    ///
    /// Only these failures are cached (briefly) to avoid hammering dead
    /// URLs. Timeouts and cancellations are transient by construction
    /// and must never be cached; everything else is treated as
    /// permanent-looking. The classifier deliberately over-caches
    /// rather than re-fetching known-bad URLs.
    pub fn is_likely_permanent(&self) -> bool {
        !matches!(self, ExtractError::Timeout(_) | ExtractError::Cancelled)
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ExtractError::Request(err.to_string())
        }
    }
}
