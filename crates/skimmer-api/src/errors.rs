//! API-level errors with HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced as HTTP responses. Per-URL extraction failures never
/// land here; they ride inside a 200 response as failed results. Only
/// invalid input and a failed search itself reach this type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request payload (400).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The search operation itself failed (500).
    #[error("search failed: {message}")]
    Search { message: String },

    /// Anything else (500).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Search { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Search { .. } => "search_error",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        });
        (status, Json(body)).into_response()
    }
}
