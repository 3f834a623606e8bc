//! # Skimmer API
//!
//! The HTTP surface: `/search`, `/extract` and `/health`, plus the
//! state wiring that connects handlers to the cache, the search client
//! and the two worker pools. The binary entrypoint in `main.rs` builds
//! the production state; tests assemble the same router around stub
//! processors.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod processor;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Request-wide budget; individual adapters enforce tighter ones.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Assemble the service router over an [`AppState`].
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(handlers::search::search))
        .route("/extract", post(handlers::extract::extract))
        .route("/health", get(handlers::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
