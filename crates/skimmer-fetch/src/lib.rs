//! # Skimmer Fetch
//!
//! Shared HTTP plumbing: one pooled [`reqwest::Client`] for the whole
//! process, per-adapter timeout variants, and a rotating pool of
//! realistic desktop user agents.

pub mod client;
pub mod user_agent;

pub use client::{build_http_client, client_with_timeout};
pub use user_agent::random_desktop_user_agent;
