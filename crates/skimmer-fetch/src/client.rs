//! HTTP client construction.
//!
//! The service shares a single connection-pooled client. Adapters that
//! need a different timeout get a separate client built with the same
//! settings rather than a mutation of the shared one.

use anyhow::{Context, Result};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Build the process-wide HTTP client.
///
/// No default request timeout: callers set one per request or use
/// [`client_with_timeout`] for an adapter-wide override.
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .gzip(true)
        .build()
        .context("failed to build shared HTTP client")
}

/// A client with the shared settings plus a fixed request timeout.
pub fn client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .gzip(true)
        .timeout(timeout)
        .build()
        .context("failed to build timeout HTTP client")
}
