//! Cache key construction.
//!
//! Truncation is applied before storage, so results cached under
//! different character caps are distinct entries: `content:<url>:full`
//! when no cap was requested, `content:<url>:<N>` otherwise.

/// Key for a cached search-result URL list.
pub fn search_key(query: &str) -> String {
    format!("search:{}", query)
}

/// Key for a cached per-URL extraction result at a given character cap.
pub fn content_key(url: &str, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(n) => format!("content:{}:{}", url, n),
        None => format!("content:{}:full", url),
    }
}
