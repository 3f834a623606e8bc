//! Session cookie persistence.
//!
//! One JSON file holds the browser session between process runs; it is
//! the adapter's only durable state. A read-write lock keeps concurrent
//! extractions from interleaving loads with a login's save.

use serde::{Deserialize, Serialize};
use skimmer_types::ExtractError;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// The cookie fields needed to restore a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

/// File-backed cookie jar guarded by a read-write lock.
pub struct CookieStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub async fn exists(&self) -> bool {
        let _guard = self.lock.read().await;
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Load cookies, or `None` when no file exists yet. A corrupt file
    /// reads as absent so the caller falls through to a fresh login.
    pub async fn load(&self) -> Option<Vec<StoredCookie>> {
        let _guard = self.lock.read().await;
        let raw = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(cookies) => Some(cookies),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "cookie file unreadable");
                None
            }
        }
    }

    /// Serialize cookies to the file under the exclusive lock.
    pub async fn save(&self, cookies: &[StoredCookie]) -> Result<(), ExtractError> {
        let _guard = self.lock.write().await;
        let bytes = serde_json::to_vec_pretty(cookies)
            .map_err(|e| ExtractError::Tool(format!("encoding cookies: {}", e)))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| ExtractError::Tool(format!("writing cookie file: {}", e)))?;
        debug!(path = %self.path.display(), count = cookies.len(), "session cookies saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str) -> StoredCookie {
        StoredCookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".x.com".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));

        assert!(!store.exists().await);
        store.save(&[cookie("auth_token"), cookie("ct0")]).await.unwrap();
        assert!(store.exists().await);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "auth_token");
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = CookieStore::new(&path);
        assert!(store.load().await.is_none());
    }
}
