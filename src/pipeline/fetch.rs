//! Document fetch: resolve a quiz's stored document reference to bytes.
//!
//! [`BlobStore`] is the seam to object storage. Two implementations ship
//! with the crate:
//!
//! * [`LocalBlobStore`]: keys are paths relative to a root directory
//!   (handy for development and tests with real PDFs).
//! * [`HttpBlobStore`]: keys are appended to a base URL; works with any
//!   bucket that serves objects over HTTP(S) (public buckets, presigning
//!   proxies, CDN fronts).

use crate::config::QuizConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Object storage holding the quiz documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download the object stored under `key`.
    async fn download(&self, key: &str) -> Result<Vec<u8>, FetchError>;
}

/// `true` when the bytes start with the `%PDF` magic.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a key to a path under the root. Keys that try to escape the root
    /// (`..`, absolute paths) resolve to `None`.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let rel = Path::new(key.trim_start_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn download(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(key).ok_or_else(|| FetchError::NotFound {
            key: key.to_string(),
        })?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(FetchError::Transport {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Blob store reachable over HTTP(S) at `base_url/<key>`.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, FetchError> {
        let base_url = base_url.into();
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                key: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    /// Client with [`QuizConfig::download_timeout_secs`] as its timeout.
    pub fn from_config(base_url: impl Into<String>, config: &QuizConfig) -> Result<Self, FetchError> {
        Self::new(base_url, config.download_timeout_secs)
    }

    /// Per-request timeout of the underlying client.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn download(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.object_url(key);
        info!("Downloading document from: {}", url);

        let transport = |reason: String| FetchError::Transport {
            key: key.to_string(),
            reason,
        };

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                transport(format!("timed out: {e}"))
            } else {
                transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            return Err(transport(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport(e.to_string()))?;
        debug!("Downloaded {} bytes for {}", bytes.len(), key);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_magic() {
        assert!(looks_like_pdf(b"%PDF-1.7\n..."));
        assert!(!looks_like_pdf(b"<html>"));
        assert!(!looks_like_pdf(b""));
    }

    #[test]
    fn object_url_joins_cleanly() {
        let store = HttpBlobStore::new("https://cdn.example.com/docs/", 5).unwrap();
        assert_eq!(
            store.object_url("/quiz/1.pdf"),
            "https://cdn.example.com/docs/quiz/1.pdf"
        );
    }

    #[test]
    fn configured_download_timeout_reaches_the_client() {
        let config = QuizConfig::builder().download_timeout_secs(30).build().unwrap();
        let store = HttpBlobStore::from_config("https://cdn.example.com", &config).unwrap();
        assert_eq!(store.timeout(), Duration::from_secs(30));

        let default = HttpBlobStore::from_config("https://cdn.example.com", &QuizConfig::default())
            .unwrap();
        assert_eq!(default.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn local_keys_cannot_escape_root() {
        let store = LocalBlobStore::new("/srv/docs");
        assert!(store.resolve("../etc/passwd").is_none());
        assert_eq!(
            store.resolve("a/b.pdf"),
            Some(PathBuf::from("/srv/docs/a/b.pdf"))
        );
    }

    #[tokio::test]
    async fn local_download_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"%PDF-1.4 test").unwrap();
        let store = LocalBlobStore::new(dir.path());

        let bytes = store.download("doc.pdf").await.unwrap();
        assert!(looks_like_pdf(&bytes));

        let err = store.download("missing.pdf").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }
}
