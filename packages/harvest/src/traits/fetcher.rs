//! Fetcher trait for downloading remote documents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchResult;

/// Raw bytes of a downloaded document plus what the server said about them.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects
    pub url: String,

    pub bytes: Vec<u8>,

    /// Declared `Content-Type`, lowercased, parameters stripped
    pub content_type: Option<String>,

    pub fetched_at: DateTime<Utc>,
}

impl FetchedDocument {
    pub fn new(url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            bytes: bytes.into(),
            content_type: None,
            fetched_at: Utc::now(),
        }
    }

    /// Set the declared content type. Parameters such as `charset` are
    /// dropped.
    pub fn with_content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.content_type = Some(normalize_content_type(content_type.as_ref()));
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub(crate) fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Downloads one URL. Stateless; no retries at this layer.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedDocument>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
