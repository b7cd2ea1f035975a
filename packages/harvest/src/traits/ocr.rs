//! OCR service boundaries: single-call sync detection and job-based async
//! detection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AsyncOcrError, SyncDetectError};

/// Granularity of a detected text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    Other,
}

/// One block of OCR output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub block_type: BlockType,
    pub text: Option<String>,
    /// 1-based page number, when the service reports one
    pub page: Option<u32>,
}

impl TextBlock {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Line,
            text: Some(text.into()),
            page: None,
        }
    }

    pub fn page() -> Self {
        Self {
            block_type: BlockType::Page,
            text: None,
            page: None,
        }
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// Closed set of reasons a sync detection call can fail.
///
/// Adapters classify service exceptions into one of these by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// Multi-page or otherwise unsupported by the single-call API
    UnsupportedDocument,
    InvalidParameter,
    /// Malformed or corrupt input
    BadDocument,
    DocumentTooLarge,
    Throttled,
    /// Anything else reported by the service or transport
    Service,
}

impl SyncErrorKind {
    /// Kinds that routinely mean "send it to the async API instead".
    pub fn is_expected_fallback(self) -> bool {
        matches!(
            self,
            SyncErrorKind::UnsupportedDocument
                | SyncErrorKind::InvalidParameter
                | SyncErrorKind::DocumentTooLarge
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncErrorKind::UnsupportedDocument => "unsupported_document",
            SyncErrorKind::InvalidParameter => "invalid_parameter",
            SyncErrorKind::BadDocument => "bad_document",
            SyncErrorKind::DocumentTooLarge => "document_too_large",
            SyncErrorKind::Throttled => "throttled",
            SyncErrorKind::Service => "service",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-call text detection on in-memory bytes.
#[async_trait]
pub trait SyncTextDetector: Send + Sync {
    async fn detect_text(&self, bytes: &[u8]) -> Result<Vec<TextBlock>, SyncDetectError>;

    fn name(&self) -> &str {
        "unknown"
    }
}

/// A bucket/key pair. With an empty key it names a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

impl StorageLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Status of an async OCR job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InProgress,
    Succeeded,
    /// Some pages failed; the rest are readable
    PartialSuccess,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }

    pub fn is_success(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::PartialSuccess)
    }
}

/// One response page of an async job status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPage {
    pub status: JobStatus,
    pub blocks: Vec<TextBlock>,
    /// More result pages remain when set
    pub next_token: Option<String>,
    pub status_message: Option<String>,
}

impl JobPage {
    pub fn in_progress() -> Self {
        Self {
            status: JobStatus::InProgress,
            blocks: Vec::new(),
            next_token: None,
            status_message: None,
        }
    }

    pub fn succeeded(blocks: Vec<TextBlock>) -> Self {
        Self {
            status: JobStatus::Succeeded,
            blocks,
            next_token: None,
            status_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            blocks: Vec::new(),
            next_token: None,
            status_message: Some(message.into()),
        }
    }

    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }
}

/// Job-based text detection over a staged storage object.
#[async_trait]
pub trait AsyncTextDetector: Send + Sync {
    /// Start a job reading `source` and writing results under `output`.
    async fn start_job(
        &self,
        source: &StorageLocation,
        output: &StorageLocation,
    ) -> Result<String, AsyncOcrError>;

    /// Status plus one page of results. Pass the previous page's
    /// `next_token` to continue.
    async fn get_job(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<JobPage, AsyncOcrError>;

    fn name(&self) -> &str {
        "unknown"
    }
}
