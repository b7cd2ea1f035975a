//! Extraction results - exactly one per source document.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AsyncOcrError, FetchError, StorageError, ValidationError};
use crate::types::document::DocumentId;

/// Which route produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    /// Plain text downloaded as-is
    Direct,
    /// Tags stripped from markup
    Markup,
    /// Single-call OCR
    SyncOcr,
    /// Job-based OCR through temporary storage
    AsyncOcr,
}

/// Non-empty extracted text with page and line counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    text: String,
    pages: usize,
    lines: usize,
    path: ExtractionPath,
}

impl ExtractedText {
    /// Returns `None` when the text is blank.
    pub fn new(text: impl Into<String>, pages: usize, path: ExtractionPath) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
        Some(Self {
            text,
            pages: pages.max(1),
            lines,
            path,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn path(&self) -> ExtractionPath {
        self.path
    }

    /// SHA-256 of the text, hex encoded.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Reason code for a failed extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Fetch,
    Validation,
    AsyncFailed,
    AsyncTimeout,
    Storage,
    EmptyText,
    Cancelled,
}

impl FailureReason {
    pub fn code(self) -> &'static str {
        match self {
            FailureReason::Fetch => "fetch_error",
            FailureReason::Validation => "validation_error",
            FailureReason::AsyncFailed => "async_failure",
            FailureReason::AsyncTimeout => "async_timeout",
            FailureReason::Storage => "storage_error",
            FailureReason::EmptyText => "empty_text",
            FailureReason::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub reason: FailureReason,
    pub message: String,
}

impl ExtractionFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn empty_text() -> Self {
        Self::new(FailureReason::EmptyText, "no text extracted")
    }
}

impl From<FetchError> for ExtractionFailure {
    fn from(e: FetchError) -> Self {
        Self::new(FailureReason::Fetch, e.to_string())
    }
}

impl From<ValidationError> for ExtractionFailure {
    fn from(e: ValidationError) -> Self {
        Self::new(FailureReason::Validation, e.to_string())
    }
}

impl From<StorageError> for ExtractionFailure {
    fn from(e: StorageError) -> Self {
        Self::new(FailureReason::Storage, e.to_string())
    }
}

impl From<AsyncOcrError> for ExtractionFailure {
    fn from(e: AsyncOcrError) -> Self {
        let reason = match &e {
            AsyncOcrError::Timeout { .. } => FailureReason::AsyncTimeout,
            AsyncOcrError::Storage(_) => FailureReason::Storage,
            AsyncOcrError::Cancelled => FailureReason::Cancelled,
            AsyncOcrError::Failed { .. } | AsyncOcrError::Service(_) => {
                FailureReason::AsyncFailed
            }
        };
        Self::new(reason, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Extracted(ExtractedText),
    Failed(ExtractionFailure),
}

/// The outcome of processing one source document. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: DocumentId,
    pub outcome: ExtractionOutcome,
}

impl ExtractionResult {
    pub fn extracted(document_id: DocumentId, text: ExtractedText) -> Self {
        Self {
            document_id,
            outcome: ExtractionOutcome::Extracted(text),
        }
    }

    pub fn failed(document_id: DocumentId, failure: impl Into<ExtractionFailure>) -> Self {
        Self {
            document_id,
            outcome: ExtractionOutcome::Failed(failure.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Extracted(_))
    }

    pub fn text(&self) -> Option<&ExtractedText> {
        match &self.outcome {
            ExtractionOutcome::Extracted(t) => Some(t),
            ExtractionOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match &self.outcome {
            ExtractionOutcome::Failed(f) => Some(f),
            ExtractionOutcome::Extracted(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.failure().map(|f| f.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_blank_text_rejected() {
        assert!(ExtractedText::new("  \n\t ", 1, ExtractionPath::SyncOcr).is_none());
    }

    #[test]
    fn test_counts() {
        let text = ExtractedText::new("line one\n\nline two\nline three", 0, ExtractionPath::Direct)
            .unwrap();
        assert_eq!(text.lines(), 3);
        assert_eq!(text.pages(), 1);
        assert_eq!(text.content_hash().len(), 64);
    }

    #[test]
    fn test_async_error_reasons() {
        let timeout = ExtractionFailure::from(AsyncOcrError::Timeout {
            job_id: "j".into(),
            waited: Duration::from_secs(300),
        });
        assert_eq!(timeout.reason, FailureReason::AsyncTimeout);

        let failed = ExtractionFailure::from(AsyncOcrError::Failed {
            message: "bad".into(),
        });
        assert_eq!(failed.reason, FailureReason::AsyncFailed);
        assert_eq!(failed.reason.code(), "async_failure");
    }
}
