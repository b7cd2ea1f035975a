//! Extraction coordinator: one source document in, one result out.
//!
//! ```text
//! Fetched -> Validated -> [SyncAttempted -> SyncSucceeded | SyncFallback]
//!                      -> AsyncAttempted -> AsyncSucceeded | AsyncFailed | AsyncTimedOut
//! ```
//!
//! Documents at or below the sync threshold try the single-call API first;
//! any sync failure falls through to the async path exactly once. Larger
//! documents go straight to async. Async failures are terminal.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetchers::{validate, ValidatedDocument};
use crate::ocr::async_path::{AsyncExtractor, CleanupWarning};
use crate::ocr::sync_path::{run_sync, SyncOutcome};
use crate::text::{html_to_text, normalize_plain_text};
use crate::traits::fetcher::Fetcher;
use crate::traits::ocr::{AsyncTextDetector, SyncErrorKind, SyncTextDetector};
use crate::traits::storage::ObjectStore;
use crate::types::config::ExtractionConfig;
use crate::types::document::{ContentKind, DocumentId, SourceDocument};
use crate::types::result::{ExtractedText, ExtractionFailure, ExtractionPath, ExtractionResult};

/// Which routes one extraction took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionTrace {
    pub sync_attempted: bool,
    /// Set when a sync failure sent the document to async
    pub fallback: Option<SyncErrorKind>,
    pub async_attempted: bool,
    pub async_job_id: Option<String>,
    pub polls: u64,
    pub cleanup: Vec<CleanupWarning>,
}

pub struct ExtractionCoordinator {
    fetcher: Arc<dyn Fetcher>,
    sync_detector: Arc<dyn SyncTextDetector>,
    async_path: AsyncExtractor,
    config: ExtractionConfig,
    cancel: CancellationToken,
}

impl ExtractionCoordinator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        sync_detector: Arc<dyn SyncTextDetector>,
        async_detector: Arc<dyn AsyncTextDetector>,
        store: Arc<dyn ObjectStore>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            fetcher,
            sync_detector,
            async_path: AsyncExtractor::new(async_detector, store, config.clone()),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop in-flight polling when `token` is cancelled. Cleanup still runs.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Fetch, validate and extract one source document.
    pub async fn process(&self, doc: &SourceDocument) -> ExtractionResult {
        self.process_traced(doc).await.0
    }

    pub async fn process_traced(&self, doc: &SourceDocument) -> (ExtractionResult, ExtractionTrace) {
        let fetched = match self.fetcher.fetch(&doc.url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(document_id = %doc.id, url = %doc.url, error = %e, "Fetch failed");
                return (
                    ExtractionResult::failed(doc.id.clone(), e),
                    ExtractionTrace::default(),
                );
            }
        };

        let validated = match validate(fetched, doc.kind, &self.config.limits) {
            Ok(validated) => validated,
            Err(e) => {
                warn!(document_id = %doc.id, kind = %doc.kind, error = %e, "Validation failed");
                return (
                    ExtractionResult::failed(doc.id.clone(), e),
                    ExtractionTrace::default(),
                );
            }
        };

        match doc.kind {
            ContentKind::PlainText | ContentKind::Markup => (
                Self::extract_textual(&doc.id, &validated),
                ExtractionTrace::default(),
            ),
            ContentKind::Pdf | ContentKind::Image => {
                self.extract_traced(&doc.id, &validated).await
            }
        }
    }

    fn extract_textual(id: &DocumentId, doc: &ValidatedDocument) -> ExtractionResult {
        let body = doc.as_text().unwrap_or_default();
        let (text, path) = match doc.kind() {
            ContentKind::Markup => (html_to_text(body), ExtractionPath::Markup),
            _ => (normalize_plain_text(body), ExtractionPath::Direct),
        };
        match ExtractedText::new(text, 1, path) {
            Some(text) => ExtractionResult::extracted(id.clone(), text),
            None => ExtractionResult::failed(id.clone(), ExtractionFailure::empty_text()),
        }
    }

    /// OCR an already validated document.
    pub async fn extract(&self, id: &DocumentId, doc: &ValidatedDocument) -> ExtractionResult {
        self.extract_traced(id, doc).await.0
    }

    pub async fn extract_traced(
        &self,
        id: &DocumentId,
        doc: &ValidatedDocument,
    ) -> (ExtractionResult, ExtractionTrace) {
        let mut trace = ExtractionTrace::default();

        if doc.len() <= self.config.limits.sync_threshold {
            trace.sync_attempted = true;
            match run_sync(self.sync_detector.as_ref(), id, doc).await {
                SyncOutcome::Detected { text, pages } => {
                    let result = match ExtractedText::new(text, pages, ExtractionPath::SyncOcr) {
                        Some(text) => ExtractionResult::extracted(id.clone(), text),
                        None => {
                            warn!(document_id = %id, "Sync OCR found no text");
                            ExtractionResult::failed(id.clone(), ExtractionFailure::empty_text())
                        }
                    };
                    return (result, trace);
                }
                SyncOutcome::Fallback(e) => trace.fallback = Some(e.kind),
            }
        } else {
            debug!(
                document_id = %id,
                bytes = doc.len(),
                threshold = self.config.limits.sync_threshold,
                "Above sync threshold, using async OCR"
            );
        }

        trace.async_attempted = true;
        let outcome = self.async_path.extract(id, doc, &self.cancel).await;
        trace.async_job_id = outcome.job_id;
        trace.polls = outcome.polls;
        trace.cleanup = outcome.cleanup;

        let result = match outcome.result {
            Ok((text, pages)) => match ExtractedText::new(text, pages, ExtractionPath::AsyncOcr) {
                Some(text) => {
                    info!(document_id = %id, pages = text.pages(), lines = text.lines(), "Extracted text");
                    ExtractionResult::extracted(id.clone(), text)
                }
                None => ExtractionResult::failed(id.clone(), ExtractionFailure::empty_text()),
            },
            Err(e) => ExtractionResult::failed(id.clone(), e),
        };

        (result, trace)
    }
}
