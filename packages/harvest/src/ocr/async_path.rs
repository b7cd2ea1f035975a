//! Job-based OCR through temporary object storage.
//!
//! Source bytes are staged under a per-invocation key, a job is started
//! against them, and the job is polled at a fixed interval until it reaches
//! a terminal state or the wait budget runs out. On success every result
//! page is read by following continuation tokens.
//!
//! Staging and cleanup bracket the job: once an upload has been attempted,
//! the staged key and the job's output prefix are deleted exactly once,
//! whatever the outcome. Cleanup failures are reported as
//! [`CleanupWarning`]s and never replace the extraction result.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AsyncOcrError;
use crate::fetchers::ValidatedDocument;
use crate::ocr::sync_path::assemble_lines;
use crate::traits::ocr::{AsyncTextDetector, JobPage, JobStatus, StorageLocation, TextBlock};
use crate::traits::storage::ObjectStore;
use crate::types::config::ExtractionConfig;
use crate::types::document::DocumentId;

/// One in-flight async OCR job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncJobHandle {
    pub job_id: String,
    /// Where the source bytes were staged
    pub source: StorageLocation,
    /// Prefix the service writes result pages under
    pub output: StorageLocation,
}

/// A staged object that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub location: StorageLocation,
    pub message: String,
}

/// Everything the async path produced for one document.
#[derive(Debug)]
pub struct AsyncOutcome {
    pub result: Result<(String, usize), AsyncOcrError>,
    pub job_id: Option<String>,
    /// Status checks made before the job reached a terminal state
    pub polls: u64,
    pub cleanup: Vec<CleanupWarning>,
}

/// Runs documents through the async OCR service.
#[derive(Clone)]
pub struct AsyncExtractor {
    detector: Arc<dyn AsyncTextDetector>,
    store: Arc<dyn ObjectStore>,
    config: ExtractionConfig,
}

impl AsyncExtractor {
    pub fn new(
        detector: Arc<dyn AsyncTextDetector>,
        store: Arc<dyn ObjectStore>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            detector,
            store,
            config,
        }
    }

    /// Unique per invocation: document id, timestamp and a random suffix.
    fn staging_name(document_id: &DocumentId) -> String {
        format!(
            "{}-{}-{}",
            document_id,
            Utc::now().format("%Y%m%d%H%M%S"),
            Uuid::new_v4().simple()
        )
    }

    fn extension(mime_type: &str) -> &'static str {
        match mime_type {
            "application/pdf" => "pdf",
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/tiff" => "tiff",
            _ => "bin",
        }
    }

    /// Stage, run and clean up one document.
    pub async fn extract(
        &self,
        document_id: &DocumentId,
        doc: &ValidatedDocument,
        cancel: &CancellationToken,
    ) -> AsyncOutcome {
        let name = Self::staging_name(document_id);
        let source = StorageLocation::new(
            &self.config.temp_bucket,
            format!(
                "{}/{}.{}",
                self.config.temp_prefix,
                name,
                Self::extension(doc.mime_type())
            ),
        );
        let output = StorageLocation::new(
            &self.config.temp_bucket,
            format!("{}/{}/", self.config.output_prefix, name),
        );

        let mut job_id = None;
        let mut polls = 0;
        let result = self
            .stage_and_run(doc, &source, &output, cancel, &mut job_id, &mut polls)
            .await;

        let cleanup = self.cleanup(&source, &output).await;

        match &result {
            Ok((text, pages)) => info!(
                document_id = %document_id,
                job_id = job_id.as_deref().unwrap_or_default(),
                pages,
                chars = text.len(),
                polls,
                "Async OCR complete"
            ),
            Err(e) => warn!(
                document_id = %document_id,
                job_id = job_id.as_deref().unwrap_or_default(),
                polls,
                error = %e,
                "Async OCR failed"
            ),
        }

        AsyncOutcome {
            result,
            job_id,
            polls,
            cleanup,
        }
    }

    async fn stage_and_run(
        &self,
        doc: &ValidatedDocument,
        source: &StorageLocation,
        output: &StorageLocation,
        cancel: &CancellationToken,
        job_id: &mut Option<String>,
        polls: &mut u64,
    ) -> Result<(String, usize), AsyncOcrError> {
        debug!(location = %source, bytes = doc.len(), "Staging document for async OCR");
        self.store
            .put(
                &source.bucket,
                &source.key,
                doc.bytes().to_vec(),
                doc.mime_type(),
            )
            .await?;

        let id = self.detector.start_job(source, output).await?;
        info!(job_id = %id, source = %source, "Async OCR job started");
        *job_id = Some(id.clone());

        let handle = AsyncJobHandle {
            job_id: id,
            source: source.clone(),
            output: output.clone(),
        };
        self.run_job(&handle, cancel, polls).await
    }

    /// Poll a started job to a terminal state and read all of its results.
    pub async fn run_job(
        &self,
        handle: &AsyncJobHandle,
        cancel: &CancellationToken,
        polls: &mut u64,
    ) -> Result<(String, usize), AsyncOcrError> {
        let first = self.wait_for_terminal(&handle.job_id, cancel, polls).await?;
        let blocks = self.collect_pages(&handle.job_id, first).await?;
        Ok(assemble_lines(&blocks))
    }

    async fn wait_for_terminal(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        polls: &mut u64,
    ) -> Result<JobPage, AsyncOcrError> {
        let poll = self.config.poll;
        let max_polls = poll.max_polls();
        let started = Instant::now();

        loop {
            if *polls >= max_polls {
                return Err(AsyncOcrError::Timeout {
                    job_id: job_id.to_string(),
                    waited: started.elapsed(),
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(AsyncOcrError::Cancelled),
                _ = sleep(poll.interval) => {}
            }

            let page = self.detector.get_job(job_id, None).await?;
            *polls += 1;

            match page.status {
                JobStatus::Succeeded | JobStatus::PartialSuccess => {
                    if page.status == JobStatus::PartialSuccess {
                        warn!(job_id, "Async OCR job partially succeeded");
                    }
                    return Ok(page);
                }
                JobStatus::Failed => {
                    return Err(AsyncOcrError::Failed {
                        message: page
                            .status_message
                            .unwrap_or_else(|| "job reported failure".to_string()),
                    });
                }
                JobStatus::InProgress => {
                    if *polls % 6 == 0 {
                        info!(job_id, polls = *polls, "Async OCR job in progress");
                    } else {
                        debug!(job_id, polls = *polls, "Async OCR job in progress");
                    }
                }
            }
        }
    }

    async fn collect_pages(
        &self,
        job_id: &str,
        first: JobPage,
    ) -> Result<Vec<TextBlock>, AsyncOcrError> {
        let mut blocks = first.blocks;
        let mut next = first.next_token;
        let mut seen = HashSet::new();
        let mut pages = 1;

        while let Some(token) = next {
            if !seen.insert(token.clone()) {
                return Err(AsyncOcrError::Service(format!(
                    "continuation token {} repeated for job {}",
                    token, job_id
                )));
            }
            let page = self.detector.get_job(job_id, Some(&token)).await?;
            blocks.extend(page.blocks);
            next = page.next_token;
            pages += 1;
        }

        debug!(job_id, result_pages = pages, blocks = blocks.len(), "Read async OCR results");
        Ok(blocks)
    }

    async fn cleanup(
        &self,
        source: &StorageLocation,
        output: &StorageLocation,
    ) -> Vec<CleanupWarning> {
        let mut warnings = Vec::new();

        if let Err(e) = self.store.delete(&source.bucket, &source.key).await {
            warnings.push(CleanupWarning {
                location: source.clone(),
                message: e.to_string(),
            });
        }

        match self.store.list(&output.bucket, &output.key).await {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = self.store.delete(&output.bucket, &key).await {
                        warnings.push(CleanupWarning {
                            location: StorageLocation::new(&output.bucket, key),
                            message: e.to_string(),
                        });
                    }
                }
            }
            Err(e) => warnings.push(CleanupWarning {
                location: output.clone(),
                message: e.to_string(),
            }),
        }

        for warning in &warnings {
            warn!(
                location = %warning.location,
                error = %warning.message,
                "Failed to clean up temporary OCR object"
            );
        }
        if warnings.is_empty() {
            debug!(location = %source, "Temporary OCR objects removed");
        }

        warnings
    }
}
