//! Collection run: sources in, text records and a run summary out.

pub mod summary;

pub use summary::{RunSummary, SourceStats};

use std::sync::Arc;
use std::time::Instant;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ocr::ExtractionCoordinator;
use crate::traits::index::IndexSync;
use crate::traits::source::DocumentSource;
use crate::traits::storage::ObjectStore;
use crate::types::config::PipelineConfig;
use crate::types::document::SourceItem;
use crate::types::record::SourceKind;
use crate::types::result::ExtractedText;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// What happened to one logical document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Stored { key: String, bytes: usize },
    Failed(String),
    /// The run was cancelled before a candidate produced text
    Cancelled,
}

pub struct Pipeline {
    sources: Vec<Arc<dyn DocumentSource>>,
    coordinator: Arc<ExtractionCoordinator>,
    store: Arc<dyn ObjectStore>,
    index_sync: Option<Arc<dyn IndexSync>>,
    limiter: Option<Arc<DirectRateLimiter>>,
    cancel: CancellationToken,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        coordinator: Arc<ExtractionCoordinator>,
        store: Arc<dyn ObjectStore>,
        config: PipelineConfig,
    ) -> Self {
        let limiter = Quota::with_period(config.request_interval)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(nonzero!(1u32)))));
        Self {
            sources: Vec::new(),
            coordinator,
            store,
            index_sync: None,
            limiter,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Stop picking up items once `token` is cancelled. The summary is
    /// still written.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Start an index sync after the summary is written.
    pub fn with_index_sync(mut self, index_sync: Arc<dyn IndexSync>) -> Self {
        self.index_sync = Some(index_sync);
        self
    }

    /// Run every source in order and write the summary.
    ///
    /// Item and source failures are counted in the summary; only failing to
    /// write the summary itself is an error.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::new();
        let keep = self.config.max_reported_errors;

        for source in &self.sources {
            if self.cancel.is_cancelled() {
                break;
            }
            let kind = source.kind();
            summary.start_source(kind);
            info!(source = source.name(), "Collecting source");

            let listing = match source.collect().await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Source listing failed");
                    summary.record_error(format!("{}: {}", source.name(), e), keep);
                    continue;
                }
            };
            for error in listing.errors {
                summary.record_error(format!("{}: {}", source.name(), error), keep);
            }

            for item in &listing.items {
                match self.process_item(item).await {
                    ItemOutcome::Stored { .. } => summary.record_success(kind),
                    ItemOutcome::Failed(message) => {
                        summary.record_failure(kind, format!("{}: {}", item.id, message), keep)
                    }
                    ItemOutcome::Cancelled => break,
                }
            }
            log_source_stats(kind, &summary);
        }

        if self.cancel.is_cancelled() {
            warn!(processed = summary.total_items, "Collection run cancelled");
            summary.cancelled = true;
        }

        summary.elapsed_seconds = started.elapsed().as_secs_f64();
        self.write_summary(&summary).await?;

        match &self.index_sync {
            Some(_) if summary.cancelled => debug!("Skipping index sync for a cancelled run"),
            Some(index_sync) => match index_sync.start_sync().await {
                Ok(job) => {
                    info!(job_id = %job.job_id, status = %job.status, "Index sync started");
                    summary.index_sync = Some(job);
                }
                Err(e) => warn!(error = %e, "Index sync failed to start"),
            },
            None => {}
        }

        info!(
            total = summary.total_items,
            succeeded = summary.total_succeeded,
            failed = summary.total_failed,
            elapsed_seconds = summary.elapsed_seconds,
            "Collection run complete"
        );
        Ok(summary)
    }

    /// Try each candidate in priority order; the first extracted text wins.
    pub async fn process_item(&self, item: &SourceItem) -> ItemOutcome {
        if let Some(reason) = item.unavailable() {
            debug!(document_id = %item.id, reason, "Renditions unavailable");
            return ItemOutcome::Failed(reason.to_string());
        }
        if !item.has_candidates() {
            debug!(document_id = %item.id, "No text renditions");
            return ItemOutcome::Failed("no text available".to_string());
        }

        let mut last_failure = String::new();
        for candidate in item.candidates() {
            if let Some(limiter) = &self.limiter {
                tokio::select! {
                    _ = self.cancel.cancelled() => return ItemOutcome::Cancelled,
                    _ = limiter.until_ready() => {}
                }
            }
            if self.cancel.is_cancelled() {
                return ItemOutcome::Cancelled;
            }

            let result = self.coordinator.process(candidate).await;
            match result.text() {
                Some(text) => {
                    info!(
                        document_id = %item.id,
                        kind = %candidate.kind,
                        path = ?text.path(),
                        pages = text.pages(),
                        "Extracted text"
                    );
                    return self.persist(item, text).await;
                }
                None => {
                    if let Some(failure) = result.failure() {
                        debug!(
                            document_id = %item.id,
                            kind = %candidate.kind,
                            reason = failure.reason.code(),
                            "Candidate failed"
                        );
                        last_failure = format!("{}: {}", failure.reason.code(), failure.message);
                    }
                }
            }
        }
        ItemOutcome::Failed(last_failure)
    }

    async fn persist(&self, item: &SourceItem, text: &ExtractedText) -> ItemOutcome {
        let record = item.header.compose(text.text()).into_bytes();
        let bytes = record.len();
        if bytes > self.config.max_record_bytes {
            warn!(document_id = %item.id, bytes, max = self.config.max_record_bytes, "Record too large");
            return ItemOutcome::Failed(format!(
                "record too large: {} bytes (maximum {})",
                bytes, self.config.max_record_bytes
            ));
        }

        let key = item.header.output_key();
        match self
            .store
            .put(&self.config.output_bucket, &key, record, "text/plain")
            .await
        {
            Ok(()) => {
                info!(document_id = %item.id, key = %key, bytes, "Stored record");
                ItemOutcome::Stored { key, bytes }
            }
            Err(e) => {
                warn!(document_id = %item.id, key = %key, error = %e, "Failed to store record");
                ItemOutcome::Failed(format!("save failed: {}", e))
            }
        }
    }

    async fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        let body = serde_json::to_vec_pretty(summary)?;
        self.store
            .put(
                &self.config.output_bucket,
                &self.config.summary_key,
                body,
                "application/json",
            )
            .await?;
        debug!(key = %self.config.summary_key, "Wrote run summary");
        Ok(())
    }
}

fn log_source_stats(kind: SourceKind, summary: &RunSummary) {
    let stats = summary.stats(kind);
    info!(
        source = ?kind,
        total = stats.total,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "Source complete"
    );
}
