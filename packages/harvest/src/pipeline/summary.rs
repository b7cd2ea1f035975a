//! Per-run collection statistics.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::traits::index::SyncJob;
use crate::types::record::SourceKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Written as JSON to the output bucket at the end of every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// In the order sources were run
    pub sources: IndexMap<SourceKind, SourceStats>,
    pub total_items: usize,
    pub total_succeeded: usize,
    pub total_failed: usize,
    pub elapsed_seconds: f64,
    /// First failure messages, capped
    pub errors: Vec<String>,
    pub error_count: usize,
    /// Stopped early; later items were never attempted
    #[serde(default)]
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_sync: Option<SyncJob>,
    pub timestamp: DateTime<Utc>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            sources: IndexMap::new(),
            total_items: 0,
            total_succeeded: 0,
            total_failed: 0,
            elapsed_seconds: 0.0,
            errors: Vec::new(),
            error_count: 0,
            cancelled: false,
            index_sync: None,
            timestamp: Utc::now(),
        }
    }

    pub fn stats(&self, kind: SourceKind) -> SourceStats {
        self.sources.get(&kind).copied().unwrap_or_default()
    }

    pub(crate) fn start_source(&mut self, kind: SourceKind) {
        self.sources.entry(kind).or_default();
    }

    pub(crate) fn record_success(&mut self, kind: SourceKind) {
        let stats = self.sources.entry(kind).or_default();
        stats.total += 1;
        stats.succeeded += 1;
        self.total_items += 1;
        self.total_succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self, kind: SourceKind, message: String, keep: usize) {
        let stats = self.sources.entry(kind).or_default();
        stats.total += 1;
        stats.failed += 1;
        self.total_items += 1;
        self.total_failed += 1;
        self.record_error(message, keep);
    }

    /// An error not tied to one item, such as a source listing failure.
    pub(crate) fn record_error(&mut self, message: String, keep: usize) {
        self.error_count += 1;
        if self.errors.len() < keep {
            self.errors.push(message);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.total_failed == 0 && self.error_count == 0 && !self.cancelled
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_error_cap() {
        let mut summary = RunSummary::new();
        summary.start_source(SourceKind::Newspapers);
        summary.record_success(SourceKind::CongressBills);
        for i in 0..3 {
            summary.record_failure(SourceKind::CongressBills, format!("bill {}", i), 2);
        }

        assert_eq!(
            summary.stats(SourceKind::CongressBills),
            SourceStats {
                total: 4,
                succeeded: 1,
                failed: 3
            }
        );
        assert_eq!(summary.stats(SourceKind::Newspapers), SourceStats::default());
        assert_eq!(summary.errors, vec!["bill 0", "bill 1"]);
        assert_eq!(summary.error_count, 3);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_serializes_source_names() {
        let mut summary = RunSummary::new();
        summary.record_success(SourceKind::Newspapers);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sources"]["newspapers"]["succeeded"], 1);
        assert!(json.get("index_sync").is_none());
    }
}
