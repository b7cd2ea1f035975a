//! Upstream document sources.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::{document::SourceItem, record::SourceKind};

/// Items listed by one source plus the listing calls that failed along the
/// way without ending the listing.
#[derive(Debug, Clone, Default)]
pub struct SourceCollection {
    pub items: Vec<SourceItem>,
    pub errors: Vec<String>,
}

impl SourceCollection {
    pub fn new(items: Vec<SourceItem>) -> Self {
        Self {
            items,
            errors: Vec::new(),
        }
    }
}

/// Lists logical documents, each with its candidate renditions.
///
/// An `Err` means nothing could be listed at all.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn collect(&self) -> Result<SourceCollection, SourceError>;

    fn kind(&self) -> SourceKind;

    fn name(&self) -> &str {
        "unknown"
    }
}
