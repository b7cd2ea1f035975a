//! Search-index ingestion trigger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexSyncError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    pub job_id: String,
    pub status: String,
}

/// Starts re-ingestion of persisted records into the retrieval index.
#[async_trait]
pub trait IndexSync: Send + Sync {
    async fn start_sync(&self) -> Result<SyncJob, IndexSyncError>;
}
