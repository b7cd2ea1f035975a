//! Graph database boundary with an explicit connect/close lifecycle.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GraphResult;

/// Opens connections to the graph database.
///
/// Injected into the loader; there is no process-wide shared client.
#[async_trait]
pub trait GraphConnector: Send + Sync {
    async fn connect(&self) -> GraphResult<Box<dyn GraphClient>>;
}

/// An open graph connection. Must be closed by whoever connected it.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Submit one Gremlin traversal and return its result.
    async fn submit(&mut self, query: &str) -> GraphResult<Value>;

    async fn close(&mut self) -> GraphResult<()>;
}
