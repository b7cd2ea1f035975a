//! Loads extracted documents and entity graphs into the graph database.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::entities::{KnowledgeGraph, MIN_TEXT_CHARS};
use super::gremlin::{chunk_chars, Traversal};
use crate::error::{GraphError, GraphResult};
use crate::traits::graph::{GraphClient, GraphConnector};

/// Longest text stored on a single vertex.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 30_000;

/// One document to load.
#[derive(Debug, Clone, Default)]
pub struct GraphDocument {
    pub id: String,
    pub text: String,
    pub title: Option<String>,
    pub date: Option<String>,
    pub page_number: Option<u32>,
}

impl GraphDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_page_number(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Writes documents into a graph through an injected connector.
///
/// Each `load*` call opens its own client and closes it before returning,
/// including when loading fails part way.
pub struct GraphLoader {
    connector: Arc<dyn GraphConnector>,
    max_chunk_chars: usize,
}

impl GraphLoader {
    pub fn new(connector: Arc<dyn GraphConnector>) -> Self {
        Self {
            connector,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }

    pub fn with_max_chunk_chars(mut self, max: usize) -> Self {
        self.max_chunk_chars = max.max(1);
        self
    }

    pub async fn load(&self, documents: &[GraphDocument]) -> GraphResult<LoadReport> {
        let mut client = self.connector.connect().await?;
        let mut report = LoadReport::default();

        for doc in documents {
            if doc.text.trim().chars().count() < MIN_TEXT_CHARS {
                debug!(document_id = %doc.id, "Skipping short document");
                report.skipped += 1;
                continue;
            }
            match self.load_document(client.as_mut(), doc).await {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    warn!(document_id = %doc.id, error = %e, "Failed to load document");
                    report.failed += 1;
                }
            }
        }

        close(client.as_mut()).await;
        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failed,
            "Graph load complete"
        );
        Ok(report)
    }

    pub async fn load_entities(&self, graphs: &[KnowledgeGraph]) -> GraphResult<LoadReport> {
        let mut client = self.connector.connect().await?;
        let mut report = LoadReport::default();

        for graph in graphs {
            if graph.is_empty() {
                report.skipped += 1;
                continue;
            }
            match load_graph(client.as_mut(), graph).await {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    warn!(document_id = %graph.document_id, error = %e, "Failed to load entities");
                    report.failed += 1;
                }
            }
        }

        close(client.as_mut()).await;
        Ok(report)
    }

    async fn load_document(&self, client: &mut dyn GraphClient, doc: &GraphDocument) -> GraphResult<()> {
        let chunks = chunk_chars(&doc.text, self.max_chunk_chars);
        let text_length = doc.text.chars().count();

        let vertex = Traversal::add_vertex("Document")
            .property("id", doc.id.as_str())
            .property("document_text", chunks[0])
            .property("text_length", text_length)
            .property("chunk_count", chunks.len())
            .property("loaded_at", Utc::now().to_rfc3339())
            .property_opt("title", doc.title.as_deref())
            .property_opt("publication_date", doc.date.as_deref())
            .property_opt("page_number", doc.page_number);

        match client.submit(vertex.as_str()).await {
            Ok(_) => {}
            Err(GraphError::AlreadyExists(_)) => {
                debug!(document_id = %doc.id, "Document exists, updating");
                let update = Traversal::vertex(&doc.id)
                    .property("document_text", chunks[0])
                    .property("text_length", text_length)
                    .property("chunk_count", chunks.len())
                    .property("updated_at", Utc::now().to_rfc3339());
                client.submit(update.as_str()).await?;
            }
            Err(e) => return Err(e),
        }

        if chunks.len() > 1 {
            for (index, chunk) in chunks.iter().enumerate() {
                let chunk_id = format!("{}_chunk_{}", doc.id, index);
                if let Err(e) = load_chunk(client, &doc.id, &chunk_id, index, chunk).await {
                    warn!(chunk_id = %chunk_id, error = %e, "Failed to load chunk");
                }
            }
        }
        Ok(())
    }
}

async fn load_chunk(
    client: &mut dyn GraphClient,
    parent: &str,
    chunk_id: &str,
    index: usize,
    text: &str,
) -> GraphResult<()> {
    let vertex = Traversal::add_vertex("DocumentChunk")
        .property("id", chunk_id)
        .property("chunk_text", text)
        .property("chunk_index", index)
        .property("parent_document", parent);
    match client.submit(vertex.as_str()).await {
        Ok(_) | Err(GraphError::AlreadyExists(_)) => {}
        Err(e) => return Err(e),
    }

    let edge = Traversal::add_edge("HAS_CHUNK", parent, chunk_id).property("chunk_index", index);
    match client.submit(edge.as_str()).await {
        Ok(_) | Err(GraphError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn load_graph(client: &mut dyn GraphClient, graph: &KnowledgeGraph) -> GraphResult<()> {
    for entity in &graph.entities {
        let vertex = Traversal::add_vertex(entity.entity_type.label())
            .property("id", entity.id.as_str())
            .property("name", entity.name.as_str())
            .property("document_id", graph.document_id.as_str())
            .property_opt("confidence", entity.confidence);
        match client.submit(vertex.as_str()).await {
            Ok(_) | Err(GraphError::AlreadyExists(_)) => {}
            Err(e) => return Err(e),
        }
    }
    for rel in &graph.relationships {
        let edge = Traversal::add_edge(&rel.relationship_type, &rel.source, &rel.target)
            .property("document_id", graph.document_id.as_str())
            .property_opt("confidence", rel.confidence);
        if let Err(e) = client.submit(edge.as_str()).await {
            warn!(source = %rel.source, target = %rel.target, error = %e, "Failed to add relationship");
        }
    }
    Ok(())
}

async fn close(client: &mut dyn GraphClient) {
    if let Err(e) = client.close().await {
        warn!(error = %e, "Failed to close graph connection");
    }
}
