//! Exports graph `Document` vertices as knowledge-base source files.
//!
//! Each vertex with text becomes `kb-documents/{id}.json` holding its id,
//! title, text and a flat string metadata map. The index sync then ingests
//! that prefix.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::gremlin::Traversal;
use crate::error::{GraphError, Result};
use crate::traits::graph::{GraphClient, GraphConnector};
use crate::traits::storage::ObjectStore;

pub const KB_DOCUMENT_PREFIX: &str = "kb-documents/";

/// Vertex properties copied into `metadata`, in this order.
const METADATA_KEYS: [&str; 4] = ["publication_date", "page_number", "source", "loaded_at"];

/// One knowledge-base source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metadata: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported: usize,
    pub skipped: usize,
    pub failed: usize,
    /// `s3://bucket/prefix` the files were written under
    pub location: String,
}

pub struct GraphExporter {
    connector: Arc<dyn GraphConnector>,
    prefix: String,
}

impl GraphExporter {
    pub fn new(connector: Arc<dyn GraphConnector>) -> Self {
        Self {
            connector,
            prefix: KB_DOCUMENT_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Write every `Document` vertex with text to `bucket`.
    ///
    /// A failed write skips that document; a failed query fails the export.
    /// The connection is closed either way.
    pub async fn export(&self, store: &dyn ObjectStore, bucket: &str) -> Result<ExportReport> {
        let mut client = self.connector.connect().await?;
        let rows = query_documents(client.as_mut()).await;
        if let Err(e) = client.close().await {
            warn!(error = %e, "Failed to close graph connection");
        }
        let rows = rows?;
        info!(documents = rows.len(), "Read document vertices");

        let mut report = ExportReport {
            location: format!("s3://{}/{}", bucket, self.prefix),
            ..Default::default()
        };
        for (index, row) in rows.iter().enumerate() {
            let Some(document) = kb_document(index, row) else {
                debug!(index, "Skipping document without text");
                report.skipped += 1;
                continue;
            };

            let key = format!("{}{}.json", self.prefix, document.id);
            let body = serde_json::to_vec_pretty(&document)?;
            match store.put(bucket, &key, body, "application/json").await {
                Ok(()) => {
                    report.exported += 1;
                    if report.exported % 10 == 0 {
                        debug!(exported = report.exported, "Exporting documents");
                    }
                }
                Err(e) => {
                    warn!(document_id = %document.id, key = %key, error = %e, "Failed to export document");
                    report.failed += 1;
                }
            }
        }

        info!(
            exported = report.exported,
            skipped = report.skipped,
            failed = report.failed,
            location = %report.location,
            "Graph export complete"
        );
        Ok(report)
    }
}

async fn query_documents(client: &mut dyn GraphClient) -> Result<Vec<Map<String, Value>>> {
    let result = client
        .submit(Traversal::value_maps("Document").as_str())
        .await?;
    value_map_rows(&result)
        .ok_or_else(|| GraphError::Query("unexpected valueMap result shape".to_string()).into())
}

/// Rows of a `valueMap` result, as plain JSON or typed GraphSON.
fn value_map_rows(result: &Value) -> Option<Vec<Map<String, Value>>> {
    let rows = match untyped(result) {
        Value::Array(rows) => rows,
        Value::Null => return Some(Vec::new()),
        _ => return None,
    };
    rows.iter().map(value_map).collect()
}

fn value_map(row: &Value) -> Option<Map<String, Value>> {
    if let Some(typed) = row.get("@value").filter(|_| row.get("@type").is_some()) {
        // g:Map is a flat [key, value, key, value, ...] list
        let pairs = typed.as_array()?;
        return pairs
            .chunks(2)
            .map(|pair| match pair {
                [key, value] => Some((scalar(key)?, value.clone())),
                _ => None,
            })
            .collect();
    }
    row.as_object().cloned()
}

/// Strip a GraphSON `{"@type", "@value"}` wrapper.
fn untyped(value: &Value) -> &Value {
    match value.get("@value") {
        Some(inner) if value.get("@type").is_some() => untyped(inner),
        _ => value,
    }
}

/// First value of a property, as a string.
fn scalar(value: &Value) -> Option<String> {
    match untyped(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(values) => values.first().and_then(scalar),
        _ => None,
    }
}

fn property(row: &Map<String, Value>, key: &str) -> Option<String> {
    row.get(key).and_then(scalar)
}

/// `None` when the vertex has no text.
pub fn kb_document(index: usize, row: &Map<String, Value>) -> Option<KbDocument> {
    let content = property(row, "document_text").filter(|text| !text.is_empty())?;
    let metadata = METADATA_KEYS
        .iter()
        .filter_map(|key| {
            property(row, key)
                .filter(|value| !value.is_empty())
                .map(|value| (key.to_string(), value))
        })
        .collect();

    Some(KbDocument {
        id: property(row, "id").unwrap_or_else(|| format!("doc-{}", index)),
        title: property(row, "title").unwrap_or_else(|| "Untitled".to_string()),
        content,
        metadata,
    })
}
