//! Stored records read back as graph input, and entity graph batches.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::entities::{EntityExtractor, KnowledgeGraph};
use super::loader::GraphDocument;
use crate::error::Result;
use crate::shapes::segments_from_json;
use crate::traits::storage::ObjectStore;

/// Where entity graph batches are written.
pub const KNOWLEDGE_GRAPH_PREFIX: &str = "knowledge_graphs/";

/// `extracted/congress_1/hr_7.txt` becomes `congress_1_hr_7`.
pub fn document_id_for_key(key: &str) -> String {
    let rest = key.split_once('/').map(|(_, r)| r).unwrap_or(key);
    let stem = rest
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(rest);
    stem.replace('/', "_")
}

/// Split a `#`-header text record into metadata and body.
///
/// Bodies without a header are taken whole.
pub fn parse_text_record(id: &str, body: &str) -> GraphDocument {
    let body = body.trim_start_matches('\u{feff}');
    let Some((header, text)) = body.split_once("\n---\n") else {
        return GraphDocument::new(id, body.trim());
    };
    if !header.starts_with('#') {
        return GraphDocument::new(id, body.trim());
    }

    let mut doc = GraphDocument::new(id, text.trim());
    for line in header.lines() {
        let Some((field, value)) = line.trim_start_matches('#').trim().split_once(": ") else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() || value == "N/A" {
            continue;
        }
        match field {
            "Title" => doc = doc.with_title(value),
            "Date" | "Introduced" => doc = doc.with_date(value),
            _ => {}
        }
    }
    doc
}

/// Text of a stored JSON extraction document, if any shape matches.
pub fn parse_json_record(id: &str, value: &Value) -> Option<GraphDocument> {
    let segments = segments_from_json(value);
    let text = segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return None;
    }
    let mut doc = GraphDocument::new(id, text);
    if let Some(page) = segments.iter().find_map(|s| s.page) {
        doc = doc.with_page_number(page);
    }
    Some(doc)
}

/// Every `.txt` and `.json` record under `prefix`.
///
/// Unreadable objects are logged and skipped; only a failed listing is an
/// error.
pub async fn read_documents(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<GraphDocument>> {
    let keys = store.list(bucket, prefix).await?;
    let mut documents = Vec::new();

    for key in &keys {
        let is_json = key.ends_with(".json");
        if !is_json && !key.ends_with(".txt") {
            continue;
        }
        let bytes = match store.get(bucket, key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read record");
                continue;
            }
        };
        let id = document_id_for_key(key);
        let document = if is_json {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => parse_json_record(&id, &value),
                Err(e) => {
                    warn!(key = %key, error = %e, "Record is not valid JSON");
                    None
                }
            }
        } else {
            Some(parse_text_record(&id, &String::from_utf8_lossy(&bytes)))
        };
        match document {
            Some(document) => documents.push(document),
            None => debug!(key = %key, "No text in record"),
        }
    }

    info!(bucket, prefix, documents = documents.len(), "Read stored records");
    Ok(documents)
}

/// Source label for a document id built by [`document_id_for_key`].
pub fn source_label(document_id: &str) -> &'static str {
    if document_id.starts_with("congress_") {
        "congress_bills"
    } else if document_id.starts_with("newspapers_") {
        "newspapers"
    } else {
        "extracted"
    }
}

/// Run entity extraction over documents in order.
///
/// Generation failures are logged per document and counted.
pub async fn extract_graphs(
    extractor: &EntityExtractor,
    documents: &[GraphDocument],
) -> (Vec<KnowledgeGraph>, usize) {
    let mut graphs = Vec::new();
    let mut failed = 0;
    for doc in documents {
        match extractor
            .extract(&doc.id, source_label(&doc.id), &doc.text)
            .await
        {
            Ok(Some(graph)) => graphs.push(graph),
            Ok(None) => {}
            Err(e) => {
                warn!(document_id = %doc.id, error = %e, "Entity extraction failed");
                failed += 1;
            }
        }
    }
    (graphs, failed)
}

/// Write one batch as a JSON array and return its key.
pub async fn write_graphs(
    store: &dyn ObjectStore,
    bucket: &str,
    graphs: &[KnowledgeGraph],
) -> Result<String> {
    let key = format!(
        "{}kg_{}.json",
        KNOWLEDGE_GRAPH_PREFIX,
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    let body = serde_json::to_vec_pretty(graphs)?;
    store.put(bucket, &key, body, "application/json").await?;
    info!(key = %key, graphs = graphs.len(), "Wrote knowledge graphs");
    Ok(key)
}

/// All graphs from every stored batch, in key order.
pub async fn read_graphs(store: &dyn ObjectStore, bucket: &str) -> Result<Vec<KnowledgeGraph>> {
    let mut graphs = Vec::new();
    for key in store.list(bucket, KNOWLEDGE_GRAPH_PREFIX).await? {
        let bytes = store.get(bucket, &key).await?;
        match serde_json::from_slice::<Vec<KnowledgeGraph>>(&bytes) {
            Ok(batch) => graphs.extend(batch),
            Err(e) => warn!(key = %key, error = %e, "Skipping unreadable graph batch"),
        }
    }
    Ok(graphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryObjectStore;
    use crate::testing::MockGenerator;
    use std::sync::Arc;

    const RECORD: &str = "# Congress 1 - HR 7\n# Title: An Act for the relief of Baron de Glaubeck\n# Introduced: 1789-09-15\n# Latest Action: N/A\n# Latest Action Date: N/A\n\n---\n\nSECTION 1. Be it enacted.";

    #[test]
    fn test_document_id_for_key() {
        assert_eq!(document_id_for_key("extracted/congress_1/hr_7.txt"), "congress_1_hr_7");
        assert_eq!(
            document_id_for_key("extracted/newspapers_1790/sn83_1790-01-06_ed-1.txt"),
            "newspapers_1790_sn83_1790-01-06_ed-1"
        );
        assert_eq!(document_id_for_key("plain"), "plain");
    }

    #[test]
    fn test_text_record_header() {
        let doc = parse_text_record("congress_1_hr_7", RECORD);
        assert_eq!(doc.text, "SECTION 1. Be it enacted.");
        assert_eq!(doc.title.as_deref(), Some("An Act for the relief of Baron de Glaubeck"));
        assert_eq!(doc.date.as_deref(), Some("1789-09-15"));
    }

    #[test]
    fn test_text_without_header() {
        let doc = parse_text_record("x", "  just some text\n---\nmore ");
        assert_eq!(doc.text, "just some text\n---\nmore");
        assert!(doc.title.is_none());
    }

    #[test]
    fn test_json_record_pages() {
        let value = serde_json::json!({"pages": [{"text": "first"}, {"text": "second"}]});
        let doc = parse_json_record("doc", &value).unwrap();
        assert_eq!(doc.text, "first\nsecond");
        assert!(parse_json_record("doc", &serde_json::json!({"other": 1})).is_none());
    }

    #[tokio::test]
    async fn test_read_documents_and_graph_batches() {
        let store = MemoryObjectStore::new();
        store
            .put("data", "extracted/congress_1/hr_7.txt", RECORD.into(), "text/plain")
            .await
            .unwrap();
        store
            .put("data", "extracted/notes.csv", b"a,b".to_vec(), "text/csv")
            .await
            .unwrap();
        store
            .put("data", "extracted/bad.json", b"{".to_vec(), "application/json")
            .await
            .unwrap();

        let documents = read_documents(&store, "data", "extracted/").await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "congress_1_hr_7");

        let extractor = EntityExtractor::new(Arc::new(MockGenerator::new(
            r#"{"entities": [{"id": "e1", "type": "PERSON", "name": "Baron de Glaubeck"}], "relationships": []}"#,
        )));
        let (graphs, failed) = extract_graphs(&extractor, &documents).await;
        assert_eq!(failed, 0);
        assert_eq!(graphs[0].source, "congress_bills");

        let key = write_graphs(&store, "data", &graphs).await.unwrap();
        assert!(key.starts_with("knowledge_graphs/kg_"));
        let read_back = read_graphs(&store, "data").await.unwrap();
        assert_eq!(read_back, graphs);
    }
}
