//! Entity and relationship extraction with a text generator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::traits::generator::TextGenerator;

/// Texts shorter than this carry nothing worth extracting.
pub const MIN_TEXT_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Location,
    Organization,
    Event,
    Date,
    #[serde(other)]
    Other,
}

impl EntityType {
    pub fn label(self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Location => "LOCATION",
            EntityType::Organization => "ORGANIZATION",
            EntityType::Event => "EVENT",
            EntityType::Date => "DATE",
            EntityType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Entities and relationships found in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub document_id: String,
    pub source: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub extracted_at: DateTime<Utc>,
}

impl KnowledgeGraph {
    pub fn empty(document_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            source: source.into(),
            entities: Vec::new(),
            relationships: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

#[derive(Deserialize)]
struct RawGraph {
    #[serde(default)]
    entities: Vec<Value>,
    #[serde(default)]
    relationships: Vec<Value>,
}

/// Parse the JSON object embedded in model output.
///
/// Takes everything from the first `{` to the last `}`. Individual entities
/// or relationships that do not fit the schema are dropped; output with no
/// parseable object yields `None`.
pub fn parse_graph_output(content: &str) -> Option<(Vec<Entity>, Vec<Relationship>)> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    let raw: RawGraph = serde_json::from_str(&content[start..=end]).ok()?;

    let entities = raw
        .entities
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    let relationships = raw
        .relationships
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    Some((entities, relationships))
}

fn build_prompt(text: &str) -> String {
    format!(
        "Identify the entities and relationships in this historical document.\n\n\
         Document:\n{}\n\n\
         Entity types: PERSON, LOCATION, ORGANIZATION, EVENT, DATE.\n\
         Respond with a single JSON object of the form\n\
         {{\"entities\": [{{\"id\", \"type\", \"name\", \"properties\", \"confidence\"}}],\n \
         \"relationships\": [{{\"id\", \"source\", \"target\", \"type\", \"properties\", \"confidence\"}}]}}\n\
         where relationship source and target are entity ids.",
        text
    )
}

/// Extracts a [`KnowledgeGraph`] per document through a [`TextGenerator`].
pub struct EntityExtractor {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
}

impl EntityExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_tokens: 4096,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// `None` when the text is too short to bother with. Unparseable model
    /// output gives an empty graph; only the generation call itself can
    /// fail.
    pub async fn extract(
        &self,
        document_id: &str,
        source: &str,
        text: &str,
    ) -> Result<Option<KnowledgeGraph>, GenerationError> {
        if text.trim().chars().count() < MIN_TEXT_CHARS {
            debug!(document_id, "Skipping entity extraction for short text");
            return Ok(None);
        }

        let output = self
            .generator
            .generate(&build_prompt(text), self.max_tokens)
            .await?;

        let mut graph = KnowledgeGraph::empty(document_id, source);
        match parse_graph_output(&output) {
            Some((entities, relationships)) => {
                graph.entities = entities;
                graph.relationships = relationships;
                info!(
                    document_id,
                    entities = graph.entities.len(),
                    relationships = graph.relationships.len(),
                    "Extracted entities"
                );
            }
            None => warn!(document_id, "Model output had no parseable graph"),
        }
        Ok(Some(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;

    const OUTPUT: &str = r#"Here is the graph:
    {"entities": [
        {"id": "e1", "type": "PERSON", "name": "George Washington", "confidence": 0.95},
        {"id": "e2", "type": "LOCATION", "name": "New-York"},
        {"id": "e3", "type": "SHIP", "name": "Betsey"},
        {"name": "missing id and type"}
    ],
    "relationships": [
        {"id": "r1", "source": "e1", "target": "e2", "type": "LOCATED_IN"}
    ]}
    Let me know if you need more."#;

    #[test]
    fn test_parse_embedded_json() {
        let (entities, relationships) = parse_graph_output(OUTPUT).unwrap();
        assert_eq!(entities.len(), 3);
        assert_eq!(entities[0].entity_type, EntityType::Person);
        assert_eq!(entities[2].entity_type, EntityType::Other);
        assert_eq!(relationships[0].relationship_type, "LOCATED_IN");
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_graph_output("no json here").is_none());
        assert!(parse_graph_output("} backwards {").is_none());
        assert!(parse_graph_output("{not json}").is_none());
    }

    #[tokio::test]
    async fn test_unparseable_output_gives_empty_graph() {
        let extractor = EntityExtractor::new(Arc::new(MockGenerator::new("I cannot help.")));
        let graph = extractor
            .extract("doc", "Gazette", "A long enough historical text.")
            .await
            .unwrap()
            .unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.document_id, "doc");
    }

    #[tokio::test]
    async fn test_short_text_skipped_without_generation() {
        let generator = Arc::new(MockGenerator::new(OUTPUT));
        let extractor = EntityExtractor::new(generator.clone());
        assert!(extractor.extract("doc", "", "  short ").await.unwrap().is_none());
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_generation_error_propagates() {
        let generator = MockGenerator::new(OUTPUT).then(Err(GenerationError::Service("down".into())));
        let extractor = EntityExtractor::new(Arc::new(generator));
        let result = extractor
            .extract("doc", "", "A long enough historical text.")
            .await;
        assert!(matches!(result, Err(GenerationError::Service(_))));
    }
}
