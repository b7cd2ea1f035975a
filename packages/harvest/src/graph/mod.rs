//! Knowledge graph: entity extraction, graph database loading and export.

pub mod corpus;
pub mod entities;
pub mod export;
pub mod gremlin;
pub mod http;
pub mod loader;

pub use corpus::{read_documents, read_graphs, write_graphs, KNOWLEDGE_GRAPH_PREFIX};
pub use entities::{Entity, EntityExtractor, EntityType, KnowledgeGraph, Relationship};
pub use export::{ExportReport, GraphExporter, KbDocument, KB_DOCUMENT_PREFIX};
pub use http::HttpGremlinConnector;
pub use loader::{GraphDocument, GraphLoader, LoadReport};
