//! Historical Document Harvesting and Extraction
//!
//! Collects congressional bills and digitized newspaper pages from the
//! Library of Congress, extracts their text (directly, or through OCR with a
//! single-call path and an asynchronous job path), and persists
//! header-annotated text records for retrieval and knowledge-graph loading.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use harvest::{ExtractionConfig, ExtractionCoordinator, HttpFetcher, FetchConfig};
//! use harvest::testing::{MockAsyncDetector, MockObjectStore, MockSyncDetector};
//!
//! let coordinator = ExtractionCoordinator::new(
//!     Arc::new(HttpFetcher::new(FetchConfig::default())?),
//!     Arc::new(MockSyncDetector::with_lines(&["AN ACT"])),
//!     Arc::new(MockAsyncDetector::never_finishes()),
//!     Arc::new(MockObjectStore::new()),
//!     ExtractionConfig::new("harvest-temp"),
//! );
//! let result = coordinator.process(&document).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Service boundaries (fetcher, storage, OCR, generation, graph)
//! - [`types`] - Documents, records, results and configuration
//! - [`fetchers`] - HTTP fetcher and the validation gate
//! - [`ocr`] - Sync and async OCR paths and the extraction coordinator
//! - [`sources`] - Congress.gov and Chronicling America document sources
//! - [`pipeline`] - Collection runs with rate limiting and run summaries
//! - [`graph`] - Entity extraction, graph loading and knowledge-base export
//! - [`chat`] - Question answering over the knowledge base
//! - [`stores`] - In-memory and filesystem object stores
//! - [`testing`] - Mock implementations for testing

pub mod chat;
pub mod error;
pub mod fetchers;
pub mod graph;
pub mod ocr;
pub mod pipeline;
pub mod retry;
pub mod security;
pub mod shapes;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

#[cfg(feature = "aws")]
pub mod aws;

mod locks;

// Re-export core types at crate root
pub use error::{
    AsyncOcrError, ChatError, ExtractError, FetchError, GenerationError, GraphError,
    IndexSyncError, SourceError, StorageError, SyncDetectError, ValidationError,
};
pub use traits::{
    fetcher::{FetchedDocument, Fetcher},
    generator::{Citation, GroundedAnswer, KnowledgeBase, TextGenerator},
    graph::{GraphClient, GraphConnector},
    index::{IndexSync, SyncJob},
    ocr::{
        AsyncTextDetector, BlockType, JobPage, JobStatus, StorageLocation, SyncErrorKind,
        SyncTextDetector, TextBlock,
    },
    source::{DocumentSource, SourceCollection},
    storage::ObjectStore,
};
pub use types::{
    config::{ExtractionConfig, FetchConfig, PipelineConfig, PollConfig, SizeLimits},
    document::{ContentKind, DocumentId, SourceDocument, SourceItem},
    record::{RecordHeader, SourceKind},
    result::{
        ExtractedText, ExtractionFailure, ExtractionOutcome, ExtractionPath, ExtractionResult,
        FailureReason,
    },
};

pub use chat::{ChatResponse, ChatService, Confidence};
pub use fetchers::{validate, HttpFetcher, ValidatedDocument};
pub use graph::{
    EntityExtractor, GraphDocument, GraphExporter, GraphLoader, HttpGremlinConnector,
    KnowledgeGraph,
};
pub use ocr::{AsyncExtractor, CleanupWarning, ExtractionCoordinator, ExtractionTrace};
pub use pipeline::{Pipeline, RunSummary, SourceStats};
pub use retry::BackoffPolicy;
pub use security::{CongressCredentials, ExposeSecret, SecretString};
pub use sources::{ChroniclingSource, CongressRange, CongressSource, NewspaperRange};
pub use stores::{FsObjectStore, MemoryObjectStore};
