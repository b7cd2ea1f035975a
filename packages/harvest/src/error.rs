//! Typed errors for the harvest library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can switch
//! on the failure instead of inspecting message strings.

use std::time::Duration;
use thiserror::Error;

use crate::traits::ocr::SyncErrorKind;

/// Errors from downloading a source document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request exceeded the configured timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching: {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection, TLS or body-read failure
    #[error("connection error fetching {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors from the post-fetch validation gate.
///
/// A validation failure means nothing was uploaded and no OCR was invoked.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document too small: {len} bytes (minimum {min})")]
    TooSmall { len: usize, min: usize },

    #[error("document too large: {len} bytes (maximum {max})")]
    TooLarge { len: usize, max: usize },

    /// Server returned a text/HTML page where a binary document was expected
    #[error("unexpected content type: {content_type}")]
    UnexpectedContentType { content_type: String },

    /// Byte stream does not start with the signature of the declared kind
    #[error("bad magic bytes for {expected}")]
    BadMagic { expected: &'static str },

    /// Plain text or markup that is not valid UTF-8
    #[error("text body is not valid UTF-8")]
    InvalidEncoding,
}

/// Errors from object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Error returned by a synchronous text-detection call.
///
/// The adapter classifies the failure into a closed [`SyncErrorKind`];
/// the coordinator switches on the kind, never on the message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sync text detection failed ({kind:?}): {message}")]
pub struct SyncDetectError {
    pub kind: SyncErrorKind,
    pub message: String,
}

impl SyncDetectError {
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors on the asynchronous OCR path.
#[derive(Debug, Error)]
pub enum AsyncOcrError {
    /// The service reported the job as failed
    #[error("async job failed: {message}")]
    Failed { message: String },

    /// The job did not reach a terminal state within the wait budget
    #[error("async job {job_id} timed out after {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    /// Starting or polling the job failed at the transport/service level
    #[error("async OCR service error: {0}")]
    Service(String),

    /// Uploading source bytes or reading results failed
    #[error("async OCR storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cooperative cancellation was requested
    #[error("async job cancelled")]
    Cancelled,
}

/// Errors from calls to a generative model or retrieval service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Provider asked us to slow down; safe to retry
    #[error("generation throttled")]
    Throttled,

    #[error("generation failed: {0}")]
    Service(String),

    #[error("unparseable generation output: {0}")]
    Parse(String),
}

impl GenerationError {
    pub fn is_throttled(&self) -> bool {
        matches!(self, GenerationError::Throttled)
    }
}

/// Errors from the graph database.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph connection failed: {0}")]
    Connect(String),

    #[error("graph query failed: {0}")]
    Query(String),

    /// Vertex or edge id collision
    #[error("graph element already exists: {0}")]
    AlreadyExists(String),
}

/// Errors from upstream document sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source API error: {0}")]
    Api(#[from] loc_client::LocError),

    #[error("no text available for {0}")]
    NoText(String),
}

/// Errors from the chat surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("question is required")]
    EmptyQuestion,
}

/// Errors from starting a search-index sync.
#[derive(Debug, Error)]
#[error("index sync failed: {0}")]
pub struct IndexSyncError(pub String);

/// Crate-wide error for operations that span several stages.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    AsyncOcr(#[from] AsyncOcrError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    IndexSync(#[from] IndexSyncError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for crate-wide operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
