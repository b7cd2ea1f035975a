//! OCR extraction: the sync path, the async job path, and the coordinator
//! that routes between them.

pub mod async_path;
pub mod coordinator;
pub mod sync_path;

pub use async_path::{AsyncExtractor, AsyncJobHandle, AsyncOutcome, CleanupWarning};
pub use coordinator::{ExtractionCoordinator, ExtractionTrace};
pub use sync_path::{assemble_lines, SyncOutcome};
