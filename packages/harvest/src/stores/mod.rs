//! Object storage implementations.
//!
//! Available backends:
//! - `MemoryObjectStore` - in-process storage (always available)
//! - `FsObjectStore` - directory-backed storage for local runs
//! - `S3ObjectStore` - AWS S3 (requires `aws` feature, see [`crate::aws`])

pub mod filesystem;
pub mod memory;

pub use filesystem::FsObjectStore;
pub use memory::MemoryObjectStore;
