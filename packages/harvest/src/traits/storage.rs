//! Object storage boundary.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Bucket/key object storage.
///
/// Used for staging source bytes on the async OCR path, reading job output,
/// and persisting extracted text records.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Keys under `prefix`, in lexical order.
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    fn name(&self) -> &str {
        "unknown"
    }
}
