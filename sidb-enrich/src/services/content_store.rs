//! Content store collaborator
//!
//! The store receives one bulk upsert per batch run. Upserts must be
//! idempotent per `(collection, record key)` so re-running a batch after a
//! partial failure never creates duplicates.

use crate::error::StoreError;
use crate::models::{ContentRecord, SourceMetadata};
use async_trait::async_trait;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert or update `records` in `collection`
    ///
    /// Returns the number of records the store persisted.
    async fn bulk_upsert(
        &self,
        collection: &str,
        records: &[ContentRecord],
        metadata: &SourceMetadata,
    ) -> Result<usize, StoreError>;
}
