//! Enrichment records and content store payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical output of one adapter call
///
/// Created by the adapter fetch, owned by the orchestrator until it is handed
/// to the content store. The cache holds a JSON copy until its TTL expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult<T> {
    /// Fully mapped, source-agnostic record
    pub record: T,
    /// When the record was fetched from upstream
    pub fetched_at: DateTime<Utc>,
}

impl<T> EnrichmentResult<T> {
    /// Wrap a freshly fetched record
    pub fn new(record: T) -> Self {
        Self {
            record,
            fetched_at: Utc::now(),
        }
    }
}

/// One row handed to the content store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Idempotency key within the collection (the entity key)
    pub key: String,
    /// Serialized record
    pub data: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

/// Provenance passed alongside a bulk upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Source name (e.g. "github")
    pub source: String,
    /// Content store collection key
    pub collection: String,
    /// Batch run that produced the records
    pub run_id: Uuid,
    /// When the upsert was issued
    pub fetched_at: DateTime<Utc>,
}
