//! Test Helper Utilities
//!
//! Shared fixtures for sidb-enrich integration tests: in-memory content
//! stores and closure-backed adapters that count their upstream calls.

#![allow(dead_code)]

pub mod db_utils;
pub mod log_capture;

pub use db_utils::{create_test_db, get_table_columns};
pub use log_capture::{capture_logs, LogCapture};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sidb_enrich::services::BreakerConfig;
use sidb_enrich::{
    ContentRecord, ContentStore, EnrichmentAdapter, FetchError, FnAdapter, SourceMetadata,
    SourceSettings, StoreError,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Record type produced by test adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: u32,
    pub label: String,
}

impl Sample {
    pub fn for_entity(id: u32) -> Self {
        Self {
            id,
            label: format!("entity-{}", id),
        }
    }
}

/// Settings with no pacing and a generous breaker
pub fn fast_settings() -> SourceSettings {
    SourceSettings {
        delay: Duration::ZERO,
        cache_ttl: Duration::from_secs(60),
        breaker: BreakerConfig {
            failure_threshold: 10,
            reset_timeout: Duration::from_secs(300),
        },
        request_timeout: Duration::from_secs(5),
        abort_on_rate_limit: false,
    }
}

/// Adapter over `entities` whose fetch result is decided by `outcome`
///
/// Returns the adapter and a counter of upstream calls.
pub fn counting_adapter(
    source: &str,
    entities: Vec<u32>,
    settings: SourceSettings,
    outcome: fn(u32) -> Result<Option<Sample>, FetchError>,
) -> (
    impl EnrichmentAdapter<Entity = u32, Record = Sample>,
    Arc<AtomicUsize>,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let adapter = FnAdapter::new(source, entities, settings, move |id: u32| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            outcome(id)
        }
    });
    (adapter, calls)
}

pub fn always_found(id: u32) -> Result<Option<Sample>, FetchError> {
    Ok(Some(Sample::for_entity(id)))
}

/// One recorded `bulk_upsert` call
#[derive(Debug, Clone)]
pub struct UpsertCall {
    pub collection: String,
    pub records: Vec<ContentRecord>,
    pub metadata: SourceMetadata,
}

/// Content store that keeps everything in memory, keyed like the real one
#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<UpsertCall>>,
    rows: Mutex<BTreeMap<(String, String), serde_json::Value>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<UpsertCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Distinct (collection, key) rows after all upserts
    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn row(&self, collection: &str, key: &str) -> Option<serde_json::Value> {
        self.rows
            .lock()
            .unwrap()
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ContentStore for RecordingStore {
    async fn bulk_upsert(
        &self,
        collection: &str,
        records: &[ContentRecord],
        metadata: &SourceMetadata,
    ) -> Result<usize, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        for record in records {
            rows.insert(
                (collection.to_string(), record.key.clone()),
                record.data.clone(),
            );
        }
        drop(rows);

        self.calls.lock().unwrap().push(UpsertCall {
            collection: collection.to_string(),
            records: records.to_vec(),
            metadata: metadata.clone(),
        });
        Ok(records.len())
    }
}

/// Content store that rejects every upsert
pub struct FailingStore;

#[async_trait]
impl ContentStore for FailingStore {
    async fn bulk_upsert(
        &self,
        _collection: &str,
        _records: &[ContentRecord],
        _metadata: &SourceMetadata,
    ) -> Result<usize, StoreError> {
        Err(StoreError::Rejected("disk full".to_string()))
    }
}
