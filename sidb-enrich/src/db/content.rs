//! SQLite content store
//!
//! Upserts are keyed by `(collection, record_key)`; re-running a batch
//! replaces the previous row instead of adding a duplicate.

use crate::error::StoreError;
use crate::models::{ContentRecord, SourceMetadata};
use crate::services::ContentStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

/// Stored row of the `content` table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredContent {
    pub collection: String,
    pub key: String,
    pub source: String,
    pub data: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load one record
    pub async fn get_content(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<StoredContent>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT collection, record_key, source, data, fetched_at, updated_at
            FROM content
            WHERE collection = ? AND record_key = ?
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let data: String = row.get("data");
        let data = serde_json::from_str(&data)
            .map_err(|e| StoreError::Serialization(format!("Failed to deserialize data: {}", e)))?;

        let fetched_at: String = row.get("fetched_at");
        let updated_at: String = row.get("updated_at");

        Ok(Some(StoredContent {
            collection: row.get("collection"),
            key: row.get("record_key"),
            source: row.get("source"),
            data,
            fetched_at: parse_timestamp(&fetched_at, "fetched_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
        }))
    }

    /// Number of records in a collection
    pub async fn count_content(&self, collection: &str) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn bulk_upsert(
        &self,
        collection: &str,
        records: &[ContentRecord],
        metadata: &SourceMetadata,
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        // Serialize everything before opening the transaction
        let updated_at = metadata.fetched_at.to_rfc3339();
        let rows = latest_per_key(records)
            .into_iter()
            .map(|record| {
                serde_json::to_string(&record.data)
                    .map(|data| (record.key.as_str(), data, record.fetched_at.to_rfc3339()))
                    .map_err(|e| {
                        StoreError::Serialization(format!("Failed to serialize {}: {}", record.key, e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut stored: u64 = 0;
        let mut tx = self.pool.begin().await?;
        for (key, data, fetched_at) in &rows {
            let result = sqlx::query(
                r#"
                INSERT INTO content (collection, record_key, source, data, fetched_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, record_key) DO UPDATE SET
                    source = excluded.source,
                    data = excluded.data,
                    fetched_at = excluded.fetched_at,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(collection)
            .bind(*key)
            .bind(&metadata.source)
            .bind(data)
            .bind(fetched_at)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
            stored += result.rows_affected();
        }
        tx.commit().await?;

        debug!(
            collection = %collection,
            source = %metadata.source,
            run_id = %metadata.run_id,
            records = records.len(),
            stored = stored,
            "Content upserted"
        );

        usize::try_from(stored)
            .map_err(|e| StoreError::Rejected(format!("Row count out of range: {}", e)))
    }
}

/// Keep only the last record of each key, in order of first appearance
fn latest_per_key(records: &[ContentRecord]) -> Vec<&ContentRecord> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<&ContentRecord> = Vec::with_capacity(records.len());
    for record in records {
        match positions.get(record.key.as_str()) {
            Some(&index) => latest[index] = record,
            None => {
                positions.insert(record.key.as_str(), latest.len());
                latest.push(record);
            }
        }
    }
    latest
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("Failed to parse {}: {}", column, e)))
}
