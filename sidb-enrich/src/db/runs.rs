//! Batch run history

use crate::models::BatchSummary;
use chrono::{DateTime, Utc};
use sidb_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Record a finished batch run
pub async fn save_run(pool: &SqlitePool, summary: &BatchSummary) -> Result<()> {
    let errors = serde_json::to_string(&summary.errors)
        .map_err(|e| Error::Internal(format!("Failed to serialize errors: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO enrichment_runs (
            run_id, source, started_at, finished_at,
            total, fetched, stored, skipped, aborted, errors
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            finished_at = excluded.finished_at,
            fetched = excluded.fetched,
            stored = excluded.stored,
            skipped = excluded.skipped,
            aborted = excluded.aborted,
            errors = excluded.errors
        "#,
    )
    .bind(summary.run_id.to_string())
    .bind(&summary.source)
    .bind(summary.started_at.to_rfc3339())
    .bind(summary.finished_at.to_rfc3339())
    .bind(count_param(summary.total, "total")?)
    .bind(count_param(summary.fetched, "fetched")?)
    .bind(count_param(summary.stored, "stored")?)
    .bind(count_param(summary.skipped, "skipped")?)
    .bind(summary.aborted)
    .bind(&errors)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent runs first
pub async fn list_recent_runs(pool: &SqlitePool, limit: u32) -> Result<Vec<BatchSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT run_id, source, started_at, finished_at,
               total, fetched, stored, skipped, aborted, errors
        FROM enrichment_runs
        ORDER BY started_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let run_id: String = row.get("run_id");
            let run_id = Uuid::parse_str(&run_id)
                .map_err(|e| Error::Internal(format!("Failed to parse run_id: {}", e)))?;

            let errors: String = row.get("errors");
            let errors: Vec<String> = serde_json::from_str(&errors)
                .map_err(|e| Error::Internal(format!("Failed to deserialize errors: {}", e)))?;

            let started_at: String = row.get("started_at");
            let finished_at: String = row.get("finished_at");

            Ok(BatchSummary {
                run_id,
                source: row.get("source"),
                total: count_column(row, "total")?,
                fetched: count_column(row, "fetched")?,
                stored: count_column(row, "stored")?,
                skipped: count_column(row, "skipped")?,
                errors,
                aborted: row.get("aborted"),
                started_at: parse_timestamp(&started_at, "started_at")?,
                finished_at: parse_timestamp(&finished_at, "finished_at")?,
            })
        })
        .collect()
}

fn count_param(value: usize, column: &str) -> Result<i64> {
    i64::try_from(value).map_err(|e| Error::Internal(format!("Invalid {} count {}: {}", column, value, e)))
}

fn count_column(row: &SqliteRow, column: &str) -> Result<usize> {
    let value: i64 = row.get(column);
    usize::try_from(value)
        .map_err(|e| Error::Internal(format!("Invalid {} count {}: {}", column, value, e)))
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
