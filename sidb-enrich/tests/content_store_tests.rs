//! SQLite content store and run history tests

mod helpers;

use chrono::{Duration as ChronoDuration, Utc};
use helpers::{always_found, counting_adapter, create_test_db, fast_settings, get_table_columns};
use serde_json::json;
use sidb_enrich::db::{runs, SqliteContentStore};
use sidb_enrich::{BatchOrchestrator, BatchSummary, ContentRecord, ContentStore, EnrichmentContext, SourceMetadata};
use uuid::Uuid;

fn metadata(source: &str, collection: &str) -> SourceMetadata {
    SourceMetadata {
        source: source.to_string(),
        collection: collection.to_string(),
        run_id: Uuid::new_v4(),
        fetched_at: Utc::now(),
    }
}

fn record(key: &str, data: serde_json::Value) -> ContentRecord {
    ContentRecord {
        key: key.to_string(),
        data,
        fetched_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_schema_has_expected_columns() {
    let (_dir, pool) = create_test_db().await.unwrap();

    let content: Vec<String> = get_table_columns(&pool, "content")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        content,
        vec!["collection", "record_key", "source", "data", "fetched_at", "updated_at"]
    );

    let runs_columns = get_table_columns(&pool, "enrichment_runs").await.unwrap();
    let run_id = runs_columns.iter().find(|c| c.name == "run_id").unwrap();
    assert_eq!(run_id.pk, 1);
    assert!(runs_columns.iter().any(|c| c.name == "aborted"));
}

#[tokio::test]
async fn test_upsert_is_idempotent_per_collection_and_key() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteContentStore::new(pool);
    let meta = metadata("github", "repository_activity");

    let first = vec![
        record("nasa/fprime", json!({"stars": 10})),
        record("nasa/cFS", json!({"stars": 5})),
    ];
    assert_eq!(store.bulk_upsert("repository_activity", &first, &meta).await.unwrap(), 2);

    let second = vec![record("nasa/fprime", json!({"stars": 11}))];
    assert_eq!(store.bulk_upsert("repository_activity", &second, &meta).await.unwrap(), 1);

    assert_eq!(store.count_content("repository_activity").await.unwrap(), 2);
    let row = store
        .get_content("repository_activity", "nasa/fprime")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.data, json!({"stars": 11}));
    assert_eq!(row.source, "github");
    assert_eq!(row.key, "nasa/fprime");
}

#[tokio::test]
async fn test_duplicate_keys_in_one_batch_count_once() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteContentStore::new(pool);
    let meta = metadata("github", "repository_activity");

    let batch = vec![
        record("nasa/fprime", json!({"stars": 10})),
        record("nasa/cFS", json!({"stars": 5})),
        record("nasa/fprime", json!({"stars": 12})),
    ];
    let stored = store.bulk_upsert("repository_activity", &batch, &meta).await.unwrap();

    assert_eq!(stored, 2);
    assert_eq!(store.count_content("repository_activity").await.unwrap(), 2);
    // Last record for a key wins
    let row = store
        .get_content("repository_activity", "nasa/fprime")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.data, json!({"stars": 12}));
}

#[tokio::test]
async fn test_same_key_in_different_collections_is_distinct() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteContentStore::new(pool);

    store
        .bulk_upsert("company_patents", &[record("Iridium", json!(1))], &metadata("patents", "company_patents"))
        .await
        .unwrap();
    store
        .bulk_upsert("spectrum_licenses", &[record("Iridium", json!(2))], &metadata("fcc_spectrum", "spectrum_licenses"))
        .await
        .unwrap();

    assert_eq!(store.count_content("company_patents").await.unwrap(), 1);
    assert_eq!(store.count_content("spectrum_licenses").await.unwrap(), 1);
    assert!(store.get_content("company_patents", "Kuiper").await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_upsert_stores_nothing() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteContentStore::new(pool);

    let stored = store
        .bulk_upsert("company_financials", &[], &metadata("sec_edgar", "company_financials"))
        .await
        .unwrap();
    assert_eq!(stored, 0);
    assert_eq!(store.count_content("company_financials").await.unwrap(), 0);
}

#[tokio::test]
async fn test_orchestrator_persists_into_sqlite() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let store = SqliteContentStore::new(pool);
    let orchestrator = BatchOrchestrator::new(EnrichmentContext::shared());
    let (adapter, _calls) = counting_adapter("demo", vec![1, 2, 3], fast_settings(), always_found);

    let first = orchestrator.run(&adapter, &store).await.unwrap();
    let second = orchestrator.run(&adapter, &store).await.unwrap();

    assert_eq!(first.stored, 3);
    assert_eq!(second.stored, 3);
    assert_eq!(store.count_content("demo").await.unwrap(), 3);

    let row = store.get_content("demo", "2").await.unwrap().unwrap();
    assert_eq!(row.data, json!({"id": 2, "label": "entity-2"}));
}

#[tokio::test]
async fn test_run_history_round_trip() {
    let (_dir, pool) = create_test_db().await.unwrap();

    let mut older = BatchSummary::start("sec_edgar", 6);
    older.started_at = Utc::now() - ChronoDuration::minutes(10);
    older.finished_at = older.started_at + ChronoDuration::seconds(3);
    older.fetched = 6;
    older.stored = 6;

    let mut newer = BatchSummary::start("github", 5);
    newer.fetched = 1;
    newer.stored = 1;
    newer.errors.push("github nasa/openmct: Rate limited by upstream".to_string());
    newer.aborted = true;

    runs::save_run(&pool, &older).await.unwrap();
    runs::save_run(&pool, &newer).await.unwrap();

    let recent = runs::list_recent_runs(&pool, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0], newer);
    assert_eq!(recent[1], older);

    let limited = runs::list_recent_runs(&pool, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].source, "github");
    assert_eq!(limited[0].unattempted(), 3);
}

#[tokio::test]
async fn test_saving_a_run_twice_updates_it() {
    let (_dir, pool) = create_test_db().await.unwrap();

    let mut summary = BatchSummary::start("patents", 2);
    runs::save_run(&pool, &summary).await.unwrap();

    summary.fetched = 2;
    summary.stored = 2;
    runs::save_run(&pool, &summary).await.unwrap();

    let recent = runs::list_recent_runs(&pool, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].stored, 2);
}

#[tokio::test]
async fn test_negative_counts_in_history_are_rejected() {
    let (_dir, pool) = create_test_db().await.unwrap();

    let summary = BatchSummary::start("fcc_spectrum", 4);
    runs::save_run(&pool, &summary).await.unwrap();
    sqlx::query("UPDATE enrichment_runs SET fetched = -1 WHERE run_id = ?")
        .bind(summary.run_id.to_string())
        .execute(&pool)
        .await
        .unwrap();

    match runs::list_recent_runs(&pool, 10).await {
        Err(sidb_common::Error::Internal(msg)) => assert!(msg.contains("fetched"), "got {}", msg),
        other => panic!("expected Internal error, got {:?}", other),
    }
}
