//! Batch orchestrator
//!
//! Drives one adapter across its whole entity list, strictly sequentially:
//!
//! 1. Cache lookup under `source:entity_key`; a hit skips breaker and network.
//! 2. On a miss, fetch through the source's circuit breaker with a per-call
//!    timeout. Results are cached; failures are collected and the loop moves
//!    on. A rate-limit failure stops the loop when the source enables
//!    `abort_on_rate_limit`.
//! 3. Wait the source's delay before the next entity, hit or miss.
//! 4. Hand every result to the content store in one bulk upsert.
//!
//! Not-found entities and breaker short-circuits are skipped silently.

use super::adapter::{cache_key, EnrichmentAdapter};
use super::content_store::ContentStore;
use super::registry::EnrichmentContext;
use crate::error::{BatchError, FetchError};
use crate::models::{BatchSummary, ContentRecord, EnrichmentResult, SourceMetadata};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Runs adapters against the shared cache and breaker registry
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    context: Arc<EnrichmentContext>,
}

impl BatchOrchestrator {
    pub fn new(context: Arc<EnrichmentContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<EnrichmentContext> {
        &self.context
    }

    /// Run one batch for `adapter` and upsert its results into `store`
    ///
    /// Returns `Err` only when the final upsert fails; the error still carries
    /// the summary of what was fetched.
    pub async fn run<A, S>(&self, adapter: &A, store: &S) -> Result<BatchSummary, BatchError>
    where
        A: EnrichmentAdapter,
        S: ContentStore + ?Sized,
    {
        let source = adapter.source().to_string();
        let settings = adapter.settings();
        let entities = adapter.entities();
        let breaker = self
            .context
            .breakers
            .get_or_create(&source, settings.breaker)
            .await;

        let mut summary = BatchSummary::start(&source, entities.len());
        let mut records: Vec<ContentRecord> = Vec::new();

        info!(
            source = %source,
            run_id = %summary.run_id,
            entities = entities.len(),
            delay_ms = settings.delay.as_millis() as u64,
            "Enrichment batch started"
        );

        for (index, entity) in entities.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(settings.delay).await;
            }

            let key = adapter.entity_key(entity);
            let entry_key = cache_key(&source, &key);

            if let Some(result) = self.cached_result::<A::Record>(&entry_key).await {
                debug!(source = %source, entity = %key, "Cache hit");
                match to_content_record(key.clone(), &result) {
                    Ok(record) => {
                        records.push(record);
                        summary.fetched += 1;
                    }
                    Err(message) => summary.errors.push(format!("{} {}: {}", source, key, message)),
                }
                continue;
            }
            debug!(source = %source, entity = %key, "Cache miss");

            let outcome = breaker
                .execute(
                    || fetch_with_timeout(adapter, entity, settings.request_timeout),
                    None,
                )
                .await;

            match outcome {
                Ok(Some(record)) => {
                    let result = EnrichmentResult::new(record);
                    match serde_json::to_value(&result) {
                        Ok(cached) => {
                            self.context
                                .cache
                                .set(entry_key, cached, settings.cache_ttl)
                                .await;
                        }
                        Err(e) => {
                            warn!(source = %source, entity = %key, error = %e, "Result not cacheable");
                        }
                    }

                    match to_content_record(key.clone(), &result) {
                        Ok(record) => {
                            records.push(record);
                            summary.fetched += 1;
                        }
                        Err(message) => {
                            summary.errors.push(format!("{} {}: {}", source, key, message))
                        }
                    }
                }
                Ok(None) => {
                    // Not found upstream, or breaker open
                    debug!(source = %source, entity = %key, "No result, skipping entity");
                    summary.skipped += 1;
                }
                Err(err) => {
                    warn!(source = %source, entity = %key, error = %err, "Entity fetch failed");
                    summary.errors.push(format!("{} {}: {}", source, key, err));

                    if err.is_rate_limited() && settings.abort_on_rate_limit {
                        summary.aborted = true;
                        warn!(
                            source = %source,
                            unattempted = entities.len() - index - 1,
                            "Upstream rate limit exhausted, aborting batch"
                        );
                        break;
                    }
                }
            }
        }

        if !records.is_empty() {
            let metadata = SourceMetadata {
                source: source.clone(),
                collection: adapter.collection().to_string(),
                run_id: summary.run_id,
                fetched_at: Utc::now(),
            };

            match store
                .bulk_upsert(adapter.collection(), &records, &metadata)
                .await
            {
                Ok(stored) => summary.stored = stored,
                Err(error) => {
                    summary.finished_at = Utc::now();
                    error!(
                        source = %source,
                        records = records.len(),
                        error = %error,
                        "Content store upsert failed"
                    );
                    return Err(BatchError::Store { summary, error });
                }
            }
        }

        summary.finished_at = Utc::now();
        info!(
            source = %source,
            run_id = %summary.run_id,
            fetched = summary.fetched,
            stored = summary.stored,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            aborted = summary.aborted,
            elapsed_ms = summary.elapsed_ms(),
            "Enrichment batch finished"
        );

        Ok(summary)
    }

    /// Decode a live cache entry; an undecodable entry counts as a miss
    async fn cached_result<R: DeserializeOwned>(&self, key: &str) -> Option<EnrichmentResult<R>> {
        let value = self.context.cache.get(key).await?;
        match serde_json::from_value(value) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.context.cache.remove(key).await;
                None
            }
        }
    }
}

async fn fetch_with_timeout<A: EnrichmentAdapter>(
    adapter: &A,
    entity: &A::Entity,
    timeout: Duration,
) -> Result<Option<A::Record>, FetchError> {
    match tokio::time::timeout(timeout, adapter.fetch(entity)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

fn to_content_record<R: serde::Serialize>(
    key: String,
    result: &EnrichmentResult<R>,
) -> Result<ContentRecord, String> {
    let data = serde_json::to_value(&result.record)
        .map_err(|e| format!("Failed to serialize record: {}", e))?;
    Ok(ContentRecord {
        key,
        data,
        fetched_at: result.fetched_at,
    })
}
