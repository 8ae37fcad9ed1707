//! Adapter-facing interface of the enrichment framework
//!
//! An adapter knows its entity list, how to fetch one entity and map the
//! response to a canonical record, and the pacing its upstream tolerates.
//! It knows nothing about batching, caching or circuit breaking.

use super::circuit_breaker::BreakerConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sidb_common::config::SourceConfig;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

/// Per-source tuning consumed by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSettings {
    /// Pause between consecutive entities
    pub delay: Duration,
    /// Lifetime of cached results
    pub cache_ttl: Duration,
    pub breaker: BreakerConfig,
    /// Upper bound for a single fetch
    pub request_timeout: Duration,
    /// Stop the batch when the upstream reports its rate limit exhausted
    pub abort_on_rate_limit: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            cache_ttl: Duration::from_millis(1_800_000),
            breaker: BreakerConfig::default(),
            request_timeout: Duration::from_millis(15_000),
            abort_on_rate_limit: false,
        }
    }
}

impl SourceSettings {
    /// Apply the optional overrides of a TOML source section
    pub fn with_overrides(mut self, config: &SourceConfig) -> Self {
        if let Some(ms) = config.delay_ms {
            self.delay = Duration::from_millis(ms);
        }
        if let Some(ms) = config.cache_ttl_ms {
            self.cache_ttl = Duration::from_millis(ms);
        }
        if let Some(threshold) = config.failure_threshold {
            self.breaker.failure_threshold = threshold;
        }
        if let Some(ms) = config.reset_timeout_ms {
            self.breaker.reset_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = config.request_timeout_ms {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(abort) = config.abort_on_rate_limit {
            self.abort_on_rate_limit = abort;
        }
        self
    }
}

/// Cache key for an entity of a source
pub fn cache_key(source: &str, qualifier: &str) -> String {
    format!("{}:{}", source, qualifier)
}

/// A single external data source
///
/// `fetch` returns `Ok(None)` for an entity the upstream does not know
/// (e.g. a 404); that is an expected outcome, not a failure.
#[async_trait]
pub trait EnrichmentAdapter: Send + Sync {
    type Entity: Send + Sync;
    type Record: Serialize + DeserializeOwned + Send + Sync;

    /// Source name, used for breaker identity, cache prefix and logs
    fn source(&self) -> &str;

    /// Content store collection the records land in
    fn collection(&self) -> &str;

    /// Entities to enrich, in processing order
    fn entities(&self) -> &[Self::Entity];

    /// Stable key of an entity: cache qualifier and content record key
    fn entity_key(&self, entity: &Self::Entity) -> String;

    fn settings(&self) -> SourceSettings;

    async fn fetch(&self, entity: &Self::Entity) -> Result<Option<Self::Record>, FetchError>;
}

/// Adapter assembled from an entity list and a fetch closure
pub struct FnAdapter<E, R, F> {
    source: String,
    collection: String,
    entities: Vec<E>,
    settings: SourceSettings,
    fetch_fn: F,
    _record: PhantomData<fn() -> R>,
}

impl<E, R, F, Fut> FnAdapter<E, R, F>
where
    E: Clone + Display + Send + Sync,
    R: Serialize + DeserializeOwned + Send + Sync,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<R>, FetchError>> + Send,
{
    pub fn new(
        source: impl Into<String>,
        entities: Vec<E>,
        settings: SourceSettings,
        fetch_fn: F,
    ) -> Self {
        let source = source.into();
        Self {
            collection: source.clone(),
            source,
            entities,
            settings,
            fetch_fn,
            _record: PhantomData,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

#[async_trait]
impl<E, R, F, Fut> EnrichmentAdapter for FnAdapter<E, R, F>
where
    E: Clone + Display + Send + Sync,
    R: Serialize + DeserializeOwned + Send + Sync,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<R>, FetchError>> + Send,
{
    type Entity = E;
    type Record = R;

    fn source(&self) -> &str {
        &self.source
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn entities(&self) -> &[E] {
        &self.entities
    }

    fn entity_key(&self, entity: &E) -> String {
        entity.to_string()
    }

    fn settings(&self) -> SourceSettings {
        self.settings
    }

    async fn fetch(&self, entity: &E) -> Result<Option<R>, FetchError> {
        (self.fetch_fn)(entity.clone()).await
    }
}
