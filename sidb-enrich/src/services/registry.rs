//! Process-wide enrichment state
//!
//! One [`EnrichmentContext`] is constructed at startup and shared by `Arc`
//! with every orchestrator. It owns the JSON cache and the breaker registry;
//! both live for the whole process and start empty on restart.

use super::cache::TtlCache;
use super::circuit_breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One circuit breaker per source name
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the breaker for `name`, creating it on first use
    ///
    /// The config given at creation is kept for the process lifetime; later
    /// calls with a different config get the existing breaker unchanged.
    pub async fn get_or_create(&self, name: &str, config: BreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().await.get(name) {
            return Arc::clone(breaker);
        }

        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(
                breaker = %name,
                failure_threshold = config.failure_threshold,
                reset_timeout_ms = config.reset_timeout.as_millis() as u64,
                "Creating circuit breaker"
            );
            Arc::new(CircuitBreaker::new(name, config))
        });
        Arc::clone(breaker)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().await.get(name).cloned()
    }

    /// Snapshots of every breaker, sorted by name
    pub async fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(breakers.len());
        for breaker in breakers {
            snapshots.push(breaker.snapshot().await);
        }
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}

/// Shared cache and breaker registry
#[derive(Debug, Default)]
pub struct EnrichmentContext {
    /// JSON-encoded `EnrichmentResult`s keyed `source:qualifier`
    pub cache: TtlCache<serde_json::Value>,
    pub breakers: BreakerRegistry,
}

impl EnrichmentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}
