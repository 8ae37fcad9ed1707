//! Resilient fetch-and-batch framework
//!
//! Source-agnostic pieces every adapter plugs into: the TTL cache, the
//! per-source circuit breaker and its registry, the batch orchestrator, and
//! the adapter and content store interfaces.

pub mod adapter;
pub mod batch_orchestrator;
pub mod cache;
pub mod circuit_breaker;
pub mod content_store;
pub mod registry;

pub use adapter::{cache_key, EnrichmentAdapter, FnAdapter, SourceSettings};
pub use batch_orchestrator::BatchOrchestrator;
pub use cache::TtlCache;
pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use content_store::ContentStore;
pub use registry::{BreakerRegistry, EnrichmentContext};
