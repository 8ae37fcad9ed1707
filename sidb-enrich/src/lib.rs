//! sidb-enrich library interface
//!
//! Resilient fetch-and-batch enrichment of the space industry database from
//! rate-limited public APIs. Exposed as a library for integration testing.

pub mod adapters;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod runner;
pub mod services;

pub use crate::error::{BatchError, FetchError, StoreError};
pub use crate::models::{BatchSummary, ContentRecord, EnrichmentResult, SourceMetadata};
pub use crate::services::{
    BatchOrchestrator, CircuitBreaker, ContentStore, EnrichmentAdapter, EnrichmentContext,
    FnAdapter, SourceSettings, TtlCache,
};
