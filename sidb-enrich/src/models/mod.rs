//! Data models for the enrichment pipeline

pub mod record;
pub mod summary;

pub use record::{ContentRecord, EnrichmentResult, SourceMetadata};
pub use summary::BatchSummary;
