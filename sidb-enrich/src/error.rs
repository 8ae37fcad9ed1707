//! Error types for sidb-enrich
//!
//! Fetch failures are classified structurally so the batch loop can tell a
//! source-wide rate-limit signal apart from an ordinary per-entity failure.

use crate::models::BatchSummary;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single-entity fetch
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Upstream signaled that the source's own rate limit is exhausted
    #[error("Rate limited by upstream (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Network error or 5xx response
    #[error("Transient upstream failure: {0}")]
    Transient(String),

    /// Per-call timeout elapsed
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Any other non-success HTTP status
    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be mapped to a record
    #[error("Parse error: {0}")]
    Parse(String),

    /// Adapter is missing required configuration (e.g. an API key)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// True for the source-wide rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            // reqwest's own timeout is reported as transient; the orchestrator
            // enforces the per-call timeout separately
            FetchError::Transient(err.to_string())
        }
    }
}

/// Content store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store rejected batch: {0}")]
    Rejected(String),
}

/// Batch run failure
///
/// Raised only when the final bulk upsert fails. The summary gathered before
/// the upsert is kept so the caller can still report per-entity errors.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{}: content store upsert failed: {error}", .summary.source)]
    Store {
        summary: BatchSummary,
        #[source]
        error: StoreError,
    },
}

impl BatchError {
    /// Summary of the run that failed to persist
    pub fn summary(&self) -> &BatchSummary {
        match self {
            BatchError::Store { summary, .. } => summary,
        }
    }
}
