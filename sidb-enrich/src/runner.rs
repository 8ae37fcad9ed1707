//! Source dispatch
//!
//! Builds the concrete adapter for a resolved source and runs it through
//! the orchestrator.

use crate::adapters::{
    FccSpectrumAdapter, GithubAdapter, PatentsAdapter, SecEdgarAdapter, SourceKind,
};
use crate::config::ResolvedSource;
use crate::error::BatchError;
use crate::models::BatchSummary;
use crate::services::{BatchOrchestrator, ContentStore};
use reqwest::Client;
use tracing::warn;

/// Result of running one source
#[derive(Debug)]
pub enum SourceOutcome {
    Completed(BatchSummary),
    /// Fetching finished but the content store rejected the upsert
    StoreFailed(BatchError),
    /// The adapter could not be built (e.g. missing API key)
    NotConfigured { source: String, reason: String },
}

impl SourceOutcome {
    pub fn summary(&self) -> Option<&BatchSummary> {
        match self {
            SourceOutcome::Completed(summary) => Some(summary),
            SourceOutcome::StoreFailed(err) => Some(err.summary()),
            SourceOutcome::NotConfigured { .. } => None,
        }
    }

    pub fn is_store_failure(&self) -> bool {
        matches!(self, SourceOutcome::StoreFailed(_))
    }
}

/// Run one source end to end
pub async fn run_source(
    orchestrator: &BatchOrchestrator,
    source: &ResolvedSource,
    client: &Client,
    store: &dyn ContentStore,
) -> SourceOutcome {
    let entities = source.entities.clone();
    let settings = source.settings;

    let result = match source.kind {
        SourceKind::SecEdgar => {
            let adapter = SecEdgarAdapter::new(client.clone(), entities, settings);
            orchestrator.run(&adapter, store).await
        }
        SourceKind::Patents => {
            let adapter = match PatentsAdapter::new(
                client.clone(),
                source.api_key.clone(),
                entities,
                settings,
            ) {
                Ok(adapter) => adapter,
                Err(err) => {
                    warn!(source = %source.kind, error = %err, "Source not configured, skipping");
                    return SourceOutcome::NotConfigured {
                        source: source.kind.name().to_string(),
                        reason: err.to_string(),
                    };
                }
            };
            orchestrator.run(&adapter, store).await
        }
        SourceKind::Github => {
            let adapter =
                GithubAdapter::new(client.clone(), source.api_key.clone(), entities, settings);
            if !adapter.is_authenticated() {
                warn!(source = %source.kind, "No GitHub token set, using the anonymous rate limit");
            }
            orchestrator.run(&adapter, store).await
        }
        SourceKind::FccSpectrum => {
            let adapter = FccSpectrumAdapter::new(client.clone(), entities, settings);
            orchestrator.run(&adapter, store).await
        }
    };

    match result {
        Ok(summary) => SourceOutcome::Completed(summary),
        Err(err) => SourceOutcome::StoreFailed(err),
    }
}
