//! Per-source configuration resolution for sidb-enrich
//!
//! Compiled adapter defaults are overlaid with the `[sources.<name>]` TOML
//! section; API keys come from ENV or TOML (ENV already applied by
//! `sidb_common::config::load_config`).

use crate::adapters::SourceKind;
use crate::services::SourceSettings;
use sidb_common::config::{SourceConfig, TomlConfig};
use tracing::{info, warn};

/// Effective configuration of one source
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    pub kind: SourceKind,
    pub enabled: bool,
    pub settings: SourceSettings,
    pub entities: Vec<String>,
    pub api_key: Option<String>,
}

/// Resolve one source from the loaded configuration
pub fn resolve_source(kind: SourceKind, config: &TomlConfig) -> ResolvedSource {
    let fallback = SourceConfig::default();
    let section = config.sources.get(kind.name()).unwrap_or(&fallback);

    let settings = kind.default_settings().with_overrides(section);
    if settings.breaker.failure_threshold == 0 {
        warn!(
            source = %kind,
            "failure_threshold = 0 is treated as 1"
        );
    }

    let entities = match &section.entities {
        Some(list) => {
            let entities: Vec<String> = list
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            info!(source = %kind, count = entities.len(), "Using configured entity list");
            entities
        }
        None => kind.default_entities().iter().map(|e| e.to_string()).collect(),
    };

    ResolvedSource {
        kind,
        enabled: section.enabled,
        settings,
        entities,
        api_key: section.api_key.clone().filter(|k| !k.trim().is_empty()),
    }
}

/// Resolve the requested sources, or every enabled source when none is named
///
/// Explicitly requested sources run even when disabled in TOML.
pub fn select_sources(requested: &[SourceKind], config: &TomlConfig) -> Vec<ResolvedSource> {
    if requested.is_empty() {
        SourceKind::ALL
            .into_iter()
            .map(|kind| resolve_source(kind, config))
            .filter(|source| {
                if !source.enabled {
                    info!(source = %source.kind, "Source disabled in config, skipping");
                }
                source.enabled
            })
            .collect()
    } else {
        let mut seen = Vec::new();
        requested
            .iter()
            .filter(|kind| {
                if seen.contains(*kind) {
                    false
                } else {
                    seen.push(**kind);
                    true
                }
            })
            .map(|kind| resolve_source(*kind, config))
            .collect()
    }
}
