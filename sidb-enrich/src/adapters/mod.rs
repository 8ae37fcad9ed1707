//! Source adapters
//!
//! One module per external API. Each adapter maps upstream responses to a
//! canonical record and leaves pacing, caching and breaking to the
//! orchestrator.

pub mod fcc_spectrum;
pub mod github;
pub mod http;
pub mod patents;
pub mod sec_edgar;

pub use fcc_spectrum::{FccSpectrumAdapter, SpectrumSummary};
pub use github::{GithubAdapter, RepositoryActivity};
pub use patents::{PatentSummary, PatentsAdapter};
pub use sec_edgar::{FinancialSummary, SecEdgarAdapter};

use crate::services::SourceSettings;
use std::fmt;
use std::str::FromStr;

/// The enrichment sources this crate knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    SecEdgar,
    Patents,
    Github,
    FccSpectrum,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::SecEdgar,
        SourceKind::Patents,
        SourceKind::Github,
        SourceKind::FccSpectrum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::SecEdgar => sec_edgar::SOURCE,
            SourceKind::Patents => patents::SOURCE,
            SourceKind::Github => github::SOURCE,
            SourceKind::FccSpectrum => fcc_spectrum::SOURCE,
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            SourceKind::SecEdgar => sec_edgar::COLLECTION,
            SourceKind::Patents => patents::COLLECTION,
            SourceKind::Github => github::COLLECTION,
            SourceKind::FccSpectrum => fcc_spectrum::COLLECTION,
        }
    }

    /// Compiled settings before TOML overrides
    pub fn default_settings(&self) -> SourceSettings {
        match self {
            SourceKind::SecEdgar => SecEdgarAdapter::default_settings(),
            SourceKind::Patents => PatentsAdapter::default_settings(),
            SourceKind::Github => GithubAdapter::default_settings(),
            SourceKind::FccSpectrum => FccSpectrumAdapter::default_settings(),
        }
    }

    /// Compiled entity list before TOML overrides
    pub fn default_entities(&self) -> &'static [&'static str] {
        match self {
            SourceKind::SecEdgar => sec_edgar::DEFAULT_ENTITIES,
            SourceKind::Patents => patents::DEFAULT_ENTITIES,
            SourceKind::Github => github::DEFAULT_ENTITIES,
            SourceKind::FccSpectrum => fcc_spectrum::DEFAULT_ENTITIES,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = SourceKind::ALL.iter().map(|k| k.name()).collect();
                format!("Unknown source '{}' (known: {})", s, known.join(", "))
            })
    }
}
