//! PatentsView adapter
//!
//! Queries the PatentSearch API for patents granted to an assignee
//! organization. The API requires a key (`X-Api-Key`) and allows 45
//! requests per minute.

use super::http::fetch_json;
use crate::error::FetchError;
use crate::services::{EnrichmentAdapter, SourceSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const SOURCE: &str = "patents";
pub const COLLECTION: &str = "company_patents";

const SEARCH_URL: &str = "https://search.patentsview.org/api/v1/patent/";
/// Most recent grants kept per assignee
const RECENT_LIMIT: usize = 10;

/// Assignee organizations as registered with the USPTO
pub const DEFAULT_ENTITIES: &[&str] = &[
    "Space Exploration Technologies Corp.",
    "Rocket Lab USA, Inc.",
    "Blue Origin, LLC",
    "Planet Labs Inc.",
];

/// Patent portfolio of one assignee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentSummary {
    pub assignee: String,
    pub total_patents: u64,
    /// Newest grants first
    pub recent: Vec<PatentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRef {
    pub patent_id: String,
    pub title: String,
    pub granted: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatentSearchResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub patents: Vec<PatentHit>,
}

#[derive(Debug, Deserialize)]
pub struct PatentHit {
    pub patent_id: String,
    #[serde(default)]
    pub patent_title: Option<String>,
    #[serde(default)]
    pub patent_date: Option<String>,
}

/// Request body for an assignee query
pub fn search_body(assignee: &str) -> serde_json::Value {
    json!({
        "q": { "assignees.assignee_organization": assignee },
        "f": ["patent_id", "patent_title", "patent_date"],
        "s": [{ "patent_date": "desc" }],
        "o": { "size": RECENT_LIMIT }
    })
}

/// Map a search response; zero hits means the assignee is unknown
pub fn summarize(assignee: &str, response: PatentSearchResponse) -> Result<Option<PatentSummary>, FetchError> {
    if response.error {
        return Err(FetchError::Parse("PatentsView reported a query error".to_string()));
    }
    if response.total_hits == 0 {
        return Ok(None);
    }

    let recent = response
        .patents
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|hit| PatentRef {
            patent_id: hit.patent_id,
            title: hit.patent_title.unwrap_or_default(),
            granted: hit.patent_date,
        })
        .collect();

    Ok(Some(PatentSummary {
        assignee: assignee.to_string(),
        total_patents: response.total_hits,
        recent,
    }))
}

/// PatentsView adapter
pub struct PatentsAdapter {
    client: Client,
    api_key: String,
    entities: Vec<String>,
    settings: SourceSettings,
}

impl PatentsAdapter {
    /// Fails when no API key is configured
    pub fn new(
        client: Client,
        api_key: Option<String>,
        entities: Vec<String>,
        settings: SourceSettings,
    ) -> Result<Self, FetchError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| FetchError::Config("PatentsView API key is not set".to_string()))?;

        Ok(Self {
            client,
            api_key,
            entities,
            settings,
        })
    }

    /// Compiled defaults for PatentsView
    pub fn default_settings() -> SourceSettings {
        SourceSettings {
            delay: Duration::from_millis(1_500),
            cache_ttl: Duration::from_millis(3_600_000),
            request_timeout: Duration::from_millis(20_000),
            ..SourceSettings::default()
        }
    }
}

#[async_trait]
impl EnrichmentAdapter for PatentsAdapter {
    type Entity = String;
    type Record = PatentSummary;

    fn source(&self) -> &str {
        SOURCE
    }

    fn collection(&self) -> &str {
        COLLECTION
    }

    fn entities(&self) -> &[String] {
        &self.entities
    }

    fn entity_key(&self, entity: &String) -> String {
        entity.clone()
    }

    fn settings(&self) -> SourceSettings {
        self.settings
    }

    async fn fetch(&self, assignee: &String) -> Result<Option<PatentSummary>, FetchError> {
        debug!(assignee = %assignee, "Querying PatentsView");

        let request = self
            .client
            .post(SEARCH_URL)
            .header("X-Api-Key", &self.api_key)
            .json(&search_body(assignee));

        match fetch_json::<PatentSearchResponse>(request).await? {
            Some(response) => summarize(assignee, response),
            None => Ok(None),
        }
    }
}
