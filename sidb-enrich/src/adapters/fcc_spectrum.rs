//! FCC license view adapter
//!
//! Searches the FCC License View API by licensee name and summarizes the
//! spectrum licenses held. The API signals "no results" with a 200 response
//! carrying `status: "Info"` instead of a 404.

use super::http::fetch_json;
use crate::error::FetchError;
use crate::services::{EnrichmentAdapter, SourceSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const SOURCE: &str = "fcc_spectrum";
pub const COLLECTION: &str = "spectrum_licenses";

const SEARCH_URL: &str = "https://data.fcc.gov/api/license-view/basicSearch/getLicenses";
/// Licenses listed per licensee; totals still count all of them
const LISTED_LIMIT: usize = 25;

/// Satellite operators holding FCC authorizations
pub const DEFAULT_ENTITIES: &[&str] = &[
    "Space Exploration Holdings",
    "Kuiper Systems",
    "AST & Science",
    "Iridium",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSummary {
    pub licensee: String,
    pub total_licenses: u64,
    pub active_licenses: u64,
    pub licenses: Vec<SpectrumLicense>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumLicense {
    pub callsign: String,
    pub service: Option<String>,
    pub status: Option<String>,
    pub expires: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LicenseSearchResponse {
    pub status: String,
    #[serde(rename = "Licenses", default)]
    pub licenses: Option<LicensePage>,
}

#[derive(Debug, Deserialize)]
pub struct LicensePage {
    /// The API returns counts as strings
    #[serde(rename = "totalRows", default)]
    pub total_rows: Option<String>,
    #[serde(rename = "License", default)]
    pub license: Vec<LicenseEntry>,
}

#[derive(Debug, Deserialize)]
pub struct LicenseEntry {
    #[serde(rename = "callsign", default)]
    pub callsign: String,
    #[serde(rename = "serviceDesc", default)]
    pub service_desc: Option<String>,
    #[serde(rename = "statusDesc", default)]
    pub status_desc: Option<String>,
    #[serde(rename = "expiredDate", default)]
    pub expired_date: Option<String>,
}

/// Map a search response; an `Info` status or an empty page means not found
pub fn summarize(licensee: &str, response: LicenseSearchResponse) -> Result<Option<SpectrumSummary>, FetchError> {
    match response.status.as_str() {
        "OK" => {}
        "Info" => return Ok(None),
        other => {
            return Err(FetchError::Parse(format!(
                "Unexpected FCC response status '{}'",
                other
            )))
        }
    }

    let page = match response.licenses {
        Some(page) if !page.license.is_empty() => page,
        _ => return Ok(None),
    };

    let active_licenses = page
        .license
        .iter()
        .filter(|l| l.status_desc.as_deref() == Some("Active"))
        .count() as u64;
    let total_licenses = page
        .total_rows
        .as_deref()
        .and_then(|rows| rows.trim().parse::<u64>().ok())
        .unwrap_or(page.license.len() as u64);

    let licenses = page
        .license
        .into_iter()
        .take(LISTED_LIMIT)
        .map(|l| SpectrumLicense {
            callsign: l.callsign,
            service: l.service_desc,
            status: l.status_desc,
            expires: l.expired_date,
        })
        .collect();

    Ok(Some(SpectrumSummary {
        licensee: licensee.to_string(),
        total_licenses,
        active_licenses,
        licenses,
    }))
}

/// FCC spectrum adapter
pub struct FccSpectrumAdapter {
    client: Client,
    entities: Vec<String>,
    settings: SourceSettings,
}

impl FccSpectrumAdapter {
    pub fn new(client: Client, entities: Vec<String>, settings: SourceSettings) -> Self {
        Self {
            client,
            entities,
            settings,
        }
    }

    /// Compiled defaults for the FCC API
    pub fn default_settings() -> SourceSettings {
        SourceSettings {
            cache_ttl: Duration::from_millis(3_600_000),
            request_timeout: Duration::from_millis(20_000),
            ..SourceSettings::default()
        }
    }
}

#[async_trait]
impl EnrichmentAdapter for FccSpectrumAdapter {
    type Entity = String;
    type Record = SpectrumSummary;

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

    async fn fetch(&self, licensee: &String) -> Result<Option<SpectrumSummary>, FetchError> {
        debug!(licensee = %licensee, "Querying FCC license view");

        let request = self
            .client
            .get(SEARCH_URL)
            .query(&[("searchValue", licensee.as_str()), ("format", "json")]);

        match fetch_json::<LicenseSearchResponse>(request).await? {
            Some(response) => summarize(licensee, response),
            None => Ok(None),
        }
    }
}
