//! SEC EDGAR company facts adapter
//!
//! Pulls XBRL company facts for a CIK and reduces them to the latest annual
//! (10-K) revenue, net income and total assets.
//!
//! EDGAR asks for no more than 10 requests per second and a descriptive
//! User-Agent; requests without one are refused with 403.

use super::http::fetch_json;
use crate::error::FetchError;
use crate::services::{EnrichmentAdapter, SourceSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const SOURCE: &str = "sec_edgar";
pub const COLLECTION: &str = "company_financials";

const BASE_URL: &str = "https://data.sec.gov/api/xbrl/companyfacts";

/// Publicly traded space companies, by CIK
pub const DEFAULT_ENTITIES: &[&str] = &[
    "0001819994", // Rocket Lab USA
    "0001418819", // Iridium Communications
    "0000797721", // Viasat
    "0001706946", // Virgin Galactic
    "0001836935", // Planet Labs
    "0001780312", // AST SpaceMobile
];

/// Revenue is reported under different concepts depending on filing year
const REVENUE_CONCEPTS: &[&str] = &[
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "SalesRevenueNet",
];
const NET_INCOME_CONCEPT: &str = "NetIncomeLoss";
const ASSETS_CONCEPT: &str = "Assets";

/// Latest annual financials of one filer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub cik: String,
    pub company_name: String,
    pub fiscal_year: Option<i32>,
    pub revenue_usd: Option<f64>,
    pub net_income_usd: Option<f64>,
    pub total_assets_usd: Option<f64>,
    /// Filing date of the most recent annual report used
    pub latest_filing: Option<String>,
}

// Upstream response shapes

#[derive(Debug, Deserialize)]
pub struct CompanyFacts {
    #[serde(rename = "entityName")]
    pub entity_name: String,
    #[serde(default)]
    pub facts: HashMap<String, HashMap<String, Concept>>,
}

#[derive(Debug, Deserialize)]
pub struct Concept {
    #[serde(default)]
    pub units: HashMap<String, Vec<FactValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactValue {
    pub end: String,
    pub val: f64,
    #[serde(default)]
    pub fy: Option<i32>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub filed: Option<String>,
}

/// Pad a CIK to the 10 digits EDGAR URLs require
pub fn normalize_cik(cik: &str) -> String {
    let digits: String = cik.trim().chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{:0>10}", digits)
}

/// Reduce company facts to a summary
///
/// Returns `None` when the filer reports none of the tracked concepts.
pub fn summarize(cik: &str, facts: &CompanyFacts) -> Option<FinancialSummary> {
    let gaap = facts.facts.get("us-gaap")?;

    let revenue = REVENUE_CONCEPTS
        .iter()
        .filter_map(|concept| latest_annual(gaap, concept))
        .max_by(|a, b| a.end.cmp(&b.end));
    let net_income = latest_annual(gaap, NET_INCOME_CONCEPT);
    let assets = latest_annual(gaap, ASSETS_CONCEPT);

    if revenue.is_none() && net_income.is_none() && assets.is_none() {
        return None;
    }

    let newest = [&revenue, &net_income, &assets]
        .into_iter()
        .flatten()
        .max_by(|a, b| a.end.cmp(&b.end));

    Some(FinancialSummary {
        cik: cik.to_string(),
        company_name: facts.entity_name.clone(),
        fiscal_year: newest.and_then(|f| f.fy),
        revenue_usd: revenue.as_ref().map(|f| f.val),
        net_income_usd: net_income.as_ref().map(|f| f.val),
        total_assets_usd: assets.as_ref().map(|f| f.val),
        latest_filing: newest.and_then(|f| f.filed.clone()),
    })
}

/// Most recent USD value of a concept reported on a 10-K
fn latest_annual(gaap: &HashMap<String, Concept>, concept: &str) -> Option<FactValue> {
    gaap.get(concept)?
        .units
        .get("USD")?
        .iter()
        .filter(|f| f.form.as_deref() == Some("10-K"))
        .max_by(|a, b| a.end.cmp(&b.end))
        .cloned()
}

/// SEC EDGAR adapter
pub struct SecEdgarAdapter {
    client: Client,
    entities: Vec<String>,
    settings: SourceSettings,
}

impl SecEdgarAdapter {
    pub fn new(client: Client, entities: Vec<String>, settings: SourceSettings) -> Self {
        let entities = entities.iter().map(|c| normalize_cik(c)).collect();
        Self {
            client,
            entities,
            settings,
        }
    }

    /// Compiled defaults for EDGAR
    pub fn default_settings() -> SourceSettings {
        SourceSettings {
            delay: std::time::Duration::from_millis(200),
            ..SourceSettings::default()
        }
    }
}

#[async_trait]
impl EnrichmentAdapter for SecEdgarAdapter {
    type Entity = String;
    type Record = FinancialSummary;

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

    async fn fetch(&self, cik: &String) -> Result<Option<FinancialSummary>, FetchError> {
        let url = format!("{}/CIK{}.json", BASE_URL, cik);
        debug!(cik = %cik, url = %url, "Querying SEC EDGAR");

        let facts: Option<CompanyFacts> = fetch_json(self.client.get(&url)).await?;
        Ok(facts.and_then(|f| summarize(cik, &f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cik": 1819994,
        "entityName": "Rocket Lab USA, Inc.",
        "facts": {
            "us-gaap": {
                "Revenues": {
                    "label": "Revenues",
                    "units": {
                        "USD": [
                            {"end": "2022-12-31", "val": 211000000, "fy": 2022, "fp": "FY", "form": "10-K", "filed": "2023-03-07"},
                            {"end": "2023-12-31", "val": 244592000, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-28"},
                            {"end": "2024-03-31", "val": 92770000, "fy": 2024, "fp": "Q1", "form": "10-Q", "filed": "2024-05-07"}
                        ]
                    }
                },
                "NetIncomeLoss": {
                    "units": {
                        "USD": [
                            {"end": "2023-12-31", "val": -182569000, "fy": 2023, "form": "10-K", "filed": "2024-02-28"}
                        ]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_normalize_cik_pads_to_ten_digits() {
        assert_eq!(normalize_cik("1819994"), "0001819994");
        assert_eq!(normalize_cik(" 0001819994 "), "0001819994");
    }

    #[test]
    fn test_summarize_picks_latest_annual_values() {
        let facts: CompanyFacts = serde_json::from_str(SAMPLE).unwrap();
        let summary = summarize("0001819994", &facts).unwrap();

        assert_eq!(summary.company_name, "Rocket Lab USA, Inc.");
        assert_eq!(summary.fiscal_year, Some(2023));
        // 10-Q values are ignored
        assert_eq!(summary.revenue_usd, Some(244_592_000.0));
        assert_eq!(summary.net_income_usd, Some(-182_569_000.0));
        assert_eq!(summary.total_assets_usd, None);
        assert_eq!(summary.latest_filing.as_deref(), Some("2024-02-28"));
    }

    #[test]
    fn test_summarize_without_gaap_facts_is_none() {
        let facts: CompanyFacts =
            serde_json::from_str(r#"{"entityName": "Shell Co", "facts": {"dei": {}}}"#).unwrap();
        assert!(summarize("0000000001", &facts).is_none());
    }

    #[test]
    fn test_default_settings_pace_for_edgar() {
        let settings = SecEdgarAdapter::default_settings();
        assert_eq!(settings.delay.as_millis(), 200);
        assert!(!settings.abort_on_rate_limit);
    }
}
