//! GitHub repository activity adapter
//!
//! Unauthenticated callers get 60 requests per hour, tokens raise that to
//! 5000. An exhausted quota is reported as 403 with
//! `X-RateLimit-Remaining: 0`, which aborts the batch by default.

use super::http::fetch_json;
use crate::error::FetchError;
use crate::services::{EnrichmentAdapter, SourceSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SOURCE: &str = "github";
pub const COLLECTION: &str = "repository_activity";

const API_URL: &str = "https://api.github.com/repos";

/// Open-source flight software and mission tooling repositories
pub const DEFAULT_ENTITIES: &[&str] = &["nasa/fprime", "nasa/openmct", "nasa/cFS", "esa/pykep"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryActivity {
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
    pub archived: bool,
    pub last_push: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepoResponse {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub subscribers_count: u64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

impl From<RepoResponse> for RepositoryActivity {
    fn from(repo: RepoResponse) -> Self {
        Self {
            full_name: repo.full_name,
            description: repo.description,
            language: repo.language,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            watchers: repo.subscribers_count,
            archived: repo.archived,
            last_push: repo.pushed_at,
        }
    }
}

/// Validate an `owner/repo` slug
pub fn parse_slug(slug: &str) -> Option<(&str, &str)> {
    let (owner, repo) = slug.trim().split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner, repo))
}

/// GitHub adapter
pub struct GithubAdapter {
    client: Client,
    token: Option<String>,
    entities: Vec<String>,
    /// Entries dropped because they are not `owner/repo` slugs
    invalid: Vec<String>,
    settings: SourceSettings,
}

impl GithubAdapter {
    /// Malformed slugs are dropped here so they never reach the breaker
    pub fn new(
        client: Client,
        token: Option<String>,
        entities: Vec<String>,
        settings: SourceSettings,
    ) -> Self {
        let (entities, invalid): (Vec<String>, Vec<String>) = entities
            .into_iter()
            .map(|slug| slug.trim().to_string())
            .partition(|slug| parse_slug(slug).is_some());

        for slug in &invalid {
            warn!(source = SOURCE, entity = %slug, "Invalid repository slug, expected owner/repo; skipping");
        }

        Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            entities,
            invalid,
            settings,
        }
    }

    /// Configured entries that were not valid `owner/repo` slugs
    pub fn invalid_entities(&self) -> &[String] {
        &self.invalid
    }

    /// Compiled defaults for GitHub
    pub fn default_settings() -> SourceSettings {
        SourceSettings {
            abort_on_rate_limit: true,
            ..SourceSettings::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl EnrichmentAdapter for GithubAdapter {
    type Entity = String;
    type Record = RepositoryActivity;

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

    async fn fetch(&self, slug: &String) -> Result<Option<RepositoryActivity>, FetchError> {
        let (owner, repo) = parse_slug(slug).ok_or_else(|| {
            FetchError::Config(format!("Invalid repository slug '{}', expected owner/repo", slug))
        })?;

        let url = format!("{}/{}/{}", API_URL, owner, repo);
        debug!(repo = %slug, authenticated = self.is_authenticated(), "Querying GitHub");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let repo: Option<RepoResponse> = fetch_json(request).await?;
        Ok(repo.map(RepositoryActivity::from))
    }
}
