//! Shared HTTP plumbing for source adapters
//!
//! Maps upstream responses onto the fetch contract:
//! - 2xx: body parsed as JSON
//! - 404: `Ok(None)` (entity unknown upstream)
//! - 429, or 403 with an exhausted rate-limit header: `RateLimited`
//! - 5xx: `Transient`
//! - anything else: `Http`

use crate::error::FetchError;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Upper bound for connection setup; the per-call deadline is enforced by
/// the orchestrator
const CONNECT_TIMEOUT_SECS: u64 = 5;
/// Response bodies quoted in errors are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Build the HTTP client shared by all adapters
pub fn build_client(user_agent: &str) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(|e| FetchError::Transient(format!("Failed to build HTTP client: {}", e)))
}

/// Send a request and decode a JSON body
pub async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<Option<T>, FetchError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !status.is_success() {
        if let Some(err) = rate_limit_signal(status, response.headers()) {
            return Err(err);
        }
        let body = response.text().await.unwrap_or_default();
        return Err(classify_failure(status, &body));
    }

    let parsed = response
        .json::<T>()
        .await
        .map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(Some(parsed))
}

/// Detect a source-wide rate-limit response
pub fn rate_limit_signal(status: StatusCode, headers: &HeaderMap) -> Option<FetchError> {
    let exhausted = header_str(headers, "x-ratelimit-remaining")
        .map(|v| v.trim() == "0")
        .unwrap_or(false);

    let limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && exhausted);
    if !limited {
        return None;
    }

    Some(FetchError::RateLimited {
        retry_after: retry_after(headers),
    })
}

/// Classify a non-success, non-rate-limit status
pub fn classify_failure(status: StatusCode, body: &str) -> FetchError {
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if status.is_server_error() {
        FetchError::Transient(format!("HTTP {}: {}", status.as_u16(), body))
    } else {
        FetchError::Http {
            status: status.as_u16(),
            body,
        }
    }
}

/// Wait hint from `Retry-After` (seconds) or `X-RateLimit-Reset` (epoch seconds)
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(secs) = header_str(headers, "retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }

    let reset = header_str(headers, "x-ratelimit-reset")?.trim().parse::<i64>().ok()?;
    let now = chrono::Utc::now().timestamp();
    Some(Duration::from_secs(reset.saturating_sub(now).max(0) as u64))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
