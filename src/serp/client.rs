// HTTP client for the ValueSERP search API.
//
// One GET per keyword, first page only, ten results. The organic results
// are parsed entry by entry: a missing `link` or `position` becomes `None`
// instead of failing the keyword.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::rate_limit::{with_retry, RateLimiter, RetryPolicy};
use super::types::{Device, Location, RequestInfo, SearchResponse, SearchResult};
use crate::error::FetchError;

/// Default ValueSERP endpoint.
pub const DEFAULT_API_URL: &str = "https://api.valueserp.com";

/// Results requested per keyword (first page only).
pub const RESULTS_PER_KEYWORD: u32 = 10;

/// Everything a search client needs to issue requests.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub api_key: String,
    pub api_url: String,
    pub location: Location,
    pub device: Device,
    pub timeout: Duration,
    pub max_retries: u32,
    pub max_qps: Option<f64>,
}

/// Source of organic search results for a keyword.
///
/// The fetcher only depends on this trait, so tests drive it with an
/// in-memory provider instead of the network.
#[async_trait]
pub trait SerpProvider: Send + Sync {
    /// Search for one keyword and return its organic results.
    async fn search(&self, keyword: &str) -> Result<Vec<SearchResult>, FetchError>;
}

/// ValueSERP implementation of [`SerpProvider`].
pub struct ValueSerpClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    location: Location,
    device: Device,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ValueSerpClient {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("serpcluster/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            location: settings.location,
            device: settings.device,
            rate_limiter: RateLimiter::from_qps(settings.max_qps),
            retry: RetryPolicy::with_max_retries(settings.max_retries),
        })
    }

    /// Query string for one keyword.
    pub fn query_params(&self, keyword: &str) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("q", keyword.to_string()),
            ("location", self.location.api_name().to_string()),
            ("include_fields", "organic_results".to_string()),
            ("location_auto", "true".to_string()),
            ("device", self.device.as_str().to_string()),
            ("output", "json".to_string()),
            ("page", "1".to_string()),
            ("num", RESULTS_PER_KEYWORD.to_string()),
        ]
    }

    async fn search_once(&self, keyword: &str) -> Result<Vec<SearchResult>, FetchError> {
        let url = format!("{}/search", self.base_url);

        debug!(keyword = keyword, "Search request");

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(keyword))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = response.text().await?;
        parse_organic_results(keyword, &body)
    }
}

#[async_trait]
impl SerpProvider for ValueSerpClient {
    async fn search(&self, keyword: &str) -> Result<Vec<SearchResult>, FetchError> {
        with_retry(&self.rate_limiter, &self.retry, || self.search_once(keyword)).await
    }
}

/// Parse a search response body into results for `keyword`.
///
/// Fails only when the body is not JSON or has no `organic_results` list.
/// At most [`RESULTS_PER_KEYWORD`] results are returned.
pub fn parse_organic_results(keyword: &str, body: &str) -> Result<Vec<SearchResult>, FetchError> {
    let response: SearchResponse = serde_json::from_str(body)?;

    let Some(entries) = response.organic_results else {
        let message = response.request_info.and_then(|info| match info {
            RequestInfo { message: Some(message), .. } => Some(message),
            RequestInfo { success: Some(false), .. } => Some("request was not successful".to_string()),
            _ => None,
        });
        return Err(FetchError::MissingOrganicResults { message });
    };

    let results: Vec<SearchResult> = entries
        .iter()
        .take(RESULTS_PER_KEYWORD as usize)
        .map(|entry| SearchResult {
            keyword: keyword.to_string(),
            position: entry.get("position").and_then(parse_position),
            url: entry
                .get("link")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect();

    debug!(
        keyword = keyword,
        results = results.len(),
        "Parsed organic results"
    );

    Ok(results)
}

/// Positions normally arrive as integers; tolerate numeric strings too.
fn parse_position(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
