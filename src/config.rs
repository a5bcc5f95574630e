use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::serp::client::{SearchSettings, DEFAULT_API_URL};
use crate::serp::types::{Device, Location};

pub const DEFAULT_CONCURRENCY: usize = 15;
pub const DEFAULT_MIN_MATCH: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Central configuration loaded from environment variables.
///
/// The API key comes from the environment (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy. Command-line flags
/// override individual fields before [`Config::settings`] validates them.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    /// ValueSERP endpoint (defaults to https://api.valueserp.com).
    pub api_url: String,
    pub location: Location,
    pub device: Device,
    /// Parallel searches in flight (1-25).
    pub concurrency: usize,
    /// Minimum shared-domain hits for a keyword to be reported (2-5).
    pub min_match: u32,
    /// Only count domains containing this substring (e.g. your own site).
    pub domain_filter: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Optional cap on requests per second across all workers.
    pub max_qps: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            location: Location::default(),
            device: Device::default(),
            concurrency: DEFAULT_CONCURRENCY,
            min_match: DEFAULT_MIN_MATCH,
            domain_filter: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_qps: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. Unset or blank values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            api_key: get("VALUESERP_API_KEY").unwrap_or_default(),
            api_url: get("VALUESERP_API_URL").unwrap_or(defaults.api_url),
            location: get("SERP_LOCATION")
                .map(|v| v.parse::<Location>())
                .transpose()?
                .unwrap_or(defaults.location),
            device: get("SERP_DEVICE")
                .map(|v| v.parse::<Device>())
                .transpose()?
                .unwrap_or(defaults.device),
            concurrency: parse_number(get("SERP_CONCURRENCY"), "SERP_CONCURRENCY")?
                .unwrap_or(defaults.concurrency),
            min_match: parse_number(get("SERP_MIN_MATCH"), "SERP_MIN_MATCH")?
                .unwrap_or(defaults.min_match),
            domain_filter: get("SERP_DOMAIN_FILTER"),
            timeout_secs: parse_number(get("SERP_TIMEOUT_SECS"), "SERP_TIMEOUT_SECS")?
                .unwrap_or(defaults.timeout_secs),
            max_retries: parse_number(get("SERP_MAX_RETRIES"), "SERP_MAX_RETRIES")?
                .unwrap_or(defaults.max_retries),
            max_qps: parse_number(get("SERP_MAX_QPS"), "SERP_MAX_QPS")?,
        })
    }

    /// Check that the ValueSERP API key is configured.
    /// Call this before any operation that hits the search API.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// Settings for the search client alone (used by single-keyword lookups).
    pub fn search_settings(&self) -> Result<SearchSettings, ConfigError> {
        self.require_api_key()?;
        Ok(SearchSettings {
            api_key: self.api_key.trim().to_string(),
            api_url: self.api_url.clone(),
            location: self.location,
            device: self.device,
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_retries: self.max_retries,
            max_qps: self.max_qps,
        })
    }

    /// Validate everything a clustering run needs.
    pub fn settings(&self) -> Result<RunSettings, ConfigError> {
        if !(1..=25).contains(&self.concurrency) {
            return Err(ConfigError::ConcurrencyOutOfRange(self.concurrency));
        }
        if !(2..=5).contains(&self.min_match) {
            return Err(ConfigError::MinMatchOutOfRange(self.min_match));
        }

        Ok(RunSettings {
            search: self.search_settings()?,
            concurrency: self.concurrency,
            min_match: self.min_match,
            domain_filter: self
                .domain_filter
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        })
    }
}

/// Validated, immutable settings for one clustering run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub search: SearchSettings,
    pub concurrency: usize,
    pub min_match: u32,
    pub domain_filter: Option<String>,
}

fn parse_number<T: FromStr>(value: Option<String>, var: &'static str) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var,
                value: v.clone(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.concurrency, 15);
        assert_eq!(config.min_match, 3);
        assert_eq!(config.location, Location::UnitedStates);
        assert_eq!(config.device, Device::Mobile);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.domain_filter.is_none());
    }

    #[test]
    fn environment_values_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("VALUESERP_API_KEY", "k"),
            ("SERP_LOCATION", "uk"),
            ("SERP_DEVICE", "Tablet"),
            ("SERP_CONCURRENCY", "4"),
            ("SERP_MIN_MATCH", "2"),
            ("SERP_DOMAIN_FILTER", "example.com"),
            ("SERP_MAX_QPS", "2.5"),
        ]))
        .unwrap();
        assert_eq!(config.location, Location::UnitedKingdom);
        assert_eq!(config.device, Device::Tablet);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.min_match, 2);
        assert_eq!(config.domain_filter.as_deref(), Some("example.com"));
        assert_eq!(config.max_qps, Some(2.5));
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = Config::from_lookup(lookup(&[("SERP_CONCURRENCY", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "SERP_CONCURRENCY",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn settings_require_api_key() {
        let config = Config::default();
        assert_eq!(config.settings().unwrap_err(), ConfigError::MissingApiKey);
    }

    #[test]
    fn settings_enforce_ranges() {
        let mut config = Config {
            api_key: "k".to_string(),
            ..Config::default()
        };
        config.concurrency = 26;
        assert_eq!(config.settings().unwrap_err(), ConfigError::ConcurrencyOutOfRange(26));
        config.concurrency = 1;
        config.min_match = 1;
        assert_eq!(config.settings().unwrap_err(), ConfigError::MinMatchOutOfRange(1));
        config.min_match = 5;
        assert!(config.settings().is_ok());
    }

    #[test]
    fn blank_domain_filter_is_ignored() {
        let config = Config {
            api_key: "k".to_string(),
            domain_filter: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(config.settings().unwrap().domain_filter.is_none());
    }
}
