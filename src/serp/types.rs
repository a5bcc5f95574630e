// Search request options and parsed search results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One organic result for a keyword. `position` and `url` are optional
/// because the API does not guarantee either field on every entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    pub keyword: String,
    pub position: Option<u32>,
    pub url: Option<String>,
}

/// Device type the search is run as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Mobile,
    Desktop,
    Tablet,
}

impl Device {
    /// Value sent in the `device` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Desktop => "desktop",
            Device::Tablet => "tablet",
        }
    }
}

impl FromStr for Device {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" => Ok(Device::Mobile),
            "desktop" => Ok(Device::Desktop),
            "tablet" => Ok(Device::Tablet),
            _ => Err(ConfigError::UnknownDevice(s.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported search locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    UnitedStates,
    UnitedKingdom,
    Australia,
    India,
    Spain,
    Italy,
    Canada,
    Germany,
    Ireland,
    France,
    Netherlands,
}

impl Location {
    pub const ALL: [Location; 11] = [
        Location::UnitedStates,
        Location::UnitedKingdom,
        Location::Australia,
        Location::India,
        Location::Spain,
        Location::Italy,
        Location::Canada,
        Location::Germany,
        Location::Ireland,
        Location::France,
        Location::Netherlands,
    ];

    /// Short code accepted on the command line and in SERP_LOCATION.
    pub fn code(self) -> &'static str {
        match self {
            Location::UnitedStates => "US",
            Location::UnitedKingdom => "UK",
            Location::Australia => "AU",
            Location::India => "IN",
            Location::Spain => "ES",
            Location::Italy => "IT",
            Location::Canada => "CA",
            Location::Germany => "DE",
            Location::Ireland => "IE",
            Location::France => "FR",
            Location::Netherlands => "NL",
        }
    }

    /// Location name sent to the API (resolved server-side with `location_auto`).
    pub fn api_name(self) -> &'static str {
        match self {
            Location::UnitedStates => "United States",
            Location::UnitedKingdom => "United Kingdom",
            Location::Australia => "Australia",
            Location::India => "India",
            Location::Spain => "Spain",
            Location::Italy => "Italy",
            Location::Canada => "Canada",
            Location::Germany => "Germany",
            Location::Ireland => "Ireland",
            Location::France => "France",
            Location::Netherlands => "Netherlands",
        }
    }
}

impl FromStr for Location {
    type Err = ConfigError;

    /// Accepts either the short code ("UK") or the full name ("United Kingdom"),
    /// case-insensitively. "GB" and "Holland" are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let alias = match wanted.to_ascii_uppercase().as_str() {
            "GB" => Some(Location::UnitedKingdom),
            "HOLLAND" => Some(Location::Netherlands),
            _ => None,
        };
        if let Some(location) = alias {
            return Ok(location);
        }

        Location::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(wanted) || l.api_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownLocation(s.to_string()))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// --- ValueSERP response types ---

/// Top-level search response. Entries of `organic_results` are kept as raw
/// JSON so one malformed entry cannot fail the whole keyword.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub request_info: Option<RequestInfo>,
    pub organic_results: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct RequestInfo {
    pub success: Option<bool>,
    pub message: Option<String>,
}
