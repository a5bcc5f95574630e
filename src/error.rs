// Typed errors for each stage of a clustering run.
//
// Input and config errors stop a run before it starts. Fetch errors are
// contained to one keyword, malformed URLs to one search result.

use thiserror::Error;

/// Problems with the keyword file. Surfaced to the user; the run never starts.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("keyword file not found: {path}")]
    NotFound { path: String },

    #[error("failed to read keyword file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("keyword file is not valid {encoding} text")]
    Encoding { encoding: &'static str },

    #[error("keyword file contains no rows")]
    Empty,

    #[error("keyword column {column:?} not found (available: {available})")]
    ColumnNotFound { column: String, available: String },

    #[error("no keywords left after removing empty values")]
    NoKeywords,
}

/// Invalid or missing settings. Surfaced to the user; the run never starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("VALUESERP_API_KEY not set. Add it to your .env file or pass --api-key")]
    MissingApiKey,

    #[error("unknown location {0:?} (expected one of US, UK, AU, IN, ES, IT, CA, DE, IE, FR, NL)")]
    UnknownLocation(String),

    #[error("unknown device {0:?} (expected mobile, desktop or tablet)")]
    UnknownDevice(String),

    #[error("concurrency must be between 1 and 25, got {0}")]
    ConcurrencyOutOfRange(usize),

    #[error("min match must be between 2 and 5, got {0}")]
    MinMatchOutOfRange(u32),

    #[error("{var} has an invalid value: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Failure to get results for a single keyword. The keyword contributes no
/// results; the rest of the batch carries on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("search request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("search request timed out")]
    Timeout,

    #[error("search API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode search API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("search API response has no organic_results list{}", api_message(.message))]
    MissingOrganicResults { message: Option<String> },

    #[error("cancelled before the search completed")]
    Cancelled,
}

impl FetchError {
    /// Whether retrying the same request could succeed: transport errors,
    /// timeouts, rate limiting (429) and server errors (5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Decode(_) | FetchError::MissingOrganicResults { .. } | FetchError::Cancelled => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(err)
        }
    }
}

fn api_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(" ({m})"),
        None => String::new(),
    }
}

/// A search result URL that has no host segment (fewer than three
/// `/`-separated parts, or an empty one).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed URL {url:?}: expected scheme://host/...")]
pub struct MalformedUrlError {
    pub url: String,
}
