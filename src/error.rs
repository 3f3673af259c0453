//! Error types for the component boundaries.
//!
//! Component-internal failures (one bad post, one retried request) are absorbed
//! where they happen; what reaches these enums is what a caller must see.

use thiserror::Error;

/// Failures from a search provider call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("search credentials missing")]
    MissingCredentials,

    #[error("search rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("search rate limited (HTTP 429)")]
    RateLimited,

    #[error("search returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search request failed: {0}")]
    Transport(String),

    #[error("search response could not be decoded: {0}")]
    Decode(String),
}

impl SearchError {
    /// Whether another attempt may succeed. Auth problems never fix themselves.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SearchError::MissingCredentials | SearchError::Unauthorized { .. }
        )
    }
}

/// Failures of one `analyze` call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("post source unavailable after {attempts} attempt(s): {source}")]
    Upstream {
        attempts: u32,
        #[source]
        source: SearchError,
    },
}

/// Failures from the exchange collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("exchange is not configured")]
    NotConfigured,

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("request signing failed: {0}")]
    Signing(String),

    /// The exchange answered with a non-2xx status; `message` is its body, verbatim.
    #[error("exchange rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("exchange request failed: {0}")]
    Transport(String),

    #[error("exchange response could not be decoded: {0}")]
    Decode(String),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
