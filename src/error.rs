use std::io;
use thiserror::Error;

use crate::query::ZoneIdentifier;

/// Process-level errors for the world-time binary
#[derive(Error, Debug)]
pub enum AppError {
    /// Error when an environment variable holds a value that cannot be parsed
    #[error("Invalid value for {0}: {1:?}")]
    InvalidConfig(String, String),

    /// Error when the configured base URL cannot be used as a data-source root
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Wrapper for reqwest errors
    #[error("HTTP client error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Wrapper for I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Wrapper for JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A raw failure reported by a time-zone data source, before classification.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The upstream answered with a 4xx/5xx status
    #[error("upstream responded {code} {reason} - {body}")]
    Status {
        code: u16,
        reason: String,
        body: String,
    },

    /// The attempt did not complete before its deadline
    #[error("attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport error raised by the HTTP client
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Socket-level error
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The upstream body does not have the expected shape
    #[error("{0}")]
    Malformed(String),
}

/// Outcome taxonomy of one resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NoMatch(String),

    #[error("multiple time zones found, please specify one of: {}", join(.0))]
    Ambiguous(Vec<ZoneIdentifier>),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    UpstreamMalformed(String),

    #[error("{0}")]
    Timeout(String),
}

fn join(zones: &[ZoneIdentifier]) -> String {
    zones
        .iter()
        .map(ZoneIdentifier::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ResolutionError {
    /// Stable tag used by callers that serialize the error.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::InvalidInput(_) => "invalid_input",
            ResolutionError::NoMatch(_) => "no_match",
            ResolutionError::Ambiguous(_) => "ambiguous",
            ResolutionError::UpstreamUnavailable(_) => "upstream_unavailable",
            ResolutionError::UpstreamMalformed(_) => "upstream_malformed",
            ResolutionError::Timeout(_) => "timeout",
        }
    }

    /// Whether the caller is at fault (400-class) rather than the upstream (500-class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ResolutionError::InvalidInput(_)
                | ResolutionError::NoMatch(_)
                | ResolutionError::Ambiguous(_)
        )
    }

    /// HTTP status a request handler should answer with.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() { 400 } else { 500 }
    }
}
