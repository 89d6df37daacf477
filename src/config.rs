use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::AppError;
use crate::retry::RetryPolicy;
use crate::source::DEFAULT_BASE_URL;

pub const BASE_URL_VAR: &str = "WORLD_TIME_BASE_URL";
pub const ATTEMPT_TIMEOUT_VAR: &str = "WORLD_TIME_ATTEMPT_TIMEOUT_SECS";
pub const MAX_RETRIES_VAR: &str = "WORLD_TIME_MAX_RETRIES";
pub const BACKOFF_MS_VAR: &str = "WORLD_TIME_BACKOFF_MS";
pub const BACKOFF_MULTIPLIER_VAR: &str = "WORLD_TIME_BACKOFF_MULTIPLIER";
pub const RETRY_CATALOG_VAR: &str = "WORLD_TIME_RETRY_CATALOG";

/// Runtime settings, read from `WORLD_TIME_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub retry: RetryPolicy,
    /// Whether the zone listing goes through the same retry loop as per-zone fetches
    pub retry_catalog: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            retry_catalog: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let config = Self {
            base_url: lookup(BASE_URL_VAR).unwrap_or(defaults.base_url),
            retry: RetryPolicy {
                max_retries: parse_or(&lookup, MAX_RETRIES_VAR, defaults.retry.max_retries)?,
                initial_backoff: Duration::from_millis(parse_or(
                    &lookup,
                    BACKOFF_MS_VAR,
                    defaults.retry.initial_backoff.as_millis() as u64,
                )?),
                backoff_multiplier: parse_multiplier(&lookup, defaults.retry.backoff_multiplier)?,
                attempt_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    ATTEMPT_TIMEOUT_VAR,
                    defaults.retry.attempt_timeout.as_secs(),
                )?),
            },
            retry_catalog: parse_or(&lookup, RETRY_CATALOG_VAR, defaults.retry_catalog)?,
        };

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Policy applied to the zone listing.
    pub fn catalog_policy(&self) -> RetryPolicy {
        if self.retry_catalog {
            self.retry.clone()
        } else {
            RetryPolicy::no_retry(self.retry.attempt_timeout)
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidConfig(name.to_string(), raw)),
    }
}

fn parse_multiplier(
    lookup: &impl Fn(&str) -> Option<String>,
    default: f64,
) -> Result<f64, AppError> {
    let multiplier: f64 = parse_or(lookup, BACKOFF_MULTIPLIER_VAR, default)?;
    if multiplier.is_finite() && multiplier >= 1.0 {
        Ok(multiplier)
    } else {
        Err(AppError::InvalidConfig(
            BACKOFF_MULTIPLIER_VAR.to_string(),
            multiplier.to_string(),
        ))
    }
}
