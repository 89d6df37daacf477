//! Resolves a loosely specified `(country, city)` pair into the current time
//! of a single zone of a WorldTimeAPI-compatible web service.
//!
//! The pipeline for one request is strictly sequential:
//! - [`resolver`] turns the query into one zone, consulting the [`catalog`]
//!   only when the city is left out
//! - [`time_fetcher`] fetches that zone's clock under a [`RetryPolicy`]
//! - [`normalizer`] shapes the upstream record into a [`TimeAnswer`]
//! - [`classifier`] maps every failure onto [`ResolutionError`]
//!
//! [`TimeService`] wires these together over any [`TimeZoneSource`].

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod query;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod source;
pub mod time_fetcher;

pub use catalog::ZoneCatalog;
pub use config::Config;
pub use error::{AppError, FetchError, ResolutionError};
pub use normalizer::TimeAnswer;
pub use query::{LocationQuery, ZoneIdentifier};
pub use retry::{Outcome, RetryPolicy};
pub use service::TimeService;
pub use source::{TimeZoneSource, WorldTimeApi};
pub use time_fetcher::RawTimeRecord;
