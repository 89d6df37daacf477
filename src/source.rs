// reqwest-backed implementation of the data source
mod world_time_api;

pub use world_time_api::{DEFAULT_BASE_URL, WorldTimeApi};

use crate::error::FetchError;
use crate::query::ZoneIdentifier;

/// A time-zone web service exposing a zone listing and a per-zone clock.
///
/// Implementations return the raw response body; parsing and shape checks
/// happen in the catalog and time fetchers.
#[async_trait::async_trait]
pub trait TimeZoneSource: Send + Sync {
    /// Body of the root listing endpoint (a JSON array of zone identifiers).
    async fn catalog(&self) -> Result<String, FetchError>;

    /// Body of the per-zone endpoint for `zone`.
    async fn zone_time(&self, zone: &ZoneIdentifier) -> Result<String, FetchError>;
}
