use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::ResolutionError;
use crate::query::ZoneIdentifier;
use crate::retry::{self, Outcome, RetryPolicy};
use crate::source::TimeZoneSource;

/// The zone identifiers offered by the data source, in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZoneCatalog {
    zones: Vec<ZoneIdentifier>,
}

impl ZoneCatalog {
    pub fn new(zones: Vec<ZoneIdentifier>) -> Self {
        Self { zones }
    }

    /// Parses the listing endpoint body, which must be a JSON array of strings.
    pub fn parse(body: &str) -> Result<Self, ResolutionError> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            error!("Failed to process the time-zone list: {}: {}", e, body);
            ResolutionError::UpstreamMalformed("error processing the time-zone list".into())
        })?;

        let Value::Array(items) = value else {
            error!("Time-zone list is not a JSON array: {}", body);
            return Err(ResolutionError::UpstreamMalformed(
                "unexpected response format while listing time zones".into(),
            ));
        };

        items
            .into_iter()
            .map(|item| match item {
                Value::String(zone) => Ok(ZoneIdentifier::from(zone)),
                other => {
                    error!("Unexpected entry in time-zone list: {}", other);
                    Err(ResolutionError::UpstreamMalformed(
                        "unexpected response format while listing time zones".into(),
                    ))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn zones(&self) -> &[ZoneIdentifier] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Entries whose identifier starts with `prefix`, keeping catalog order.
    pub fn starting_with(&self, prefix: &str) -> Vec<ZoneIdentifier> {
        self.zones
            .iter()
            .filter(|zone| zone.as_str().starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Fetches a fresh copy of the catalog. Nothing is cached between calls.
pub async fn fetch(source: &dyn TimeZoneSource, policy: &RetryPolicy) -> Outcome<ZoneCatalog> {
    info!("Fetching the list of available time zones");
    retry::run(policy, "listing time zones", || source.catalog())
        .await
        .map(|body| {
            let catalog = ZoneCatalog::parse(&body)?;
            debug!("Time-zone list holds {} entries", catalog.len());
            Ok(catalog)
        })
}
