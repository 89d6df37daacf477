use std::future::Future;

use tracing::{debug, info, warn};

use crate::catalog::ZoneCatalog;
use crate::error::ResolutionError;
use crate::query::{LocationQuery, ZoneIdentifier};
use crate::retry::Outcome;

/// Where a resolved zone came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Country and city already formed a full identifier; the catalog was not consulted
    Direct(ZoneIdentifier),
    /// The only catalog entry under the requested area
    Matched(ZoneIdentifier),
}

impl Resolved {
    pub fn zone(&self) -> &ZoneIdentifier {
        match self {
            Resolved::Direct(zone) | Resolved::Matched(zone) => zone,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Resolved::Direct(_))
    }
}

/// Turns a query into a single zone identifier.
///
/// A query naming both country and city is taken as the identifier itself
/// and `lookup` is never called. A country-only query fetches the catalog
/// through `lookup` and must match exactly one entry.
pub async fn resolve<F, Fut>(query: &LocationQuery, lookup: F) -> Outcome<Resolved>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Outcome<ZoneCatalog>>,
{
    if query.country.trim().is_empty() {
        return Outcome {
            result: Err(ResolutionError::InvalidInput("country is required".into())),
            attempts: 0,
        };
    }

    let key = query.key();
    if !key.ends_with('/') {
        debug!("Looking up the time for full zone identifier {}", key);
        return Outcome {
            result: Ok(Resolved::Direct(ZoneIdentifier::from(key))),
            attempts: 0,
        };
    }

    debug!("Searching time zones under {}", key);
    lookup().await.map(|catalog| pick(&key, &catalog).map(Resolved::Matched))
}

/// Selects the single catalog entry under `prefix`.
pub fn pick(prefix: &str, catalog: &ZoneCatalog) -> Result<ZoneIdentifier, ResolutionError> {
    let mut candidates = catalog.starting_with(prefix);
    match candidates.len() {
        0 => {
            warn!("No time zones found for {}", prefix);
            Err(ResolutionError::NoMatch(format!(
                "no time zones found for the specified country: {}",
                prefix.trim_end_matches('/')
            )))
        }
        1 => {
            let zone = candidates.remove(0);
            info!("Using the only time zone found: {}", zone);
            Ok(zone)
        }
        n => {
            warn!("{} time zones found for {}: {:?}", n, prefix, candidates);
            Err(ResolutionError::Ambiguous(candidates))
        }
    }
}
