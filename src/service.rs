use std::sync::Arc;

use tracing::{error, info, warn};

use crate::catalog;
use crate::config::Config;
use crate::error::{AppError, ResolutionError};
use crate::normalizer::{self, TimeAnswer};
use crate::query::LocationQuery;
use crate::resolver;
use crate::retry::{Outcome, RetryPolicy};
use crate::source::{TimeZoneSource, WorldTimeApi};
use crate::time_fetcher;

/// Resolves locations to their current time against a [`TimeZoneSource`].
///
/// Holds no per-request state; concurrent calls share only the source.
#[derive(Clone)]
pub struct TimeService {
    source: Arc<dyn TimeZoneSource>,
    zone_policy: RetryPolicy,
    catalog_policy: RetryPolicy,
}

impl TimeService {
    pub fn new(
        source: Arc<dyn TimeZoneSource>,
        zone_policy: RetryPolicy,
        catalog_policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            zone_policy,
            catalog_policy,
        }
    }

    /// Service backed by the WorldTimeAPI client described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api = WorldTimeApi::new(&config.base_url)?;
        Ok(Self::new(Arc::new(api), config.retry.clone(), config.catalog_policy()))
    }

    /// Current time for `query`, with the number of upstream attempts spent
    /// on the catalog and the zone together.
    pub async fn current_time(&self, query: &LocationQuery) -> Outcome<TimeAnswer> {
        info!("Requesting time for {}/{}", query.country.trim(), query.city.trim());

        let resolved = resolver::resolve(query, || {
            catalog::fetch(self.source.as_ref(), &self.catalog_policy)
        })
        .await;
        let catalog_attempts = resolved.attempts;

        let resolved = match resolved.result {
            Ok(resolved) => resolved,
            Err(err) => {
                error!("Could not resolve {}/{}: {}", query.country, query.city, err);
                return Outcome {
                    result: Err(err),
                    attempts: catalog_attempts,
                };
            }
        };

        let mut outcome = time_fetcher::fetch_time(self.source.as_ref(), resolved.zone(), &self.zone_policy)
            .await
            .map(normalizer::normalize);

        if resolved.is_direct() {
            outcome = outcome.map_err(|err| match err {
                ResolutionError::UpstreamUnavailable(message) => {
                    warn!("Could not get the time for {}: {}", resolved.zone(), message);
                    ResolutionError::UpstreamUnavailable(format!(
                        "could not retrieve time for the specified zone: {message}"
                    ))
                }
                other => other,
            });
        }

        if let Err(err) = &outcome.result {
            error!("Error getting the time for {}/{}: {}", query.country, query.city, err);
        }

        Outcome {
            result: outcome.result,
            attempts: catalog_attempts + outcome.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::error::FetchError;
    use crate::query::ZoneIdentifier;
    use crate::source::scripted::ScriptedSource;

    const CATALOG: &str = r#"["Africa/Casablanca","America/Bogota","America/New_York","Antarctica/Troll","Europe/Madrid","Europe/Paris"]"#;

    fn payload(datetime: &str, timezone: &str) -> String {
        serde_json::json!({ "datetime": datetime, "timezone": timezone, "dst": false }).to_string()
    }

    fn service(source: Arc<ScriptedSource>) -> TimeService {
        TimeService::new(source, RetryPolicy::default(), RetryPolicy::default())
    }

    #[tokio::test]
    async fn full_query_never_lists_zones() {
        let source = Arc::new(
            ScriptedSource::new().zone_reply(Ok(payload("2024-03-10T08:15:42-04:00", "America/New_York"))),
        );

        let outcome = service(source.clone())
            .current_time(&LocationQuery::new("America", "New York"))
            .await;

        let answer = outcome.result.unwrap();
        assert_eq!(answer.city, "New York");
        assert_eq!(answer.country, "America");
        assert!(answer.is_daytime);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(source.catalog_calls(), 0);
        assert_eq!(source.zone_calls(), vec![ZoneIdentifier::from("America/New_York")]);
    }

    #[tokio::test]
    async fn country_only_query_uses_the_single_match() {
        let source = Arc::new(
            ScriptedSource::new()
                .catalog_reply(Ok(CATALOG.to_string()))
                .zone_reply(Ok(payload("2024-03-10T20:00:00+00:00", "Antarctica/Troll"))),
        );

        let outcome = service(source.clone())
            .current_time(&LocationQuery::new("Antarctica", ""))
            .await;

        let answer = outcome.result.unwrap();
        assert_eq!(answer.timezone, ZoneIdentifier::from("Antarctica/Troll"));
        assert!(!answer.is_daytime);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(source.catalog_calls(), 1);
    }

    #[tokio::test]
    async fn ambiguous_country_lists_candidates_without_fetching_time() {
        let source = Arc::new(
            ScriptedSource::new()
                .catalog_reply(Ok(CATALOG.to_string()))
                .catalog_reply(Ok(CATALOG.to_string())),
        );
        let service = service(source.clone());
        let query = LocationQuery::new("Europe", "");

        let first = service.current_time(&query).await.result;
        let second = service.current_time(&query).await.result;

        assert_eq!(
            first,
            Err(ResolutionError::Ambiguous(vec![
                ZoneIdentifier::from("Europe/Madrid"),
                ZoneIdentifier::from("Europe/Paris"),
            ]))
        );
        assert_eq!(first, second);
        assert!(source.zone_calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_country_is_no_match() {
        let source = Arc::new(ScriptedSource::new().catalog_reply(Ok(CATALOG.to_string())));

        let outcome = service(source.clone())
            .current_time(&LocationQuery::new("Atlantis", ""))
            .await;

        assert!(matches!(outcome.result, Err(ResolutionError::NoMatch(_))));
        assert!(source.zone_calls().is_empty());
    }

    #[tokio::test]
    async fn blank_country_touches_nothing() {
        let source = Arc::new(ScriptedSource::new());

        let outcome = service(source.clone())
            .current_time(&LocationQuery::new("  ", "Bogota"))
            .await;

        assert!(matches!(outcome.result, Err(ResolutionError::InvalidInput(_))));
        assert_eq!(outcome.attempts, 0);
        assert_eq!(source.catalog_calls(), 0);
        assert!(source.zone_calls().is_empty());
    }

    #[tokio::test]
    async fn fast_path_failure_names_the_zone_lookup() {
        let source = Arc::new(ScriptedSource::new().zone_reply(Err(FetchError::Status {
            code: 404,
            reason: "Not Found".into(),
            body: r#"{"error":"unknown location"}"#.into(),
        })));

        let outcome = service(source)
            .current_time(&LocationQuery::new("America", "Gotham"))
            .await;

        match outcome.result {
            Err(ResolutionError::UpstreamUnavailable(message)) => {
                assert!(message.starts_with("could not retrieve time for the specified zone"), "{message}");
                assert!(message.contains("code 404"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_stays_malformed_on_fast_path() {
        let source = Arc::new(ScriptedSource::new().zone_reply(Ok(r#"{"timezone":"America/Bogota"}"#.into())));

        let outcome = service(source)
            .current_time(&LocationQuery::new("America", "Bogota"))
            .await;

        assert!(matches!(outcome.result, Err(ResolutionError::UpstreamMalformed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_add_up_across_catalog_and_zone() {
        let reset = || FetchError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "Connection reset by peer"));
        let source = Arc::new(
            ScriptedSource::new()
                .catalog_reply(Err(reset()))
                .catalog_reply(Ok(CATALOG.to_string()))
                .zone_reply(Err(reset()))
                .zone_reply(Ok(payload("2024-03-10T12:00:00+01:00", "Africa/Casablanca"))),
        );

        let outcome = service(source)
            .current_time(&LocationQuery::new("Africa", ""))
            .await;

        assert_eq!(outcome.result.unwrap().city, "Casablanca");
        assert_eq!(outcome.attempts, 4);
    }
}
