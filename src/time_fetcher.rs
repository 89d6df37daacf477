// Module containing the per-zone payload of the time server
mod response;

pub use response::RawTimeRecord;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::ResolutionError;
use crate::query::ZoneIdentifier;
use crate::retry::{self, Outcome, RetryPolicy};
use crate::source::TimeZoneSource;

/// Fetches the current time for a specific zone.
///
/// # Arguments
/// * `source` - The time-zone data source to query
/// * `zone` - Zone identifier in `Area/Location` form (e.g. "America/Bogota")
/// * `policy` - Attempt budget, backoff and per-attempt deadline
///
/// # Returns
/// * `RawTimeRecord` holding the upstream `datetime` and `timezone` fields,
///   together with the number of attempts made
/// * `UpstreamMalformed` if the body is not JSON or lacks either field
pub async fn fetch_time(
    source: &dyn TimeZoneSource,
    zone: &ZoneIdentifier,
    policy: &RetryPolicy,
) -> Outcome<RawTimeRecord> {
    info!("Fetching time data for zone: {}", zone);

    let outcome = retry::run(policy, &format!("fetching the time for {zone}"), || {
        source.zone_time(zone)
    })
    .await;

    outcome.map(|body| {
        debug!("Raw response for {}: {}", zone, body);
        parse_record(&body)
    })
}

/// Parses a per-zone body into a `RawTimeRecord`.
pub fn parse_record(body: &str) -> Result<RawTimeRecord, ResolutionError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        error!("Time server response is not valid JSON ({}): {}", e, body);
        ResolutionError::UpstreamMalformed("the time server response is not valid JSON".into())
    })?;

    let record = RawTimeRecord::deserialize(&value).map_err(|e| {
        error!("Missing fields in time server response, expected 'datetime' and 'timezone' ({}): {}", e, value);
        ResolutionError::UpstreamMalformed(
            "the time server response does not contain the expected data".into(),
        )
    })?;

    if record.datetime.trim().is_empty() || record.timezone.trim().is_empty() {
        error!("Empty 'datetime' or 'timezone' in time server response: {}", value);
        return Err(ResolutionError::UpstreamMalformed(
            "the date and time data received are invalid".into(),
        ));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::error::FetchError;
    use crate::source::scripted::ScriptedSource;

    const BOGOTA: &str = r#"{
        "abbreviation": "-05",
        "datetime": "2024-03-10T08:15:42.123456-05:00",
        "timezone": "America/Bogota",
        "utc_offset": "-05:00"
    }"#;

    fn reset() -> FetchError {
        FetchError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "Connection reset by peer"))
    }

    #[test]
    fn extra_fields_are_ignored() {
        let record = parse_record(BOGOTA).unwrap();
        assert_eq!(record.timezone, "America/Bogota");
        assert_eq!(record.datetime, "2024-03-10T08:15:42.123456-05:00");
    }

    #[test]
    fn missing_datetime_is_malformed() {
        let err = parse_record(r#"{"timezone":"America/Bogota"}"#).unwrap_err();
        assert!(matches!(err, ResolutionError::UpstreamMalformed(_)));
    }

    #[test]
    fn non_string_field_is_malformed() {
        let err = parse_record(r#"{"datetime":12,"timezone":"America/Bogota"}"#).unwrap_err();
        assert!(matches!(err, ResolutionError::UpstreamMalformed(_)));
    }

    #[test]
    fn empty_timezone_is_malformed() {
        let err = parse_record(r#"{"datetime":"2024-03-10T08:15:42-05:00","timezone":""}"#).unwrap_err();
        assert!(matches!(err, ResolutionError::UpstreamMalformed(_)));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_record("Bad Gateway").unwrap_err();
        assert_eq!(
            err,
            ResolutionError::UpstreamMalformed("the time server response is not valid JSON".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn three_resets_then_success() {
        let source = ScriptedSource::new()
            .zone_reply(Err(reset()))
            .zone_reply(Err(reset()))
            .zone_reply(Err(reset()))
            .zone_reply(Ok(BOGOTA.to_string()));
        let zone = ZoneIdentifier::from("America/Bogota");

        let outcome = fetch_time(&source, &zone, &RetryPolicy::default()).await;

        assert_eq!(outcome.result.unwrap().timezone, "America/Bogota");
        assert_eq!(outcome.attempts, 4);
        assert_eq!(source.zone_calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn four_resets_exhaust_retries() {
        let source = ScriptedSource::new()
            .zone_reply(Err(reset()))
            .zone_reply(Err(reset()))
            .zone_reply(Err(reset()))
            .zone_reply(Err(reset()))
            .zone_reply(Ok(BOGOTA.to_string()));
        let zone = ZoneIdentifier::from("America/Bogota");

        let outcome = fetch_time(&source, &zone, &RetryPolicy::default()).await;

        match outcome.result {
            Err(ResolutionError::UpstreamUnavailable(message)) => {
                assert!(message.contains("retries exhausted"), "{message}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(outcome.attempts, 4);
        assert_eq!(source.zone_calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_is_retried() {
        let source = ScriptedSource::new()
            .zone_reply(Err(FetchError::Status {
                code: 502,
                reason: "Bad Gateway".into(),
                body: String::new(),
            }))
            .zone_reply(Ok(BOGOTA.to_string()));
        let zone = ZoneIdentifier::from("America/Bogota");

        let outcome = fetch_time(&source, &zone, &RetryPolicy::default()).await;

        assert!(outcome.result.is_ok());
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn client_error_is_surfaced_with_status() {
        let source = ScriptedSource::new().zone_reply(Err(FetchError::Status {
            code: 404,
            reason: "Not Found".into(),
            body: r#"{"error":"unknown location"}"#.into(),
        }));
        let zone = ZoneIdentifier::from("America/Gotham");

        let outcome = fetch_time(&source, &zone, &RetryPolicy::default()).await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            outcome.result,
            Err(ResolutionError::UpstreamUnavailable(
                "error querying the time API, code 404, message Not Found".into()
            ))
        );
    }

    #[tokio::test]
    async fn malformed_body_is_not_retried() {
        let source = ScriptedSource::new().zone_reply(Ok(r#"{"timezone":"America/Bogota"}"#.into()));
        let zone = ZoneIdentifier::from("America/Bogota");

        let outcome = fetch_time(&source, &zone, &RetryPolicy::default()).await;

        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.result, Err(ResolutionError::UpstreamMalformed(_))));
    }
}
