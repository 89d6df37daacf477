use chrono::{DateTime, FixedOffset, Timelike};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::ResolutionError;
use crate::query::ZoneIdentifier;
use crate::time_fetcher::RawTimeRecord;

/// Display pattern, `yyyy-MM-dd HH:mm:ss`. Purely numeric, so the
/// es-ES display locale has no visible effect on it.
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ISO-8601 offset timestamps without seconds, e.g. "2024-03-10T08:15-05:00"
const NO_SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M%:z";

// length of "yyyy-MM-dd"
const DATE_LEN: usize = 10;

const DAY_STARTS: u32 = 6;
const NIGHT_STARTS: u32 = 18;

/// The answer returned for a resolved location.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeAnswer {
    /// Timestamp exactly as reported upstream
    pub datetime: String,
    pub timezone: ZoneIdentifier,
    /// Location segment of the zone, underscores shown as spaces
    pub city: String,
    /// Area segment of the zone
    pub country: String,
    pub formatted_datetime: String,
    pub is_daytime: bool,
}

/// Builds a [`TimeAnswer`] from the upstream record.
///
/// Country and city come from the zone identifier, not from the query that
/// led to it.
pub fn normalize(record: RawTimeRecord) -> Result<TimeAnswer, ResolutionError> {
    let (country, city) = split_zone(&record.timezone);
    let local = parse_offset_datetime(&record.datetime)?;

    let answer = TimeAnswer {
        formatted_datetime: local.format(DISPLAY_FORMAT).to_string(),
        is_daytime: is_daytime(local.hour()),
        country,
        city,
        datetime: record.datetime,
        timezone: ZoneIdentifier::from(record.timezone),
    };
    debug!("Normalized answer: {:?}", answer);
    Ok(answer)
}

/// `America/New_York` -> (`America`, `New York`); `UTC` -> (`UTC`, ``).
fn split_zone(timezone: &str) -> (String, String) {
    let mut parts = timezone.split('/');
    let country = parts.next().unwrap_or_default().to_string();
    let city = parts.next().map(|c| c.replace('_', " ")).unwrap_or_default();
    (country, city)
}

fn parse_offset_datetime(datetime: &str) -> Result<DateTime<FixedOffset>, ResolutionError> {
    let malformed = || {
        ResolutionError::UpstreamMalformed(
            "invalid date/time format received from the time server".into(),
        )
    };

    // RFC 3339 also admits ' ' and 't' here; ISO-8601 offset timestamps only 'T'
    if datetime.as_bytes().get(DATE_LEN) != Some(&b'T') {
        error!("Could not parse date/time '{}': expected 'T' after the date", datetime);
        return Err(malformed());
    }

    DateTime::parse_from_rfc3339(datetime)
        .or_else(|_| DateTime::parse_from_str(datetime, NO_SECONDS_FORMAT))
        .map_err(|e| {
            error!("Could not parse date/time '{}': {}", datetime, e);
            malformed()
        })
}

/// Daytime is 06:00 up to, but excluding, 18:00 on the zone's local clock.
pub fn is_daytime(hour: u32) -> bool {
    (DAY_STARTS..NIGHT_STARTS).contains(&hour)
}
