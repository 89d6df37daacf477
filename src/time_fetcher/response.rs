/// Per-zone payload of the time server.
/// Only the fields the service relies on are kept; everything else is ignored.
#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawTimeRecord {
    /// Current local time as an ISO-8601 offset timestamp
    /// (e.g. "2024-03-10T08:15:42.123456-05:00")
    pub datetime: String,
    /// Zone identifier the time belongs to (e.g. "America/Bogota")
    pub timezone: String,
}
