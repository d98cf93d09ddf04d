//! Conversions between datetimes and the strings the API understands.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Format a datetime the way the API expects in queries, e.g.
/// `2019-03-06T19:06:35Z`. The datetime is converted to UTC first.
pub fn format_api_datetime(datetime: OffsetDateTime) -> String {
    let utc = datetime.to_offset(UtcOffset::UTC);
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    // formatting a UTC datetime with a four-digit year cannot fail
    utc.format(format).unwrap_or_else(|_| utc.to_string())
}

/// Parse a run's `runtime`. Runtimes without an offset are taken to be UTC.
pub fn parse_runtime(runtime: &str) -> Option<OffsetDateTime> {
    if let Ok(datetime) = OffsetDateTime::parse(runtime, &Rfc3339) {
        return Some(datetime);
    }
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(runtime, naive)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Seconds since the epoch of a run's `runtime`.
pub fn runtime_to_unixtime(runtime: &str) -> Option<i64> {
    parse_runtime(runtime).map(OffsetDateTime::unix_timestamp)
}
