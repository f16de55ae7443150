//! Time parsing and formatting utilities.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Format a timestamp for storage.
#[must_use]
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse a stored timestamp.
///
/// Accepts RFC3339 and the `SQLite` `CURRENT_TIMESTAMP` format
/// (`YYYY-MM-DD HH:MM:SS`, interpreted as UTC). Anything else maps to the
/// Unix epoch.
#[must_use]
pub fn parse_stored_timestamp(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    DateTime::<Utc>::UNIX_EPOCH
}
