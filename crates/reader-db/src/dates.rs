use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for `date_updated`, e.g. `2026-10-16T09:30:00+0000`.
const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

pub fn iso8601_from(date: DateTime<Utc>) -> String {
    date.format(ISO8601_FORMAT).to_string()
}

/// The "never updated" marker written by `clear_updated`.
pub fn epoch_iso8601() -> String {
    iso8601_from(DateTime::<Utc>::UNIX_EPOCH)
}

/// Parses the storage format, RFC 3339, or a bare UTC timestamp.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_str(value, ISO8601_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Whole minutes from `from` to `to`, floored.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(60)
}
