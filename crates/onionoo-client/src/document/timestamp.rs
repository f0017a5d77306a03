//! UTC timestamp decoding
//!
//! Onionoo writes timestamps as `YYYY-MM-DD hh:mm:ss` in UTC. Dates without a
//! time component and RFC 3339 timestamps are accepted as well.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Timestamp format used by Onionoo
pub const UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[UTC_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Decode a UTC timestamp, returning `None` if no known format matches
pub fn decode_utc(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Encode a timestamp in the Onionoo format
pub fn encode_utc(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(UTC_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_onionoo_format() {
        let ts = decode_utc("2020-05-17 21:00:00").unwrap();
        assert_eq!(ts.year(), 2020);
        assert_eq!(ts.month(), 5);
        assert_eq!(ts.day(), 17);
        assert_eq!(ts.hour(), 21);
    }

    #[test]
    fn test_decode_date_only() {
        let ts = decode_utc("2023-01-01").unwrap();
        assert_eq!(ts.hour(), 0);
        assert_eq!(encode_utc(&ts), "2023-01-01 00:00:00");
    }

    #[test]
    fn test_decode_rfc3339() {
        let ts = decode_utc("2023-01-01T12:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_utc("yesterday").is_none());
        assert!(decode_utc("").is_none());
        assert!(decode_utc("2023-13-01").is_none());
    }
}
