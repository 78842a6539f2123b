//! Wall-clock timestamps.
//!
//! Extracted and provider times are kept as their literal digits: the parsed
//! calendar fields are labelled UTC and no zone conversion ever happens.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parses the leading `YYYY-MM-DDTHH:MM` of `raw`, ignoring seconds and any zone.
///
/// A space is accepted in place of the `T`. Returns `None` for absent or
/// unparsable input.
#[must_use]
pub fn parse_local_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let head = raw.get(..16)?;
    let bytes = head.as_bytes();
    if bytes[10] != b'T' && bytes[10] != b' ' {
        return None;
    }

    let date = NaiveDate::parse_from_str(&head[..10], "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&head[11..], "%H:%M").ok()?;

    Some(NaiveDateTime::new(date, time).and_utc())
}

/// Parses a bare `YYYY-MM-DD` or the date part of a longer timestamp.
#[must_use]
pub fn parse_local_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[must_use]
pub fn parse_optional(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_local_time)
}

#[must_use]
pub fn format_local_time(time: &DateTime<Utc>) -> String {
    time.format(FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_digits_are_preserved() {
        let parsed = parse_local_time("2024-06-14T23:45").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.month(), 6);
        assert_eq!(parsed.day(), 14);
        assert_eq!(parsed.hour(), 23);
        assert_eq!(parsed.minute(), 45);
    }

    #[test]
    fn test_trailing_seconds_and_zone_ignored() {
        let expected = parse_local_time("2024-03-01T08:05").unwrap();
        assert_eq!(parse_local_time("2024-03-01T08:05:59").unwrap(), expected);
        assert_eq!(parse_local_time("2024-03-01T08:05:00+09:00").unwrap(), expected);
        assert_eq!(parse_local_time("2024-03-01T08:05:00Z").unwrap(), expected);
        assert_eq!(parse_local_time("2024-03-01 08:05-04:00").unwrap(), expected);
    }

    #[test]
    fn test_format_round_trip() {
        for raw in ["2024-01-01T00:00", "1999-12-31T23:59", "2028-02-29T12:30"] {
            let parsed = parse_local_time(raw).unwrap();
            assert_eq!(format_local_time(&parsed), raw);
        }
    }

    #[test]
    fn test_unparsable_is_none() {
        assert!(parse_local_time("").is_none());
        assert!(parse_local_time("2024-06-14").is_none());
        assert!(parse_local_time("tomorrow at noon").is_none());
        assert!(parse_local_time("2024-13-01T10:00").is_none());
        assert!(parse_local_time("2024-06-14X10:00").is_none());
        assert!(parse_local_time("2024-06-14T25:00").is_none());
        assert!(parse_optional(None).is_none());
    }

    #[test]
    fn test_parse_local_date() {
        let date = parse_local_date("2024-06-14T10:00").unwrap();
        assert_eq!(date.to_string(), "2024-06-14");
        assert!(parse_local_date("14/06/2024").is_none());
    }
}
