//! Instant parsing for CSV cells and command-line arguments
//!
//! Instants are wall-clock `NaiveDateTime`s. Strings carrying a UTC offset keep
//! their local wall-clock time; no timezone conversion is applied.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse timestamp '{0}'")]
pub struct TimestampParseError(pub String);

/// Shortest digit string read as a Unix epoch (1973-03-03 onwards)
const MIN_EPOCH_DIGITS: usize = 9;

/// Naive formats tried in order after the offset-aware ones
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Parse the datetime layouts found in line exports and on the command line.
///
/// Accepted: ISO 8601 / RFC 3339 with or without offset, space or `T`
/// separated, optional fractional seconds, date-only (midnight) and Unix
/// epoch seconds / milliseconds.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TimestampParseError> {
    let s = s.trim().trim_matches('"');

    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("nat") {
        return Err(TimestampParseError(s.to_string()));
    }

    // Unix epoch; compact dates such as `20240301` are too short to qualify.
    // Millisecond epochs are scaled down.
    let is_epoch = s.len() >= MIN_EPOCH_DIGITS && s.bytes().all(|b| b.is_ascii_digit());
    if let Some(epoch) = is_epoch.then(|| s.parse::<i64>().ok()).flatten() {
        let secs = if epoch > 10_000_000_000 { epoch / 1000 } else { epoch };
        return DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| TimestampParseError(s.to_string()));
    }

    // Offset-bearing forms keep their wall-clock time
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.naive_local());
        }
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    Err(TimestampParseError(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_space_separated() {
        assert_eq!(
            parse_timestamp("2024-03-01 10:15:00").unwrap(),
            ymd_hms(2024, 3, 1, 10, 15, 0)
        );
    }

    #[test]
    fn test_parse_iso_t_separated_and_minutes_only() {
        assert_eq!(
            parse_timestamp("2024-03-01T23:59:59").unwrap(),
            ymd_hms(2024, 3, 1, 23, 59, 59)
        );
        assert_eq!(
            parse_timestamp("2024-03-01T08:30").unwrap(),
            ymd_hms(2024, 3, 1, 8, 30, 0)
        );
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let t = parse_timestamp("2024-03-01 10:15:00.250").unwrap();
        assert_eq!(t.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_offset_keeps_wall_clock() {
        assert_eq!(
            parse_timestamp("2024-03-01T10:15:00-05:00").unwrap(),
            ymd_hms(2024, 3, 1, 10, 15, 0)
        );
        assert_eq!(
            parse_timestamp("2024-03-01 10:15:00+02:00").unwrap(),
            ymd_hms(2024, 3, 1, 10, 15, 0)
        );
        assert_eq!(
            parse_timestamp("2024-03-01T10:15:00Z").unwrap(),
            ymd_hms(2024, 3, 1, 10, 15, 0)
        );
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(parse_timestamp("2024-03-01").unwrap(), ymd_hms(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_epoch_seconds_and_millis() {
        assert_eq!(parse_timestamp("1709288100").unwrap(), ymd_hms(2024, 3, 1, 10, 15, 0));
        assert_eq!(
            parse_timestamp("1709288100000").unwrap(),
            ymd_hms(2024, 3, 1, 10, 15, 0)
        );
    }

    #[test]
    fn test_compact_date_is_not_an_epoch() {
        assert!(parse_timestamp("20240301").is_err());
        assert!(parse_timestamp("1234").is_err());
        assert_eq!(parse_timestamp("100000000").unwrap(), ymd_hms(1973, 3, 3, 9, 46, 40));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("NaT").is_err());
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-13-01 00:00:00").is_err());
    }
}
