//! Shared parsing utilities for feed records.
//!
//! Timestamp, coordinate, and ZIP code coercion used by every fetch
//! strategy. Upstream feeds disagree on formats (ISO 8601 with or without
//! offsets, US-style 12-hour CSV timestamps, numeric strings for
//! coordinates), so every helper here is lenient and returns `None` rather
//! than failing.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{5})(?:[-.][0-9]*)?$").expect("valid regex"));

/// Naive datetime layouts tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %I:%M:%S %p",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parses a timestamp in any of the layouts seen across feeds.
///
/// Values without an offset are taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

/// Reads a float from a JSON value that may be a number or a numeric
/// string.
#[must_use]
pub fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Validates a coordinate pair. Returns `None` if either value is zero or
/// out of range.
#[must_use]
pub fn valid_coordinates(lat: f64, lng: f64) -> Option<(f64, f64)> {
    if lat == 0.0 || lng == 0.0 {
        return None;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some((lat, lng))
}

/// Reduces a raw ZIP value (`"10001"`, `"10001-1234"`, `"10001.0"`) to its
/// five-digit form.
#[must_use]
pub fn normalize_zip(raw: &str) -> Option<String> {
    ZIP_RE
        .captures(raw.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_socrata_timestamp_with_fractional() {
        let dt = parse_timestamp("2024-01-15T14:30:00.000").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse_timestamp("2024-01-15T06:30:00-08:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_us_csv_timestamp() {
        let dt = parse_timestamp("01/15/2024 02:30:00 PM").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_sfpd_timestamp() {
        let dt = parse_timestamp("2024/01/15 02:30:00 PM").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_date_only() {
        let dt = parse_timestamp("01/15/2024").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 00:00:00 UTC");
    }

    #[test]
    fn rejects_invalid_timestamp() {
        assert!(parse_timestamp("not-a-date").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn coerces_numeric_strings_and_numbers() {
        let from_str = coerce_f64(&serde_json::json!(" 40.7128 ")).unwrap();
        assert!((from_str - 40.7128).abs() < f64::EPSILON);
        let from_num = coerce_f64(&serde_json::json!(-73.935)).unwrap();
        assert!((from_num - -73.935).abs() < f64::EPSILON);
        assert!(coerce_f64(&serde_json::json!("N/A")).is_none());
        assert!(coerce_f64(&serde_json::json!(null)).is_none());
        assert!(coerce_f64(&serde_json::json!("NaN")).is_none());
    }

    #[test]
    fn rejects_zero_and_out_of_range_coordinates() {
        assert!(valid_coordinates(0.0, -73.9).is_none());
        assert!(valid_coordinates(40.7, 0.0).is_none());
        assert!(valid_coordinates(91.0, -73.9).is_none());
        assert!(valid_coordinates(40.7, -181.0).is_none());
        assert_eq!(valid_coordinates(40.7, -73.9), Some((40.7, -73.9)));
    }

    #[test]
    fn normalizes_zip_variants() {
        assert_eq!(normalize_zip("10001").as_deref(), Some("10001"));
        assert_eq!(normalize_zip("10001-1234").as_deref(), Some("10001"));
        assert_eq!(normalize_zip("10001.0").as_deref(), Some("10001"));
        assert!(normalize_zip("N/A").is_none());
        assert!(normalize_zip("1000").is_none());
    }
}
