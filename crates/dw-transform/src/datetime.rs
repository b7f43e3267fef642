//! Lenient date/time parsing for raw extract values.
//!
//! Raw timestamps arrive as ISO dates, ISO date-times (with a `T` or a space,
//! optionally zoned), or already-typed polars temporal values. Anything that
//! does not parse is treated as absent rather than an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::{AnyValue, TimeUnit};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parse a raw text value as a date-time. Dates parse as midnight.
///
/// Zoned values are normalized to UTC.
///
/// # Examples
///
/// ```
/// use dw_transform::datetime::parse_datetime;
///
/// let dt = parse_datetime("2024-01-03T10:15:00Z").unwrap();
/// assert_eq!(dt.to_string(), "2024-01-03 10:15:00");
/// assert!(parse_datetime("not a date").is_none());
/// ```
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(zoned) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(zoned.naive_utc());
    }
    if let Ok(zoned) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(zoned.naive_utc());
    }
    let unzoned = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(unzoned, format).ok())
        .or_else(|| parse_plain_date(unzoned).map(|date| date.and_time(NaiveTime::MIN)))
}

/// Parse a raw text value as a calendar date, discarding any time of day.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    parse_datetime(value).map(|dt| dt.date())
}

fn parse_plain_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Convert a polars cell to a date-time.
pub fn any_to_datetime(value: AnyValue<'_>) -> Option<NaiveDateTime> {
    match value {
        AnyValue::Null => None,
        AnyValue::Date(days) => epoch_date()
            .checked_add_signed(chrono::Duration::days(i64::from(days)))
            .map(|date| date.and_time(NaiveTime::MIN)),
        AnyValue::Datetime(ticks, unit, _) => datetime_from_ticks(ticks, unit),
        AnyValue::DatetimeOwned(ticks, unit, _) => datetime_from_ticks(ticks, unit),
        AnyValue::String(text) => parse_datetime(text),
        AnyValue::StringOwned(text) => parse_datetime(&text),
        _ => None,
    }
}

/// Convert a polars cell to a calendar date.
pub fn any_to_date(value: AnyValue<'_>) -> Option<NaiveDate> {
    any_to_datetime(value).map(|dt| dt.date())
}

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    let days = date.signed_duration_since(epoch_date()).num_days();
    i32::try_from(days).unwrap_or(if days < 0 { i32::MIN } else { i32::MAX })
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn datetime_from_ticks(ticks: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let parsed = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(ticks)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(ticks),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(ticks),
    };
    parsed.map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_shapes() {
        for raw in [
            "2024-01-03",
            "2024-01-03T08:30:00",
            "2024-01-03 08:30:00",
            "2024-01-03 08:30:00.250",
            "2024-01-03T08:30:00Z",
            "2024-01-03T08:30",
            "2024/01/03",
            "03/01/2024",
        ] {
            assert_eq!(parse_date(raw), Some(ymd(2024, 1, 3)), "{raw}");
        }
    }

    #[test]
    fn zoned_values_normalize_to_utc() {
        let dt = parse_datetime("2024-01-03T23:30:00-03:00").unwrap();
        assert_eq!(dt.date(), ymd(2024, 1, 4));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("pending"), None);
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date("2024-01-03garbage"), None);
    }

    #[test]
    fn typed_cells_convert() {
        let days = date_to_epoch_days(ymd(2024, 1, 1));
        assert_eq!(any_to_date(AnyValue::Date(days)), Some(ymd(2024, 1, 1)));
        assert_eq!(
            any_to_date(AnyValue::String("2024-02-29 12:00:00")),
            Some(ymd(2024, 2, 29))
        );
        assert_eq!(any_to_date(AnyValue::Int64(5)), None);
        assert_eq!(any_to_date(AnyValue::Null), None);
    }

    #[test]
    fn epoch_days_round_trip() {
        assert_eq!(date_to_epoch_days(ymd(1970, 1, 1)), 0);
        assert_eq!(date_to_epoch_days(ymd(1970, 1, 2)), 1);
        assert_eq!(date_to_epoch_days(ymd(1969, 12, 31)), -1);
    }
}
