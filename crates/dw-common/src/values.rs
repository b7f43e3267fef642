//! Polars `AnyValue` utility functions.
//!
//! Raw extracts arrive with whatever dtypes the CSV reader inferred, so the
//! same business key can be `Int64` in one table and `String` in another.
//! These helpers give every builder one consistent way to read a cell.

use polars::prelude::*;

/// Converts a Polars `AnyValue` to a `String` representation.
///
/// Returns an empty string for `Null` and formats integral floats without a
/// fractional part.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use dw_common::any_to_string;
///
/// assert_eq!(any_to_string(AnyValue::Null), "");
/// assert_eq!(any_to_string(AnyValue::Int32(42)), "42");
/// assert_eq!(any_to_string(AnyValue::Float64(30.0)), "30");
/// assert_eq!(any_to_string(AnyValue::String("PAID")), "PAID");
/// ```
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int8(v) => v.to_string(),
        AnyValue::Int16(v) => v.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt8(v) => v.to_string(),
        AnyValue::UInt16(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Renders a cell as a join key.
///
/// Numeric cells render like [`any_to_string`], so `7` and `7.0` produce the
/// key `"7"`. Text is trimmed and otherwise kept verbatim: `"007"` and `"1e3"`
/// are their own keys. The one exception is text shaped like an integral
/// decimal (`"12.0"`), which keys as `"12"` so it meets the same id read as a
/// number. Null and blank cells have no key and never match anything.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use dw_common::any_to_key;
///
/// assert_eq!(any_to_key(AnyValue::Int64(7)), Some("7".to_string()));
/// assert_eq!(any_to_key(AnyValue::Float64(7.0)), Some("7".to_string()));
/// assert_eq!(any_to_key(AnyValue::String(" 7 ")), Some("7".to_string()));
/// assert_eq!(any_to_key(AnyValue::String("007")), Some("007".to_string()));
/// assert_eq!(any_to_key(AnyValue::Null), None);
/// ```
pub fn any_to_key(value: AnyValue<'_>) -> Option<String> {
    let text = match value {
        AnyValue::String(s) => s,
        AnyValue::StringOwned(ref s) => s.as_str(),
        other => {
            let rendered = any_to_string(other);
            let trimmed = rendered.trim();
            return (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(integral_decimal_prefix(trimmed).unwrap_or(trimmed).to_string())
}

/// Integer part of text shaped exactly like `-?(0|[1-9][0-9]*)\.0+`.
fn integral_decimal_prefix(text: &str) -> Option<&str> {
    let (integer, fraction) = text.split_once('.')?;
    if fraction.is_empty() || !fraction.bytes().all(|b| b == b'0') {
        return None;
    }
    let digits = integer.strip_prefix('-').unwrap_or(integer);
    let canonical = digits == "0"
        || (!digits.is_empty()
            && !digits.starts_with('0')
            && digits.bytes().all(|b| b.is_ascii_digit()));
    if !canonical {
        return None;
    }
    if integer == "-0" { Some("0") } else { Some(integer) }
}

/// Formats a floating-point number without trailing zeros.
///
/// # Examples
///
/// ```
/// use dw_common::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(30.0), "30");
/// assert_eq!(format_numeric(1.5), "1.5");
/// assert_eq!(format_numeric(0.0), "0");
/// ```
pub fn format_numeric(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        // Exact: integral and well inside the i64 range.
        return format!("{}", v as i64);
    }
    format!("{v}")
}

/// Converts an `AnyValue` to `f64`, returning `None` for non-numeric or null values.
///
/// Handles integer types, floating-point types, and string parsing.
pub fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(f64::from(v)),
        AnyValue::Int16(v) => Some(f64::from(v)),
        AnyValue::Int32(v) => Some(f64::from(v)),
        AnyValue::Int64(v) => Some(v as f64),
        AnyValue::UInt8(v) => Some(f64::from(v)),
        AnyValue::UInt16(v) => Some(f64::from(v)),
        AnyValue::UInt32(v) => Some(f64::from(v)),
        AnyValue::UInt64(v) => Some(v as f64),
        AnyValue::Float32(v) => Some(f64::from(v)),
        AnyValue::Float64(v) if v.is_nan() => None,
        AnyValue::Float64(v) => Some(v),
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(&s),
        _ => None,
    }
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_to_string_null() {
        assert_eq!(any_to_string(AnyValue::Null), "");
    }

    #[test]
    fn test_any_to_string_integers() {
        assert_eq!(any_to_string(AnyValue::Int32(42)), "42");
        assert_eq!(any_to_string(AnyValue::Int64(-100)), "-100");
        assert_eq!(any_to_string(AnyValue::UInt32(0)), "0");
    }

    #[test]
    fn test_any_to_string_floats() {
        assert_eq!(any_to_string(AnyValue::Float64(1.5)), "1.5");
        assert_eq!(any_to_string(AnyValue::Float64(10.0)), "10");
        assert_eq!(any_to_string(AnyValue::Float64(100.25)), "100.25");
    }

    #[test]
    fn test_any_to_string_boolean() {
        assert_eq!(any_to_string(AnyValue::Boolean(true)), "true");
        assert_eq!(any_to_string(AnyValue::Boolean(false)), "false");
    }

    #[test]
    fn test_any_to_key_normalizes_numeric_text() {
        assert_eq!(any_to_key(AnyValue::String("12.0")), Some("12".to_string()));
        assert_eq!(any_to_key(AnyValue::Int32(12)), Some("12".to_string()));
        assert_eq!(any_to_key(AnyValue::String("C-12")), Some("C-12".to_string()));
        assert_eq!(any_to_key(AnyValue::String("   ")), None);
    }

    #[test]
    fn test_any_to_key_keeps_text_keys_verbatim() {
        assert_eq!(any_to_key(AnyValue::String("007")), Some("007".to_string()));
        assert_eq!(any_to_key(AnyValue::String("7")), Some("7".to_string()));
        assert_eq!(any_to_key(AnyValue::String("1e3")), Some("1e3".to_string()));
        assert_eq!(any_to_key(AnyValue::String("1000")), Some("1000".to_string()));
        assert_eq!(any_to_key(AnyValue::String("07.0")), Some("07.0".to_string()));
        assert_eq!(any_to_key(AnyValue::String("12.50")), Some("12.50".to_string()));
        assert_eq!(any_to_key(AnyValue::String("-3.00")), Some("-3".to_string()));
        assert_eq!(any_to_key(AnyValue::String("0.0")), Some("0".to_string()));
        assert_eq!(any_to_key(AnyValue::String("12.")), Some("12.".to_string()));
    }

    #[test]
    fn test_any_to_key_keeps_fractional_values() {
        assert_eq!(any_to_key(AnyValue::Float64(2.5)), Some("2.5".to_string()));
    }

    #[test]
    fn test_format_numeric() {
        assert_eq!(format_numeric(1.0), "1");
        assert_eq!(format_numeric(20.0), "20");
        assert_eq!(format_numeric(1.5), "1.5");
        assert_eq!(format_numeric(0.0), "0");
        assert_eq!(format_numeric(-3.0), "-3");
    }

    #[test]
    fn test_any_to_f64() {
        assert_eq!(any_to_f64(AnyValue::Null), None);
        assert_eq!(any_to_f64(AnyValue::Int32(42)), Some(42.0));
        assert_eq!(any_to_f64(AnyValue::Float64(3.25)), Some(3.25));
        assert_eq!(any_to_f64(AnyValue::String("2.5")), Some(2.5));
        assert_eq!(any_to_f64(AnyValue::String("n/a")), None);
        assert_eq!(any_to_f64(AnyValue::Float64(f64::NAN)), None);
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_f64("  3.5  "), Some(3.5));
        assert_eq!(parse_f64("inf"), None);
        assert_eq!(parse_f64("invalid"), None);
    }
}
