//! Value predicates used by type inference and casting
//!
//! Every predicate works on a single JSON value. Strings are trimmed before
//! they are tested, so `" 42 "` counts as an integer.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-8][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static OBJECT_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").unwrap());

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?\d+$").unwrap());

static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}(:?\d{2})?)?$").unwrap()
});

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Null, or a string with nothing but whitespace
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// RFC-4122 textual UUID
pub fn is_uuid_str(s: &str) -> bool {
    UUID_REGEX.is_match(s.trim())
}

/// 24-character hex string, the shape of a MongoDB ObjectId
pub fn is_object_id_str(s: &str) -> bool {
    OBJECT_ID_REGEX.is_match(s.trim())
}

pub fn is_uuid(value: &Value) -> bool {
    matches!(value, Value::String(s) if is_uuid_str(s))
}

pub fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::String(s) => parse_bool(s).is_some(),
        _ => false,
    }
}

/// Fits a 32-bit signed integer
pub fn is_integer(value: &Value) -> bool {
    as_i64(value).is_some_and(|n| i32::try_from(n).is_ok())
}

/// Fits a 64-bit signed integer
pub fn is_bigint(value: &Value) -> bool {
    as_i64(value).is_some()
}

pub fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().is_some_and(f64::is_finite),
        Value::String(s) => NUMERIC_REGEX.is_match(s.trim()),
        _ => false,
    }
}

pub fn is_date(value: &Value) -> bool {
    matches!(value, Value::String(s) if parse_date(s).is_some())
}

/// Accepts plain dates too, so a column mixing dates and datetimes is a timestamp
pub fn is_timestamp(value: &Value) -> bool {
    matches!(value, Value::String(s) if parse_timestamp(s).is_some())
}

/// Objects, arrays, or strings holding a serialized object or array
pub fn is_json(value: &Value) -> bool {
    match value {
        Value::Object(_) | Value::Array(_) => true,
        Value::String(s) => parse_json_text(s).is_some(),
        _ => false,
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Integer value of a JSON number or integer-looking string
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            if INTEGER_REGEX.is_match(s) {
                s.parse::<i64>().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if !ISO_DATE_REGEX.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse an ISO-8601 timestamp; offsets are normalized to UTC
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Some(date) = parse_date(s) {
        return date.and_hms_opt(0, 0, 0);
    }
    if !ISO_DATETIME_REGEX.is_match(s) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse a string that holds a JSON object or array
pub fn parse_json_text(s: &str) -> Option<Value> {
    let s = s.trim();
    if !(s.starts_with('{') || s.starts_with('[')) {
        return None;
    }
    match serde_json::from_str::<Value>(s) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uuid() {
        assert!(is_uuid(&json!("550e8400-e29b-41d4-a716-446655440000")));
        assert!(is_uuid(&json!("550E8400-E29B-41D4-A716-446655440000")));
        assert!(!is_uuid(&json!("550e8400e29b41d4a716446655440000")));
        assert!(!is_uuid(&json!(12)));
    }

    #[test]
    fn test_object_id() {
        assert!(is_object_id_str("507f1f77bcf86cd799439011"));
        assert!(!is_object_id_str("507f1f77bcf86cd79943901"));
        assert!(!is_object_id_str("507f1f77bcf86cd79943901z"));
    }

    #[test]
    fn test_integer_ranges() {
        assert!(is_integer(&json!(42)));
        assert!(is_integer(&json!("-17")));
        assert!(!is_integer(&json!(3_000_000_000_i64)));
        assert!(is_bigint(&json!(3_000_000_000_i64)));
        assert!(!is_integer(&json!(1.5)));
        assert!(is_numeric(&json!(1.5)));
        assert!(is_numeric(&json!("1e10")));
        assert!(!is_numeric(&json!("12abc")));
    }

    #[test]
    fn test_dates() {
        assert!(is_date(&json!("2021-01-31")));
        assert!(!is_date(&json!("2021-02-31")));
        assert!(is_timestamp(&json!("2021-01-31T10:20:30Z")));
        assert!(is_timestamp(&json!("2021-01-31 10:20:30.123")));
        assert!(is_timestamp(&json!("2021-01-31T10:20:30+02:00")));
        assert!(is_timestamp(&json!("2021-01-31")));
        assert!(!is_timestamp(&json!("yesterday")));
    }

    #[test]
    fn test_json_text() {
        assert!(is_json(&json!({"a": 1})));
        assert!(is_json(&json!("[1, 2]")));
        assert!(!is_json(&json!("plain")));
        assert!(!is_json(&json!("123")));
    }

    #[test]
    fn test_empty() {
        assert!(is_empty(&json!(null)));
        assert!(is_empty(&json!("   ")));
        assert!(!is_empty(&json!(0)));
    }
}
