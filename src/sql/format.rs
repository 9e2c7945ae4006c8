//! PostgreSQL literal and identifier formatting

use serde_json::Value;

use crate::infer::patterns::{parse_date, parse_json_text, parse_timestamp};
use crate::infer::ColumnType;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Quote an identifier, doubling embedded double quotes
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render a value as a SQL literal for a column of the given type.
///
/// Without a known column type the literal follows the JSON type. With one,
/// values are rendered so that every row of a multi-row `VALUES` list
/// resolves to the column's type: text columns get quoted literals,
/// dates and timestamps are normalized to ISO-8601, JSONB columns get a
/// `::jsonb` cast.
pub fn format_value(value: &Value, column_type: Option<ColumnType>) -> String {
    if value.is_null() {
        return "NULL".to_string();
    }

    match column_type {
        Some(ColumnType::Text) => match value {
            Value::String(s) => quote_literal(s),
            other => quote_literal(&other.to_string()),
        },
        Some(ColumnType::Jsonb) => {
            let text = match value {
                Value::String(s) if parse_json_text(s).is_some() => s.clone(),
                other => other.to_string(),
            };
            format!("{}::jsonb", quote_literal(&text))
        }
        Some(ColumnType::Date) => match value {
            Value::String(s) => match parse_date(s) {
                Some(date) => quote_literal(&date.format("%Y-%m-%d").to_string()),
                None => quote_literal(s),
            },
            other => format_json(other),
        },
        Some(ColumnType::Timestamp) => match value {
            Value::String(s) => match parse_timestamp(s) {
                Some(ts) => quote_literal(&ts.format(TIMESTAMP_FORMAT).to_string()),
                None => quote_literal(s),
            },
            other => format_json(other),
        },
        _ => format_json(value),
    }
}

/// Literal chosen by JSON type alone
fn format_json(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => "NULL".to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => quote_literal(s),
        Value::Object(_) | Value::Array(_) => {
            format!("{}::jsonb", quote_literal(&value.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifiers() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(qualified_name("public", "users"), "\"public\".\"users\"");
    }

    #[test]
    fn test_json_typed_literals() {
        assert_eq!(format_value(&json!(null), None), "NULL");
        assert_eq!(format_value(&json!(true), None), "TRUE");
        assert_eq!(format_value(&json!(false), None), "FALSE");
        assert_eq!(format_value(&json!(42), None), "42");
        assert_eq!(format_value(&json!(1.5), Some(ColumnType::Numeric)), "1.5");
        assert_eq!(format_value(&json!("O'Brien"), None), "'O''Brien'");
        assert_eq!(format_value(&json!({"a": 1}), None), "'{\"a\":1}'::jsonb");
    }

    #[test]
    fn test_text_columns_quote_everything() {
        assert_eq!(format_value(&json!(7), Some(ColumnType::Text)), "'7'");
        assert_eq!(format_value(&json!(true), Some(ColumnType::Text)), "'true'");
        assert_eq!(format_value(&json!(null), Some(ColumnType::Text)), "NULL");
    }

    #[test]
    fn test_jsonb_columns() {
        assert_eq!(format_value(&json!([1, 2]), Some(ColumnType::Jsonb)), "'[1,2]'::jsonb");
        assert_eq!(format_value(&json!("{\"a\":1}"), Some(ColumnType::Jsonb)), "'{\"a\":1}'::jsonb");
        assert_eq!(format_value(&json!("plain"), Some(ColumnType::Jsonb)), "'\"plain\"'::jsonb");
        assert_eq!(format_value(&json!(3), Some(ColumnType::Jsonb)), "'3'::jsonb");
    }

    #[test]
    fn test_dates_are_iso() {
        assert_eq!(format_value(&json!("2024-03-05"), Some(ColumnType::Date)), "'2024-03-05'");
        assert_eq!(
            format_value(&json!("2024-03-05T10:00:00+02:00"), Some(ColumnType::Timestamp)),
            "'2024-03-05T08:00:00'"
        );
        assert_eq!(
            format_value(&json!("2024-03-05"), Some(ColumnType::Timestamp)),
            "'2024-03-05T00:00:00'"
        );
        assert_eq!(format_value(&json!("soon"), Some(ColumnType::Date)), "'soon'");
    }
}
