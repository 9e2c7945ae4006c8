//! Column type inference over sampled values

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::patterns;

/// Maximum number of values inspected per column
pub const MAX_SAMPLE_SIZE: usize = 1000;

/// Share of non-null samples a type predicate must accept
pub const TYPE_CONFIDENCE_THRESHOLD: f64 = 0.95;

static PRIMARY_KEY_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(id|uuid|_id|pk|primary_key)$").unwrap());

static FILTER_FIELD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^(status|state|type|kind|category|email|username|slug|code)$|_id$|_at$|_date$)")
        .unwrap()
});

/// PostgreSQL column type chosen for an imported column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Uuid,
    Boolean,
    Integer,
    BigInt,
    Numeric,
    Date,
    Timestamp,
    Jsonb,
    Text,
}

impl ColumnType {
    /// Typed candidates in the order they are tried. Integers also satisfy
    /// the bigint and numeric predicates, so the narrow types come first.
    pub const INFERENCE_ORDER: [ColumnType; 7] = [
        ColumnType::Uuid,
        ColumnType::Boolean,
        ColumnType::Integer,
        ColumnType::BigInt,
        ColumnType::Numeric,
        ColumnType::Date,
        ColumnType::Timestamp,
    ];

    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Uuid => "UUID",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Jsonb => "JSONB",
            ColumnType::Text => "TEXT",
        }
    }

    /// Whether a single non-empty value satisfies this type
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ColumnType::Uuid => patterns::is_uuid(value),
            ColumnType::Boolean => patterns::is_boolean(value),
            ColumnType::Integer => patterns::is_integer(value),
            ColumnType::BigInt => patterns::is_bigint(value),
            ColumnType::Numeric => patterns::is_numeric(value),
            ColumnType::Date => patterns::is_date(value),
            ColumnType::Timestamp => patterns::is_timestamp(value),
            ColumnType::Jsonb => patterns::is_json(value),
            ColumnType::Text => true,
        }
    }

    /// Map a database type name (as reported by introspection) onto a column type.
    ///
    /// Length and precision modifiers are ignored: `varchar(255)` is TEXT,
    /// `numeric(10,2)` is NUMERIC. Returns `None` for types outside this set,
    /// such as `inet` or array types.
    pub fn from_sql_name(name: &str) -> Option<ColumnType> {
        let lowered = name.trim().to_lowercase();
        let base = lowered.split('(').next().unwrap_or("").trim();
        let ty = match base {
            "uuid" => ColumnType::Uuid,
            "bool" | "boolean" => ColumnType::Boolean,
            "int" | "int2" | "int4" | "integer" | "smallint" | "serial" | "serial4"
            | "smallserial" => ColumnType::Integer,
            "int8" | "bigint" | "bigserial" | "serial8" => ColumnType::BigInt,
            "numeric" | "decimal" | "real" | "float" | "float4" | "float8"
            | "double precision" => ColumnType::Numeric,
            "date" => ColumnType::Date,
            "timestamp" | "timestamptz" | "timestamp without time zone"
            | "timestamp with time zone" | "datetime" => ColumnType::Timestamp,
            "json" | "jsonb" => ColumnType::Jsonb,
            "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
            | "citext" | "string" | "name" => ColumnType::Text,
            _ => return None,
        };
        Some(ty)
    }

    /// Smallest type that holds values of both `self` and `other`
    pub fn widen(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, BigInt) | (BigInt, Integer) => BigInt,
            (Integer | BigInt | Numeric, Integer | BigInt | Numeric) => Numeric,
            (Date | Timestamp, Date | Timestamp) => Timestamp,
            _ => Text,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Result of inferring a column's type from its values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTypeInference {
    pub inferred_type: ColumnType,
    pub nullable: bool,
    /// Distinct non-null values over non-null values
    pub unique_ratio: f64,
    /// Share of non-null values accepted by the inferred type
    pub casting_success_rate: f64,
    pub suggest_primary_key: bool,
    pub suggest_index: bool,
}

/// Infer the column type of a set of values.
///
/// Empty values (null or blank strings) only affect nullability, which
/// covers every value. The type is decided by the first [`MAX_SAMPLE_SIZE`]
/// non-empty values: the first typed candidate accepted by at least 95% of
/// them wins; otherwise JSONB if the values are structured, otherwise TEXT.
pub fn infer_column_type<'a, I>(values: I, name: &str) -> ColumnTypeInference
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut saw_empty = false;
    let mut samples: Vec<&Value> = Vec::new();
    for value in values {
        if patterns::is_empty(value) {
            saw_empty = true;
        } else if samples.len() < MAX_SAMPLE_SIZE {
            samples.push(value);
        }
    }

    if samples.is_empty() {
        return ColumnTypeInference {
            inferred_type: ColumnType::Text,
            nullable: true,
            unique_ratio: 0.0,
            casting_success_rate: 1.0,
            suggest_primary_key: false,
            suggest_index: false,
        };
    }

    let total = samples.len() as f64;
    let pass_rate = |ty: ColumnType| samples.iter().filter(|v| ty.accepts(v)).count() as f64 / total;

    let mut chosen = None;
    for ty in ColumnType::INFERENCE_ORDER {
        let rate = pass_rate(ty);
        if rate >= TYPE_CONFIDENCE_THRESHOLD {
            chosen = Some((ty, rate));
            break;
        }
    }

    let (inferred_type, casting_success_rate) = chosen.unwrap_or_else(|| {
        let rate = pass_rate(ColumnType::Jsonb);
        if rate >= TYPE_CONFIDENCE_THRESHOLD {
            (ColumnType::Jsonb, rate)
        } else {
            (ColumnType::Text, 1.0)
        }
    });

    let distinct: HashSet<String> = samples.iter().map(|v| v.to_string()).collect();
    let unique_ratio = distinct.len() as f64 / total;
    let nullable = saw_empty;

    let suggest_primary_key =
        PRIMARY_KEY_NAME_REGEX.is_match(name) && unique_ratio > 0.99 && !nullable;
    let suggest_index =
        !suggest_primary_key && (unique_ratio > 0.8 || FILTER_FIELD_REGEX.is_match(name));

    ColumnTypeInference {
        inferred_type,
        nullable,
        unique_ratio,
        casting_success_rate,
        suggest_primary_key,
        suggest_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn infer(values: &[Value], name: &str) -> ColumnTypeInference {
        infer_column_type(values, name)
    }

    #[test]
    fn test_uuid_column() {
        let values = vec![
            json!("550e8400-e29b-41d4-a716-446655440000"),
            json!(null),
            json!("6fa459ea-ee8a-3ca4-894e-db77e160355e"),
        ];
        let result = infer(&values, "ref");
        assert_eq!(result.inferred_type, ColumnType::Uuid);
        assert!(result.nullable);
    }

    #[test]
    fn test_all_empty_defaults_to_text() {
        let values = vec![json!(null), json!(""), json!("  ")];
        let result = infer(&values, "note");
        assert_eq!(result.inferred_type, ColumnType::Text);
        assert!(result.nullable);
    }

    #[test]
    fn test_integer_before_numeric() {
        let values = vec![json!(1), json!(2), json!("3")];
        assert_eq!(infer(&values, "n").inferred_type, ColumnType::Integer);

        let values = vec![json!(1), json!(5_000_000_000_i64)];
        assert_eq!(infer(&values, "n").inferred_type, ColumnType::BigInt);

        let values = vec![json!(1), json!(2.5)];
        assert_eq!(infer(&values, "n").inferred_type, ColumnType::Numeric);
    }

    #[test]
    fn test_threshold_tolerates_outliers() {
        let mut values: Vec<Value> = (0..99).map(|i| json!(i)).collect();
        values.push(json!("oops"));
        let result = infer(&values, "count");
        assert_eq!(result.inferred_type, ColumnType::Integer);
        assert!((result.casting_success_rate - 0.99).abs() < 1e-9);

        let mut values: Vec<Value> = (0..9).map(|i| json!(i)).collect();
        values.push(json!("oops"));
        assert_eq!(infer(&values, "count").inferred_type, ColumnType::Text);
    }

    #[test]
    fn test_dates_and_timestamps() {
        let values = vec![json!("2024-01-01"), json!("2024-02-01")];
        assert_eq!(infer(&values, "d").inferred_type, ColumnType::Date);

        let values = vec![json!("2024-01-01"), json!("2024-02-01T10:00:00Z")];
        assert_eq!(infer(&values, "d").inferred_type, ColumnType::Timestamp);
    }

    #[test]
    fn test_json_and_text_fallback() {
        let values = vec![json!([1, "a"]), json!({"k": 1})];
        assert_eq!(infer(&values, "blob").inferred_type, ColumnType::Jsonb);

        let values = vec![json!("alpha"), json!("beta")];
        assert_eq!(infer(&values, "word").inferred_type, ColumnType::Text);
    }

    #[test]
    fn test_boolean_strings() {
        let values = vec![json!(true), json!("FALSE"), json!("true")];
        assert_eq!(infer(&values, "flag").inferred_type, ColumnType::Boolean);
    }

    #[test]
    fn test_key_and_index_suggestions() {
        let values: Vec<Value> = (0..50).map(|i| json!(i)).collect();
        let result = infer(&values, "id");
        assert!(result.suggest_primary_key);
        assert!(!result.suggest_index);

        let result = infer(&values, "sequence");
        assert!(!result.suggest_primary_key);
        assert!(result.suggest_index);

        let values = vec![json!("open"), json!("open"), json!("closed")];
        let result = infer(&values, "status");
        assert!(result.suggest_index);

        let values = vec![json!(1), json!(null)];
        assert!(!infer(&values, "id").suggest_primary_key);
    }

    #[test]
    fn test_sample_is_bounded() {
        let mut values: Vec<Value> = (0..MAX_SAMPLE_SIZE).map(|i| json!(i)).collect();
        values.extend((0..500).map(|_| json!("text")));
        assert_eq!(infer(&values, "n").inferred_type, ColumnType::Integer);
    }

    #[test]
    fn test_nullability_covers_every_value() {
        let mut values: Vec<Value> = (0..MAX_SAMPLE_SIZE).map(|i| json!(i)).collect();
        values.push(json!(null));
        let result = infer(&values, "n");
        assert_eq!(result.inferred_type, ColumnType::Integer);
        assert!(result.nullable);
    }

    #[test]
    fn test_sql_names() {
        assert_eq!(ColumnType::from_sql_name("character varying(255)"), Some(ColumnType::Text));
        assert_eq!(ColumnType::from_sql_name("int4"), Some(ColumnType::Integer));
        assert_eq!(ColumnType::from_sql_name("timestamp with time zone"), Some(ColumnType::Timestamp));
        assert_eq!(ColumnType::from_sql_name("JSON"), Some(ColumnType::Jsonb));
        assert_eq!(ColumnType::from_sql_name("inet"), None);
    }

    #[test]
    fn test_widen() {
        assert_eq!(ColumnType::Integer.widen(ColumnType::BigInt), ColumnType::BigInt);
        assert_eq!(ColumnType::Integer.widen(ColumnType::Numeric), ColumnType::Numeric);
        assert_eq!(ColumnType::Date.widen(ColumnType::Timestamp), ColumnType::Timestamp);
        assert_eq!(ColumnType::Uuid.widen(ColumnType::Integer), ColumnType::Text);
    }
}
