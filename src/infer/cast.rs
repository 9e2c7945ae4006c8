//! Casting single values to a column type

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::column::ColumnType;
use super::patterns;

/// How values bound for a column should be cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastingRule {
    pub target_type: ColumnType,
    /// Degrade failed casts to NULL instead of reporting a failure
    pub null_on_failure: bool,
}

impl CastingRule {
    pub fn new(target_type: ColumnType) -> Self {
        CastingRule {
            target_type,
            null_on_failure: false,
        }
    }

    pub fn null_on_failure(mut self, enabled: bool) -> Self {
        self.null_on_failure = enabled;
        self
    }
}

/// Outcome of casting one value
#[derive(Debug, Clone, PartialEq)]
pub enum CastOutcome {
    /// The value in its target representation
    Converted(Value),
    /// The cast failed and the rule asked for NULL instead
    Nulled { reason: String },
    /// The cast failed
    Failed { reason: String },
}

impl CastOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CastOutcome::Converted(_))
    }
}

/// Cast a single value with the same predicates used for inference.
///
/// Empty values always convert to NULL.
pub fn attempt_cast(value: &Value, rule: &CastingRule) -> CastOutcome {
    if patterns::is_empty(value) {
        return CastOutcome::Converted(Value::Null);
    }

    match convert(value, rule.target_type) {
        Some(converted) => CastOutcome::Converted(converted),
        None => {
            let reason = format!("cannot cast {} to {}", value, rule.target_type);
            if rule.null_on_failure {
                CastOutcome::Nulled { reason }
            } else {
                CastOutcome::Failed { reason }
            }
        }
    }
}

fn convert(value: &Value, target: ColumnType) -> Option<Value> {
    match target {
        ColumnType::Uuid => match value {
            Value::String(s) if patterns::is_uuid_str(s) => {
                Some(Value::String(s.trim().to_lowercase()))
            }
            _ => None,
        },
        ColumnType::Boolean => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => patterns::parse_bool(s).map(Value::Bool),
            _ => None,
        },
        ColumnType::Integer | ColumnType::BigInt => {
            if !target.accepts(value) {
                return None;
            }
            patterns::as_i64(value).map(Value::from)
        }
        ColumnType::Numeric => match value {
            Value::Number(_) if patterns::is_numeric(value) => Some(value.clone()),
            Value::String(s) if patterns::is_numeric(value) => {
                serde_json::from_str::<Value>(s.trim().trim_start_matches('+'))
                    .ok()
                    .filter(Value::is_number)
                    .or_else(|| Some(Value::String(s.trim().to_string())))
            }
            _ => None,
        },
        ColumnType::Date => match value {
            Value::String(s) => patterns::parse_date(s)
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            _ => None,
        },
        ColumnType::Timestamp => match value {
            Value::String(s) => patterns::parse_timestamp(s)
                .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
            _ => None,
        },
        ColumnType::Jsonb => match value {
            Value::Object(_) | Value::Array(_) => Some(value.clone()),
            Value::String(s) => patterns::parse_json_text(s),
            _ => None,
        },
        ColumnType::Text => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            other => Some(Value::String(other.to_string())),
        },
    }
}
