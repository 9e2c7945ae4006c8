//! Type compatibility between inferred import types and existing column types

use crate::infer::ColumnType;

/// Canonical spelling of a database type name: `int4` becomes `INTEGER`,
/// `varchar(255)` becomes `TEXT`. Unknown types are trimmed and uppercased.
pub fn normalize_type(raw: &str) -> String {
    match ColumnType::from_sql_name(raw) {
        Some(ty) => ty.as_sql().to_string(),
        None => raw.trim().to_uppercase(),
    }
}

/// Whether values inferred as `import` can be written to a column of type `existing`
pub fn types_compatible(import: ColumnType, existing: &str) -> bool {
    let Some(existing) = ColumnType::from_sql_name(existing) else {
        return false;
    };

    use ColumnType::*;
    match (import, existing) {
        (a, b) if a == b => true,
        (_, Text) => true,
        (Integer | BigInt, Numeric) => true,
        (Integer, BigInt) => true,
        (Date, Timestamp) => true,
        (Text, Jsonb) => true,
        _ => false,
    }
}
