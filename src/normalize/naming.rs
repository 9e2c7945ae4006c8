//! Identifier sanitizing for PostgreSQL table and column names

use super::types::{PARENT_ID_COLUMN, ROW_ID_COLUMN};

/// PostgreSQL truncates identifiers longer than this many bytes
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Separator for flattened columns and child table names
pub const SEPARATOR: &str = "_";

/// Turn an arbitrary JSON key into a safe identifier.
///
/// Anything other than ASCII letters and digits becomes `_`, letters are
/// lowercased, a leading digit gets a `_` prefix, and the result is cut to
/// 63 characters. The same input always yields the same identifier.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if out.is_empty() {
        out.push_str("unnamed");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }

    out.truncate(MAX_IDENTIFIER_LENGTH);
    out
}

/// Prefix for source fields whose names clash with internal columns
pub const RESERVED_PREFIX: &str = "src_";

/// Column name for a key flattened out of a nested object.
///
/// Source keys that sanitize to `_row_id` or `_parent_id` get a `src_`
/// prefix, so they never replace the internal keys of a row.
pub fn flattened_column_name(prefix: Option<&str>, key: &str) -> String {
    let name = match prefix {
        Some(prefix) => sanitize_identifier(&format!("{}{}{}", prefix, SEPARATOR, key)),
        None => sanitize_identifier(key),
    };
    if name == ROW_ID_COLUMN || name == PARENT_ID_COLUMN {
        format!("{}{}", RESERVED_PREFIX, name)
    } else {
        name
    }
}

/// Name of a table split out of `parent` from the field `field`
pub fn child_table_name(parent: &str, field: &str) -> String {
    sanitize_identifier(&format!("{}{}{}", parent, SEPARATOR, field))
}

/// Append a key to a dotted source path
pub fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_identifier("First Name"), "first_name");
        assert_eq!(sanitize_identifier("e-mail@home"), "e_mail_home");
        assert_eq!(sanitize_identifier("_id"), "_id");
        assert_eq!(sanitize_identifier("Größe"), "gr__e");
    }

    #[test]
    fn test_sanitize_leading_digit_and_empty() {
        assert_eq!(sanitize_identifier("2fa"), "_2fa");
        assert_eq!(sanitize_identifier(""), "unnamed");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_identifier(&long).len(), MAX_IDENTIFIER_LENGTH);
        assert_eq!(sanitize_identifier(&long), sanitize_identifier(&long));
    }

    #[test]
    fn test_names_and_paths() {
        assert_eq!(flattened_column_name(Some("address"), "Zip Code"), "address_zip_code");
        assert_eq!(flattened_column_name(None, "_Row_ID"), "src__row_id");
        assert_eq!(flattened_column_name(None, "_parent id"), "src__parent_id");
        assert_eq!(child_table_name("user", "tags"), "user_tags");
        assert_eq!(join_path("", "users"), "users");
        assert_eq!(join_path("users", "address"), "users.address");
    }
}
