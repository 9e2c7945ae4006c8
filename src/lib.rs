//! # Ingot - JSON to PostgreSQL import toolkit
//!
//! Turns arbitrary JSON documents into relational tables and an ordered,
//! reviewable SQL script that loads them into PostgreSQL.
//!
//! ## Modules
//!
//! - **infer**: Infer PostgreSQL column types from JSON values
//! - **structure**: Describe the nested objects and arrays of a document
//! - **normalize**: Decompose nested JSON into tables linked by parent ids
//! - **matcher**: Reconcile normalized tables with an existing schema
//! - **sql**: Generate CREATE/ALTER/INSERT statements with remapped ids
//!
//! ## Quick Start
//!
//! ```rust
//! use ingot::{import_json, ImportConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let text = r#"{"user": {"name": "Ann", "tags": ["x", "y"]}}"#;
//!
//! let plan = import_json(text, &[], &ImportConfig::default())?;
//!
//! // plan.normalized.tables = user (name), user_tags (value, _parent_id)
//! // plan.statements = BEGIN, two CREATE TABLEs, two INSERTs, COMMIT
//! assert_eq!(plan.normalized.tables.len(), 2);
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

pub mod config;
pub mod error;
pub mod infer;
pub mod matcher;
pub mod normalize;
pub mod sql;
pub mod structure;
pub mod writer;

// Re-export commonly used types for convenience
pub use config::ImportConfig;
pub use error::{ImportError, ImportResult};
pub use infer::{attempt_cast, infer_column_type, CastingRule, ColumnType, ColumnTypeInference};
pub use matcher::{
    analyze_columns, match_tables, ConflictResolution, ExistingColumn, ExistingTableSchema,
    ImportStatus, MatchType, TableMatchResult, TableOverride,
};
pub use normalize::{
    normalize, ForeignKeyRelationship, JsonColumn, JsonTable, NormalizationOptions,
    NormalizationStrategy, NormalizedData, Normalizer,
};
pub use sql::{
    calculate_batch_size, generate_smart_import_sql, GeneratorOptions, ImportContext,
    SqlStatement, StatementType,
};
pub use structure::{analyze_json_structure, StructureNode};
pub use writer::{ScriptWriter, TableWriter};

/// Everything produced by one import run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPlan {
    pub normalized: NormalizedData,
    /// Match results before reviewer overrides; empty without an existing schema
    pub matches: Vec<TableMatchResult>,
    pub statements: Vec<SqlStatement>,
}

/// Read a whole document from a file, or from stdin when no path is given
pub fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    let mut content = Vec::new();
    match path {
        Some(path) => File::open(path)?.read_to_end(&mut content)?,
        None => io::stdin().read_to_end(&mut content)?,
    };
    Ok(content)
}

/// Parse a JSON document, failing on the first syntax error
pub fn parse_document(text: &str) -> ImportResult<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Parse raw document bytes with SIMD acceleration.
///
/// On failure the bytes are parsed again with `serde_json`, whose errors
/// carry a line and column.
pub fn parse_document_bytes(bytes: &[u8]) -> ImportResult<Value> {
    let mut scratch = bytes.to_vec();
    match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(value) => Ok(value),
        Err(_) => Ok(serde_json::from_slice(bytes)?),
    }
}

/// Main entry point: turn JSON text into an import plan
pub fn import_json(
    text: &str,
    existing: &[ExistingTableSchema],
    config: &ImportConfig,
) -> ImportResult<ImportPlan> {
    let data = parse_document(text)?;
    import_value(&data, existing, config)
}

/// Normalize, match and generate for an already parsed document
pub fn import_value(
    data: &Value,
    existing: &[ExistingTableSchema],
    config: &ImportConfig,
) -> ImportResult<ImportPlan> {
    let normalized =
        Normalizer::new(config.normalization.clone()).normalize(data, &config.root_table_name)?;
    normalized.verify_references()?;

    let matches = if existing.is_empty() {
        Vec::new()
    } else {
        match_tables(&normalized.tables, existing)
    };

    let ctx = ImportContext::new(&normalized.tables, &normalized.relationships, &config.schema)
        .with_matches(&matches, existing)
        .with_selected_rows(&config.selected_rows)
        .with_overrides(&config.overrides);
    let statements = generate_smart_import_sql(&ctx, &config.generation);

    Ok(ImportPlan {
        normalized,
        matches,
        statements,
    })
}
