use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::infer::ColumnType;

/// A column of a live database table, as reported by schema introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingColumn {
    pub name: String,
    #[serde(alias = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ExistingColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        ExistingColumn {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
        }
    }
}

/// A live database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingTableSchema {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ExistingColumn>,
}

impl ExistingTableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ExistingColumn>) -> Self {
        ExistingTableSchema {
            name: name.into(),
            columns,
        }
    }

    /// Case-insensitive column lookup
    pub fn column(&self, name: &str) -> Option<&ExistingColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// How an import table relates to the existing schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Same table, every column present with a compatible type
    Exact,
    /// Matching table with some compatible columns
    Partial,
    /// Matching table name, no compatible columns
    NameOnly,
    /// No matching table
    New,
}

/// What the generator does with an import table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// Create the table, then insert
    New,
    /// Insert into the existing table
    Insert,
    /// Insert into the existing table, honoring conflict resolutions
    Conflict,
    /// Emit nothing for this table
    Skip,
    /// Add missing columns to the existing table, then insert
    Augment,
}

/// What to do with a column whose import type is incompatible with the existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Leave the column out of the insert
    Skip,
    /// Write the values and let the database cast them
    #[default]
    Cast,
    /// Widen the existing column's type first
    Alter,
    /// Leave the column out of the insert
    Block,
}

impl ConflictResolution {
    /// Whether the column's data is left out of the insert
    pub fn omits_column(self) -> bool {
        matches!(self, ConflictResolution::Skip | ConflictResolution::Block)
    }
}

/// An import column paired with an existing column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMatch {
    pub import_column: String,
    pub existing_column: String,
    pub import_type: ColumnType,
    pub existing_type: String,
    pub type_match: bool,
    /// Matched by normalized name rather than exact name
    pub fuzzy: bool,
}

/// A matched column whose types are incompatible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConflict {
    /// Import column name
    pub column: String,
    pub existing_column: String,
    pub import_type: ColumnType,
    pub existing_type: String,
    pub resolution: ConflictResolution,
}

/// Reconciliation of one import table against the existing schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMatchResult {
    pub import_table: String,
    pub match_type: MatchType,
    pub existing_table: Option<String>,
    /// 0 - 100
    pub match_score: u32,
    pub column_matches: Vec<ColumnMatch>,
    pub conflicts: Vec<ColumnConflict>,
    /// Import columns with no counterpart in the existing table
    pub missing_columns: Vec<String>,
    /// Existing columns with no counterpart in the import
    pub extra_columns: Vec<String>,
    pub status: ImportStatus,
}

impl TableMatchResult {
    pub fn new_table(import_table: impl Into<String>) -> Self {
        TableMatchResult {
            import_table: import_table.into(),
            match_type: MatchType::New,
            existing_table: None,
            match_score: 0,
            column_matches: Vec::new(),
            conflicts: Vec::new(),
            missing_columns: Vec::new(),
            extra_columns: Vec::new(),
            status: ImportStatus::New,
        }
    }

    /// Resolution for an import column, if it is in conflict
    pub fn resolution_for(&self, column: &str) -> Option<ConflictResolution> {
        self.conflicts
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.resolution)
    }

    pub fn set_resolution(&mut self, column: &str, resolution: ConflictResolution) -> bool {
        match self.conflicts.iter_mut().find(|c| c.column == column) {
            Some(conflict) => {
                conflict.resolution = resolution;
                true
            }
            None => false,
        }
    }

    /// Apply a reviewer's decisions for this table
    pub fn apply_override(&mut self, review: &TableOverride) {
        if let Some(status) = review.status {
            self.status = status;
        }
        for (column, resolution) in &review.resolutions {
            if !self.set_resolution(column, *resolution) {
                tracing::warn!(
                    table = %self.import_table,
                    column = %column,
                    "Ignoring resolution for a column without conflict"
                );
            }
        }
    }
}

/// Reviewer decisions for one import table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOverride {
    pub status: Option<ImportStatus>,
    /// Table name to create instead of the import name, for new tables
    pub target_table: Option<String>,
    /// Import column name to conflict resolution
    pub resolutions: HashMap<String, ConflictResolution>,
}

/// Column-level reconciliation of one import table against one existing table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnAnalysis {
    pub column_matches: Vec<ColumnMatch>,
    pub conflicts: Vec<ColumnConflict>,
    pub missing_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    /// Percentage of import columns matched with a compatible type
    pub score: f64,
}
