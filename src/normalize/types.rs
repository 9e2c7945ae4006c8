use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ImportError, ImportResult};
use crate::infer::{infer_column_type, ColumnTypeInference};

/// Internal surrogate key present on every row
pub const ROW_ID_COLUMN: &str = "_row_id";

/// Internal foreign key present on every row of a child table
pub const PARENT_ID_COLUMN: &str = "_parent_id";

/// Source field that identifies a row in the originating system
pub const IDENTITY_COLUMN: &str = "id";

/// Document-store style identity field, used when `id` is absent
pub const SOURCE_ID_COLUMN: &str = "_id";

/// Maximum number of sample values kept per column
pub const MAX_SAMPLE_VALUES: usize = 5;

/// One row of a normalized table, keyed by sanitized column name
pub type Row = Map<String, Value>;

static NULL_VALUE: Value = Value::Null;

/// Render a row id as a lookup key: strings verbatim, anything else as JSON text
pub fn row_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// How nested objects are turned into tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationStrategy {
    /// Promote a nested object only if it contains an array at any depth
    #[default]
    Partial,
    /// Promote every nested object
    Full,
    /// Promote nested objects whose dotted path was selected by the caller
    Custom,
}

/// How `_row_id` values are minted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowIdMode {
    /// Per-table counter starting at 1
    #[default]
    Sequential,
    /// Random v4 UUID per row
    Uuid,
}

/// Configuration for the normalization process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizationOptions {
    pub strategy: NormalizationStrategy,

    /// Dotted source paths promoted under [`NormalizationStrategy::Custom`]
    pub custom_table_paths: HashSet<String>,

    pub row_ids: RowIdMode,

    /// Nesting depth past which objects and arrays are stored whole as JSONB
    pub max_depth: usize,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        NormalizationOptions {
            strategy: NormalizationStrategy::Partial,
            custom_table_paths: HashSet::new(),
            row_ids: RowIdMode::Sequential,
            max_depth: 10,
        }
    }
}

impl NormalizationOptions {
    pub fn with_strategy(mut self, strategy: NormalizationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Switch to the custom strategy with the given table paths
    pub fn with_custom_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategy = NormalizationStrategy::Custom;
        self.custom_table_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_row_ids(mut self, mode: RowIdMode) -> Self {
        self.row_ids = mode;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Shape of a JSON array's elements, ignoring nulls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayKind {
    Empty,
    Objects,
    Scalars,
    /// Objects mixed with scalars, or nested arrays
    Mixed,
}

impl ArrayKind {
    pub fn of(items: &[Value]) -> Self {
        if items.is_empty() {
            return ArrayKind::Empty;
        }

        let mut objects = 0;
        let mut scalars = 0;
        for item in items {
            match item {
                Value::Null => {}
                Value::Object(_) => objects += 1,
                Value::Array(_) => return ArrayKind::Mixed,
                _ => scalars += 1,
            }
        }

        match (objects, scalars) {
            (0, _) => ArrayKind::Scalars,
            (_, 0) => ArrayKind::Objects,
            _ => ArrayKind::Mixed,
        }
    }
}

/// One inferred column of a normalized table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonColumn {
    /// Sanitized identifier
    pub name: String,
    /// Dotted source path
    pub path: String,
    pub sample_values: Vec<Value>,
    /// Came from a flattened nested object
    pub is_nested: bool,
    /// Holds whole arrays
    pub is_array: bool,
}

impl JsonColumn {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        JsonColumn {
            name: name.into(),
            path: path.into(),
            sample_values: Vec::new(),
            is_nested: false,
            is_array: false,
        }
    }

    fn record_sample(&mut self, value: &Value) {
        if !value.is_null() && self.sample_values.len() < MAX_SAMPLE_VALUES {
            self.sample_values.push(value.clone());
        }
    }
}

/// A normalized table: a union of columns and the rows that fill them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTable {
    pub name: String,
    pub columns: Vec<JsonColumn>,
    pub rows: Vec<Row>,
    /// Name of the parent table, if this table was split out of one
    pub parent: Option<String>,
    #[serde(skip)]
    column_index: HashMap<String, usize>,
}

impl JsonTable {
    pub fn new(name: impl Into<String>) -> Self {
        JsonTable {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            parent: None,
            column_index: HashMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn column(&self, name: &str) -> Option<&JsonColumn> {
        self.column_index.get(name).map(|&idx| &self.columns[idx])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    /// Record a value for a column, creating the column on first sight
    pub fn record_value(&mut self, column: &JsonColumn, value: &Value) {
        let idx = match self.column_index.get(&column.name) {
            Some(&idx) => idx,
            None => {
                let mut fresh = column.clone();
                fresh.sample_values.clear();
                self.columns.push(fresh);
                self.column_index.insert(column.name.clone(), self.columns.len() - 1);
                self.columns.len() - 1
            }
        };
        self.columns[idx].record_sample(value);
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Every row's value for a column; rows without the column yield NULL
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |row| row.get(name).unwrap_or(&NULL_VALUE))
    }

    /// Infer a column's type from the values of every row
    pub fn infer_column(&self, name: &str) -> ColumnTypeInference {
        infer_column_type(self.column_values(name), name)
    }

    /// Columns carrying row data: everything but the internal keys and the
    /// source `id`, which becomes the primary key on import
    pub fn data_columns(&self) -> impl Iterator<Item = &JsonColumn> {
        self.columns.iter().filter(|c| {
            c.name != ROW_ID_COLUMN && c.name != PARENT_ID_COLUMN && c.name != IDENTITY_COLUMN
        })
    }

    /// Identifier a row carried in its source: `id`, else `_id`, else the
    /// surrogate `_row_id`
    pub fn source_id(row: &Row) -> Option<&Value> {
        [IDENTITY_COLUMN, SOURCE_ID_COLUMN, ROW_ID_COLUMN]
            .iter()
            .filter_map(|name| row.get(*name))
            .find(|v| !v.is_null())
    }

    pub fn row_id(row: &Row) -> Option<&Value> {
        row.get(ROW_ID_COLUMN)
    }

    pub fn parent_id(row: &Row) -> Option<&Value> {
        row.get(PARENT_ID_COLUMN)
    }
}

/// Parent/child link between two normalized tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRelationship {
    pub parent_table: String,
    pub child_table: String,
    pub parent_column: String,
    pub child_column: String,
}

impl ForeignKeyRelationship {
    pub fn new(parent_table: impl Into<String>, child_table: impl Into<String>) -> Self {
        ForeignKeyRelationship {
            parent_table: parent_table.into(),
            child_table: child_table.into(),
            parent_column: ROW_ID_COLUMN.to_string(),
            child_column: PARENT_ID_COLUMN.to_string(),
        }
    }
}

/// Output of a normalization run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedData {
    /// Tables in order of first encounter; parents precede their children
    pub tables: Vec<JsonTable>,
    pub relationships: Vec<ForeignKeyRelationship>,
}

impl NormalizedData {
    pub fn table(&self, name: &str) -> Option<&JsonTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Check that every `_parent_id` matches exactly one `_row_id` in the
    /// declared parent table
    pub fn verify_references(&self) -> ImportResult<()> {
        let tables: HashMap<&str, &JsonTable> =
            self.tables.iter().map(|t| (t.name.as_str(), t)).collect();

        for rel in &self.relationships {
            let (Some(parent), Some(child)) = (
                tables.get(rel.parent_table.as_str()),
                tables.get(rel.child_table.as_str()),
            ) else {
                continue;
            };

            let mut parent_ids: HashMap<String, usize> = HashMap::new();
            for row in &parent.rows {
                if let Some(id) = JsonTable::row_id(row) {
                    *parent_ids.entry(row_key(id)).or_insert(0) += 1;
                }
            }

            for row in &child.rows {
                let parent_id = JsonTable::parent_id(row).map(row_key).unwrap_or_default();
                if parent_ids.get(&parent_id) != Some(&1) {
                    return Err(ImportError::BrokenReference {
                        table: child.name.clone(),
                        parent_table: parent.name.clone(),
                        parent_id,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_id_precedence() {
        let row: Row = serde_json::from_value(json!({"_row_id": 1, "_id": "abc", "id": 9})).unwrap();
        assert_eq!(JsonTable::source_id(&row), Some(&json!(9)));

        let row: Row = serde_json::from_value(json!({"_row_id": 1, "_id": "abc", "id": null})).unwrap();
        assert_eq!(JsonTable::source_id(&row), Some(&json!("abc")));

        let row: Row = serde_json::from_value(json!({"_row_id": 1})).unwrap();
        assert_eq!(JsonTable::source_id(&row), Some(&json!(1)));
    }

    #[test]
    fn test_data_columns_skip_identity() {
        let mut table = JsonTable::new("users");
        table.record_value(&JsonColumn::new("id", "id"), &json!(1));
        table.record_value(&JsonColumn::new("_id", "_id"), &json!("x"));
        table.record_value(&JsonColumn::new("name", "name"), &json!("Ann"));
        let names: Vec<&str> = table.data_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["_id", "name"]);
    }

    #[test]
    fn test_array_kind() {
        assert_eq!(ArrayKind::of(&[]), ArrayKind::Empty);
        assert_eq!(ArrayKind::of(&[json!({"a": 1}), json!(null)]), ArrayKind::Objects);
        assert_eq!(ArrayKind::of(&[json!(1), json!("x")]), ArrayKind::Scalars);
        assert_eq!(ArrayKind::of(&[json!(null)]), ArrayKind::Scalars);
        assert_eq!(ArrayKind::of(&[json!({"a": 1}), json!(2)]), ArrayKind::Mixed);
        assert_eq!(ArrayKind::of(&[json!([1])]), ArrayKind::Mixed);
    }

    #[test]
    fn test_column_union_and_samples() {
        let mut table = JsonTable::new("items");
        let a = JsonColumn::new("a", "a");
        for i in 0..8 {
            table.record_value(&a, &json!(i));
        }
        table.record_value(&JsonColumn::new("b", "b"), &json!("x"));

        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.column("a").unwrap().sample_values.len(), MAX_SAMPLE_VALUES);
        assert!(table.has_column("b"));
    }

    #[test]
    fn test_missing_values_read_as_null() {
        let mut table = JsonTable::new("items");
        let mut row = Row::new();
        row.insert("a".to_string(), json!(1));
        table.push_row(row);
        table.push_row(Row::new());

        let values: Vec<&Value> = table.column_values("a").collect();
        assert_eq!(values, vec![&json!(1), &Value::Null]);
        assert!(table.infer_column("a").nullable);
    }

    #[test]
    fn test_verify_references_detects_orphans() {
        let mut parent = JsonTable::new("user");
        let mut row = Row::new();
        row.insert(ROW_ID_COLUMN.to_string(), json!(1));
        parent.push_row(row);

        let mut child = JsonTable::new("user_tags").with_parent("user");
        let mut row = Row::new();
        row.insert(ROW_ID_COLUMN.to_string(), json!(1));
        row.insert(PARENT_ID_COLUMN.to_string(), json!(2));
        child.push_row(row);

        let data = NormalizedData {
            tables: vec![parent, child],
            relationships: vec![ForeignKeyRelationship::new("user", "user_tags")],
        };
        assert!(matches!(
            data.verify_references(),
            Err(ImportError::BrokenReference { .. })
        ));
    }
}
