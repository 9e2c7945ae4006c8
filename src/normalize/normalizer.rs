use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::ids::RowIdAllocator;
use super::naming::{child_table_name, flattened_column_name, join_path, sanitize_identifier};
use super::types::{
    ArrayKind, ForeignKeyRelationship, JsonColumn, JsonTable, NormalizationOptions,
    NormalizationStrategy, NormalizedData, Row, PARENT_ID_COLUMN, ROW_ID_COLUMN,
};
use crate::error::{ImportError, ImportResult};

/// Column holding the elements of a scalar array
pub const VALUE_COLUMN: &str = "value";

/// Decomposes a JSON document into relational tables
pub struct Normalizer {
    options: NormalizationOptions,
}

impl Normalizer {
    pub fn new(options: NormalizationOptions) -> Self {
        Normalizer { options }
    }

    /// Normalize a JSON value into tables and parent/child relationships.
    ///
    /// A root array becomes rows of `root_table_name`. A root object with a
    /// single key holding an object or an array of objects is unwrapped, and
    /// the inner value is normalized under the key's name instead.
    pub fn normalize(&self, data: &Value, root_table_name: &str) -> ImportResult<NormalizedData> {
        let mut run = NormalizationRun::new(&self.options);
        let root = sanitize_identifier(root_table_name);

        match data {
            Value::Object(obj) => match unwrap_single_key(obj) {
                Some((key, Value::Array(items))) => {
                    run.process_collection(items, &sanitize_identifier(key), key);
                }
                Some((key, Value::Object(inner))) => {
                    run.process_object(inner, &sanitize_identifier(key), key, None, 0);
                }
                _ => run.process_object(obj, &root, "", None, 0),
            },
            Value::Array(items) => run.process_collection(items, &root, ""),
            Value::Null => return Err(ImportError::UnsupportedRoot("null".to_string())),
            Value::Bool(_) => return Err(ImportError::UnsupportedRoot("boolean".to_string())),
            Value::Number(_) => return Err(ImportError::UnsupportedRoot("number".to_string())),
            Value::String(_) => return Err(ImportError::UnsupportedRoot("string".to_string())),
        }

        let normalized = run.finish();
        info!(
            tables = normalized.tables.len(),
            relationships = normalized.relationships.len(),
            rows = normalized.tables.iter().map(|t| t.rows.len()).sum::<usize>(),
            "Normalized JSON document"
        );
        Ok(normalized)
    }
}

/// Normalize with a one-off [`Normalizer`]
pub fn normalize(
    data: &Value,
    root_table_name: &str,
    options: &NormalizationOptions,
) -> ImportResult<NormalizedData> {
    Normalizer::new(options.clone()).normalize(data, root_table_name)
}

fn unwrap_single_key(obj: &Map<String, Value>) -> Option<(&String, &Value)> {
    if obj.len() != 1 {
        return None;
    }
    let (key, value) = obj.iter().next()?;
    match value {
        Value::Object(_) => Some((key, value)),
        Value::Array(items) if ArrayKind::of(items) == ArrayKind::Objects => Some((key, value)),
        _ => None,
    }
}

/// Whether an object holds an array at any depth
fn contains_array(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(obj) => obj.values().any(contains_array),
        _ => false,
    }
}

struct ParentLink {
    table: String,
    row_id: Value,
}

enum ChildKind<'a> {
    Object(&'a Map<String, Value>),
    Objects(&'a [Value]),
    Scalars(&'a [Value]),
}

struct Child<'a> {
    table: String,
    path: String,
    kind: ChildKind<'a>,
}

/// A value bound for a column of the row being built
struct Cell {
    column: JsonColumn,
    value: Value,
}

/// Mutable state of a single normalization run
struct NormalizationRun<'o> {
    options: &'o NormalizationOptions,
    tables: Vec<JsonTable>,
    index: HashMap<String, usize>,
    relationships: Vec<ForeignKeyRelationship>,
    linked: HashSet<(String, String)>,
    /// Table name chosen for each (parent, derived name) pair
    names: HashMap<(Option<String>, String), String>,
    taken: HashSet<String>,
    ids: RowIdAllocator,
}

impl<'o> NormalizationRun<'o> {
    fn new(options: &'o NormalizationOptions) -> Self {
        NormalizationRun {
            options,
            tables: Vec::new(),
            index: HashMap::new(),
            relationships: Vec::new(),
            linked: HashSet::new(),
            names: HashMap::new(),
            taken: HashSet::new(),
            ids: RowIdAllocator::new(options.row_ids),
        }
    }

    fn finish(self) -> NormalizedData {
        NormalizedData {
            tables: self.tables,
            relationships: self.relationships,
        }
    }

    /// Name of the table fed by `parent` under a derived name.
    ///
    /// Derived names are not unique across parents (`a`.`b_c` and `a_b`.`c`
    /// both give `a_b_c`), so a name already owned by another parent gets a
    /// numeric suffix. The same pair always resolves to the same table.
    fn resolve_table(&mut self, name: &str, parent: Option<&str>) -> String {
        let key = (parent.map(str::to_string), name.to_string());
        if let Some(resolved) = self.names.get(&key) {
            return resolved.clone();
        }

        let mut resolved = name.to_string();
        let mut suffix = 2;
        while self.taken.contains(&resolved) {
            resolved = format!("{}_{}", name, suffix);
            suffix += 1;
        }
        if resolved != name {
            debug!(table = %resolved, derived = %name, parent = ?parent, "Renamed colliding table");
        }

        self.taken.insert(resolved.clone());
        self.names.insert(key, resolved.clone());
        resolved
    }

    /// Get a table by name, creating it (and its relationship) on first use
    fn table_mut(&mut self, name: &str, parent: Option<&str>) -> &mut JsonTable {
        if let Some(parent) = parent {
            let key = (parent.to_string(), name.to_string());
            if !self.linked.contains(&key) {
                self.relationships.push(ForeignKeyRelationship::new(parent, name));
                self.linked.insert(key);
            }
        }

        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let mut table = JsonTable::new(name);
                table.parent = parent.map(str::to_string);
                self.tables.push(table);
                self.index.insert(name.to_string(), self.tables.len() - 1);
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx]
    }

    /// Rows of a root-level array
    fn process_collection(&mut self, items: &[Value], table: &str, path: &str) {
        for item in items {
            match item {
                Value::Object(obj) => self.process_object(obj, table, path, None, 0),
                other => self.push_value_row(table, path, other, None),
            }
        }
    }

    fn process_object(
        &mut self,
        obj: &Map<String, Value>,
        table: &str,
        path: &str,
        parent: Option<&ParentLink>,
        depth: usize,
    ) {
        let resolved = self.resolve_table(table, parent.map(|p| p.table.as_str()));
        let table = resolved.as_str();
        let row_id = self.ids.next(table);

        let mut cells = Vec::new();
        let mut children = Vec::new();
        self.flatten(obj, table, None, path, depth, &mut cells, &mut children);

        let mut row = Row::new();
        row.insert(ROW_ID_COLUMN.to_string(), row_id.clone());
        if let Some(link) = parent {
            row.insert(PARENT_ID_COLUMN.to_string(), link.row_id.clone());
        }

        let target = self.table_mut(table, parent.map(|p| p.table.as_str()));
        for cell in cells {
            target.record_value(&cell.column, &cell.value);
            row.insert(cell.column.name, cell.value);
        }
        target.push_row(row);

        let link = ParentLink {
            table: table.to_string(),
            row_id,
        };

        for child in children {
            match child.kind {
                ChildKind::Object(nested) => {
                    self.process_object(nested, &child.table, &child.path, Some(&link), depth + 1);
                }
                ChildKind::Objects(items) => {
                    for item in items {
                        if let Value::Object(nested) = item {
                            self.process_object(
                                nested,
                                &child.table,
                                &child.path,
                                Some(&link),
                                depth + 1,
                            );
                        }
                    }
                }
                ChildKind::Scalars(items) => {
                    for item in items {
                        self.push_value_row(&child.table, &child.path, item, Some(&link));
                    }
                }
            }
        }
    }

    /// Split an object's fields into cells of the current row and child tables
    #[allow(clippy::too_many_arguments)]
    fn flatten<'a>(
        &self,
        obj: &'a Map<String, Value>,
        table: &str,
        prefix: Option<&str>,
        path: &str,
        depth: usize,
        cells: &mut Vec<Cell>,
        children: &mut Vec<Child<'a>>,
    ) {
        let at_depth_limit = depth >= self.options.max_depth;

        for (key, value) in obj {
            let field_path = join_path(path, key);
            let column_name = flattened_column_name(prefix, key);
            let mut column = JsonColumn::new(column_name.clone(), field_path.clone());
            column.is_nested = prefix.is_some();

            match value {
                Value::Object(nested) => {
                    if at_depth_limit {
                        cells.push(Cell { column, value: value.clone() });
                    } else if self.should_promote(value, &field_path) {
                        let child_table = child_table_name(table, &column_name);
                        debug!(table = %child_table, path = %field_path, "Promoting nested object");
                        children.push(Child {
                            table: child_table,
                            path: field_path,
                            kind: ChildKind::Object(nested),
                        });
                    } else {
                        self.flatten(
                            nested,
                            table,
                            Some(&column_name),
                            &field_path,
                            depth,
                            cells,
                            children,
                        );
                    }
                }
                Value::Array(items) => match ArrayKind::of(items) {
                    ArrayKind::Empty => {}
                    ArrayKind::Objects if !at_depth_limit => children.push(Child {
                        table: child_table_name(table, &column_name),
                        path: field_path,
                        kind: ChildKind::Objects(items),
                    }),
                    ArrayKind::Scalars if !at_depth_limit => children.push(Child {
                        table: child_table_name(table, &column_name),
                        path: field_path,
                        kind: ChildKind::Scalars(items),
                    }),
                    _ => {
                        column.is_array = true;
                        cells.push(Cell { column, value: value.clone() });
                    }
                },
                scalar => cells.push(Cell { column, value: scalar.clone() }),
            }
        }
    }

    fn should_promote(&self, value: &Value, path: &str) -> bool {
        match self.options.strategy {
            NormalizationStrategy::Partial => contains_array(value),
            NormalizationStrategy::Full => true,
            NormalizationStrategy::Custom => self.options.custom_table_paths.contains(path),
        }
    }

    /// One row holding a single element of a scalar array
    fn push_value_row(&mut self, table: &str, path: &str, value: &Value, parent: Option<&ParentLink>) {
        let resolved = self.resolve_table(table, parent.map(|p| p.table.as_str()));
        let table = resolved.as_str();
        let mut row = Row::new();
        row.insert(ROW_ID_COLUMN.to_string(), self.ids.next(table));
        if let Some(link) = parent {
            row.insert(PARENT_ID_COLUMN.to_string(), link.row_id.clone());
        }

        let mut column = JsonColumn::new(VALUE_COLUMN, path);
        column.is_array = value.is_array();

        let target = self.table_mut(table, parent.map(|p| p.table.as_str()));
        target.record_value(&column, value);
        row.insert(VALUE_COLUMN.to_string(), value.clone());
        target.push_row(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(data: Value, options: NormalizationOptions) -> NormalizedData {
        Normalizer::new(options).normalize(&data, "root").unwrap()
    }

    fn column_names(table: &JsonTable) -> Vec<&str> {
        table.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_wrapper_array_unwrapped() {
        let data = run(
            json!({"items": [{"a": 1}, {"a": 2, "b": "x"}]}),
            NormalizationOptions::default(),
        );

        assert_eq!(data.tables.len(), 1);
        let items = &data.tables[0];
        assert_eq!(items.name, "items");
        assert_eq!(column_names(items), vec!["a", "b"]);
        assert_eq!(items.rows.len(), 2);
        assert!(items.infer_column("b").nullable);
        assert!(!items.infer_column("a").nullable);
    }

    #[test]
    fn test_scalar_array_junction() {
        let data = run(
            json!({"user": {"name": "Ann", "tags": ["x", "y"]}}),
            NormalizationOptions::default(),
        );

        assert_eq!(data.tables.len(), 2);
        let user = data.table("user").unwrap();
        assert_eq!(column_names(user), vec!["name"]);
        assert_eq!(user.rows.len(), 1);

        let tags = data.table("user_tags").unwrap();
        assert_eq!(column_names(tags), vec!["value"]);
        assert_eq!(tags.rows.len(), 2);
        let user_id = JsonTable::row_id(&user.rows[0]).unwrap();
        for row in &tags.rows {
            assert_eq!(JsonTable::parent_id(row), Some(user_id));
        }

        assert_eq!(
            data.relationships,
            vec![ForeignKeyRelationship::new("user", "user_tags")]
        );
        data.verify_references().unwrap();
    }

    #[test]
    fn test_partial_flattens_plain_objects() {
        let data = run(
            json!([{"name": "A", "address": {"city": "Oslo", "geo": {"lat": 1.0}}}]),
            NormalizationOptions::default(),
        );

        assert_eq!(data.tables.len(), 1);
        let root = &data.tables[0];
        assert_eq!(column_names(root), vec!["name", "address_city", "address_geo_lat"]);
        let city = root.column("address_city").unwrap();
        assert!(city.is_nested);
        assert_eq!(city.path, "address.city");
    }

    #[test]
    fn test_partial_promotes_objects_with_arrays() {
        let data = run(
            json!([{"name": "A", "profile": {"bio": "hi", "links": [{"url": "u"}]}}]),
            NormalizationOptions::default(),
        );

        let names: Vec<&str> = data.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["root", "root_profile", "root_profile_links"]);
        assert_eq!(data.relationships.len(), 2);
        data.verify_references().unwrap();
    }

    #[test]
    fn test_full_promotes_every_object() {
        let data = run(
            json!([{"name": "A", "address": {"city": "Oslo"}}]),
            NormalizationOptions::default().with_strategy(NormalizationStrategy::Full),
        );

        assert_eq!(data.tables.len(), 2);
        let address = data.table("root_address").unwrap();
        assert_eq!(address.parent.as_deref(), Some("root"));
        assert_eq!(column_names(address), vec!["city"]);
    }

    #[test]
    fn test_custom_promotes_selected_paths() {
        let doc = json!({"orders": [{"ship": {"city": "A"}, "bill": {"city": "B"}}]});
        let data = run(doc, NormalizationOptions::default().with_custom_paths(["orders.ship"]));

        let names: Vec<&str> = data.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "orders_ship"]);
        assert!(data.table("orders").unwrap().has_column("bill_city"));
    }

    #[test]
    fn test_children_accumulate_across_parents() {
        let data = run(
            json!([{"n": 1, "kids": [{"k": "a"}]}, {"n": 2, "kids": [{"k": "b"}, {"k": "c"}]}]),
            NormalizationOptions::default(),
        );

        let kids = data.table("root_kids").unwrap();
        assert_eq!(kids.rows.len(), 3);
        assert_eq!(JsonTable::parent_id(&kids.rows[2]), Some(&json!(2)));
        data.verify_references().unwrap();
    }

    #[test]
    fn test_mixed_arrays_stay_json() {
        let data = run(
            json!([{"mixed": [1, {"a": 2}], "grid": [[1, 2]], "none": []}]),
            NormalizationOptions::default(),
        );

        assert_eq!(data.tables.len(), 1);
        let root = &data.tables[0];
        assert_eq!(column_names(root), vec!["mixed", "grid"]);
        assert!(root.column("mixed").unwrap().is_array);
    }

    #[test]
    fn test_depth_limit_keeps_json() {
        let data = run(
            json!([{"a": {"list": [1, 2]}}]),
            NormalizationOptions::default().with_max_depth(0),
        );

        assert_eq!(data.tables.len(), 1);
        assert_eq!(data.tables[0].rows[0]["a"], json!({"list": [1, 2]}));
    }

    #[test]
    fn test_sanitized_names() {
        let data = run(json!([{"First Name": "A", "2nd": 1}]), NormalizationOptions::default());
        assert_eq!(column_names(&data.tables[0]), vec!["first_name", "_2nd"]);
    }

    #[test]
    fn test_reserved_source_keys_are_renamed() {
        let data = run(
            json!([
                {"_row_id": "dup", "_parent_id": 7, "kids": [{"k": 1}]},
                {"_row_id": "dup", "kids": [{"k": 2}]}
            ]),
            NormalizationOptions::default(),
        );

        let root = data.table("root").unwrap();
        assert_eq!(column_names(root), vec!["src__row_id", "src__parent_id"]);
        assert_eq!(JsonTable::row_id(&root.rows[1]), Some(&json!(2)));
        assert_eq!(root.rows[0]["src__parent_id"], json!(7));
        assert_eq!(JsonTable::parent_id(&root.rows[0]), None);
        data.verify_references().unwrap();
    }

    #[test]
    fn test_colliding_child_names_stay_apart() {
        let data = run(
            json!([{"a": {"b_c": ["x"], "b": {"c": ["y"], "y": [1]}}}]),
            NormalizationOptions::default(),
        );

        let from_a = data.table("root_a_b_c").unwrap();
        assert_eq!(from_a.parent.as_deref(), Some("root_a"));
        assert_eq!(from_a.rows.len(), 1);
        assert_eq!(from_a.rows[0]["value"], json!("x"));

        let from_b = data.table("root_a_b_c_2").unwrap();
        assert_eq!(from_b.parent.as_deref(), Some("root_a_b"));
        assert_eq!(from_b.rows[0]["value"], json!("y"));

        let mut children: Vec<&str> = data
            .relationships
            .iter()
            .map(|r| r.child_table.as_str())
            .collect();
        let total = children.len();
        children.sort();
        children.dedup();
        assert_eq!(children.len(), total);
        data.verify_references().unwrap();
    }

    #[test]
    fn test_scalar_root_rejected() {
        let err = Normalizer::new(NormalizationOptions::default())
            .normalize(&json!(42), "root")
            .unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedRoot(_)));
    }

    #[test]
    fn test_multi_key_root_is_single_row() {
        let data = run(json!({"a": 1, "b": [1, 2]}), NormalizationOptions::default());
        assert_eq!(data.tables[0].name, "root");
        assert_eq!(data.tables[0].rows.len(), 1);
        assert_eq!(data.table("root_b").unwrap().rows.len(), 2);
    }
}
