//! Final row identifiers

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use uuid::Uuid;

use crate::infer::patterns::{is_object_id_str, is_uuid_str};
use crate::normalize::{row_key, JsonTable};

/// Final id for a row's source identifier: UUIDs pass through, document-store
/// object ids and everything else are replaced by a fresh v4 UUID
pub fn remap_id(original: Option<&Value>) -> String {
    match original {
        Some(Value::String(s)) if is_uuid_str(s) => s.trim().to_string(),
        Some(Value::String(s)) if is_object_id_str(s) => Uuid::new_v4().to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

/// Original-to-final id mapping for every table of one generation run.
///
/// Keys are the rows' `_row_id` values, which is what child rows carry in
/// `_parent_id`.
#[derive(Debug, Default)]
pub struct IdRemapper {
    tables: HashMap<String, HashMap<String, String>>,
}

impl IdRemapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a final id to every row of the table
    pub fn remap_table(&mut self, table: &JsonTable) {
        let mut seen: HashSet<String> = HashSet::with_capacity(table.rows.len());
        let mut ids: HashMap<String, String> = HashMap::with_capacity(table.rows.len());

        for row in &table.rows {
            let Some(row_id) = JsonTable::row_id(row) else {
                continue;
            };
            let mut final_id = remap_id(JsonTable::source_id(row));
            if !seen.insert(final_id.clone()) {
                tracing::debug!(table = %table.name, id = %final_id, "Duplicate id, minting a new one");
                final_id = Uuid::new_v4().to_string();
                seen.insert(final_id.clone());
            }
            ids.insert(row_key(row_id), final_id);
        }

        self.tables.insert(table.name.clone(), ids);
    }

    /// Final id of a row, looked up by its `_row_id`
    pub fn final_id(&self, table: &str, row_id: &Value) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|ids| ids.get(&row_key(row_id)))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Row;
    use serde_json::json;

    fn table(rows: Vec<Value>) -> JsonTable {
        let mut table = JsonTable::new("items");
        for row in rows {
            let row: Row = serde_json::from_value(row).unwrap();
            table.push_row(row);
        }
        table
    }

    #[test]
    fn test_remap_id_classification() {
        let uuid = "6f1c2f0e-6a1b-4c1d-9e2f-3a4b5c6d7e8f";
        assert_eq!(remap_id(Some(&json!(uuid))), uuid);

        let object_id = "507f1f77bcf86cd799439011";
        let remapped = remap_id(Some(&json!(object_id)));
        assert_ne!(remapped, object_id);
        assert!(is_uuid_str(&remapped));

        assert!(is_uuid_str(&remap_id(Some(&json!(42)))));
        assert!(is_uuid_str(&remap_id(None)));
    }

    #[test]
    fn test_remap_table_uses_source_identity() {
        let uuid = "6f1c2f0e-6a1b-4c1d-9e2f-3a4b5c6d7e8f";
        let mut remapper = IdRemapper::new();
        remapper.remap_table(&table(vec![
            json!({"_row_id": 1, "id": uuid}),
            json!({"_row_id": 2, "_id": "507f1f77bcf86cd799439011"}),
        ]));

        assert_eq!(remapper.final_id("items", &json!(1)), Some(uuid));
        let second = remapper.final_id("items", &json!(2)).unwrap();
        assert!(is_uuid_str(second));
        assert_eq!(remapper.final_id("items", &json!(3)), None);
        assert_eq!(remapper.final_id("other", &json!(1)), None);
    }

    #[test]
    fn test_duplicate_final_ids() {
        let uuid = "6f1c2f0e-6a1b-4c1d-9e2f-3a4b5c6d7e8f";
        let mut remapper = IdRemapper::new();
        remapper.remap_table(&table(vec![
            json!({"_row_id": 1, "id": uuid}),
            json!({"_row_id": 2, "id": uuid}),
        ]));

        assert_eq!(remapper.final_id("items", &json!(1)), Some(uuid));
        assert_ne!(remapper.final_id("items", &json!(2)), Some(uuid));
    }
}
