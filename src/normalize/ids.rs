//! Per-run row id allocation

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use super::types::RowIdMode;

/// Mints `_row_id` values for one normalization run.
///
/// Counters are kept per table and live only as long as the allocator, so
/// two runs never share state.
#[derive(Debug)]
pub struct RowIdAllocator {
    mode: RowIdMode,
    counters: HashMap<String, u64>,
}

impl RowIdAllocator {
    pub fn new(mode: RowIdMode) -> Self {
        RowIdAllocator {
            mode,
            counters: HashMap::new(),
        }
    }

    pub fn next(&mut self, table: &str) -> Value {
        match self.mode {
            RowIdMode::Sequential => {
                let counter = self.counters.entry(table.to_string()).or_insert(0);
                *counter += 1;
                Value::from(*counter)
            }
            RowIdMode::Uuid => Value::String(Uuid::new_v4().to_string()),
        }
    }
}
