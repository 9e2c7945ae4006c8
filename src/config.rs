use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};
use crate::matcher::TableOverride;
use crate::normalize::NormalizationOptions;
use crate::sql::GeneratorOptions;

/// Settings for one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Table name for a root array or an object that is not unwrapped
    pub root_table_name: String,
    /// Target database schema
    pub schema: String,
    pub normalization: NormalizationOptions,
    pub generation: GeneratorOptions,
    /// Reviewer decisions, keyed by import table name
    pub overrides: HashMap<String, TableOverride>,
    /// Row indices to import per table; tables without an entry import every row
    pub selected_rows: HashMap<String, Vec<usize>>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            root_table_name: "root".to_string(),
            schema: "public".to_string(),
            normalization: NormalizationOptions::default(),
            generation: GeneratorOptions::default(),
            overrides: HashMap::new(),
            selected_rows: HashMap::new(),
        }
    }
}

impl ImportConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ImportError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ImportError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
