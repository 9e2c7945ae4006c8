//! Error types for the import pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning a JSON document into SQL
#[derive(Error, Debug)]
pub enum ImportError {
    /// Malformed JSON input
    #[error("Failed to parse JSON document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document root is a scalar, so there is nothing to tabulate
    #[error("Unsupported document root: expected an object or array, found {0}")]
    UnsupportedRoot(String),

    /// A child row points at a parent row that does not exist
    #[error("Table '{table}' references missing row '{parent_id}' in parent table '{parent_table}'")]
    BrokenReference {
        table: String,
        parent_table: String,
        parent_id: String,
    },

    /// Invalid or unreadable configuration
    #[error("Invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
