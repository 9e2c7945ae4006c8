//! SQL generation - emit an ordered PostgreSQL import script
//!
//! Statements are plain text; nothing here opens a connection. Row ids are
//! remapped to UUIDs once per run so that every `_parent_id` resolves to
//! its parent's final id.

pub mod batch;
pub mod format;
pub mod generator;
pub mod ids;
pub mod statement;

pub use batch::{calculate_batch_size, MAX_PARAMETERS, MAX_ROWS_PER_BATCH, SAFE_PARAMETER_LIMIT};
pub use format::{format_value, qualified_name, quote_identifier, quote_literal};
pub use generator::{generate_smart_import_sql, GeneratorOptions, ImportContext, PRIMARY_KEY_COLUMN};
pub use ids::{remap_id, IdRemapper};
pub use statement::{SqlStatement, StatementType};
