//! Table matching - reconcile normalized tables with an existing schema
//!
//! Tables pair up by exact name first, then by a loose name heuristic.
//! Columns of a paired table pair up the same way and are checked for type
//! compatibility. Nothing here performs I/O.

pub mod compat;
pub mod names;
pub mod table_matcher;
pub mod types;

pub use compat::{normalize_type, types_compatible};
pub use names::{normalize_name, ContainmentMatcher, NameMatcher};
pub use table_matcher::{analyze_columns, match_tables, TableMatcher};
pub use types::{
    ColumnAnalysis, ColumnConflict, ColumnMatch, ConflictResolution, ExistingColumn,
    ExistingTableSchema, ImportStatus, MatchType, TableMatchResult, TableOverride,
};
