//! JSON normalization - decompose nested JSON into relational tables
//!
//! Every object becomes a row with a `_row_id` surrogate key. Scalars become
//! columns, nested objects are flattened or promoted to child tables according
//! to the [`NormalizationStrategy`], and arrays become child tables linked back
//! to their parent row through `_parent_id`.

pub mod ids;
pub mod naming;
pub mod normalizer;
pub mod types;

pub use ids::RowIdAllocator;
pub use naming::{sanitize_identifier, MAX_IDENTIFIER_LENGTH};
pub use normalizer::{normalize, Normalizer, VALUE_COLUMN};
pub use types::{
    row_key, ArrayKind, ForeignKeyRelationship, JsonColumn, JsonTable, NormalizationOptions,
    NormalizationStrategy, NormalizedData, Row, RowIdMode, IDENTITY_COLUMN, PARENT_ID_COLUMN,
    ROW_ID_COLUMN, SOURCE_ID_COLUMN,
};
