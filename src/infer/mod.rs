//! Column type inference
//!
//! Infers a PostgreSQL column type and nullability from sampled JSON values,
//! and casts individual values with the same predicates.

pub mod cast;
pub mod column;
pub mod patterns;

pub use cast::{attempt_cast, CastOutcome, CastingRule};
pub use column::{infer_column_type, ColumnType, ColumnTypeInference};
