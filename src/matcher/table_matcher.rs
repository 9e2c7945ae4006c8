//! Reconcile normalized tables against an existing database schema

use std::collections::HashSet;

use tracing::debug;

use super::compat::types_compatible;
use super::names::{normalize_name, ContainmentMatcher, NameMatcher};
use super::types::{
    ColumnAnalysis, ColumnConflict, ColumnMatch, ConflictResolution, ExistingTableSchema,
    ImportStatus, MatchType, TableMatchResult,
};
use crate::normalize::{JsonTable, IDENTITY_COLUMN};

/// Score multiplier for tables matched by a loose name
const FUZZY_TABLE_DISCOUNT: f64 = 0.8;

/// Matches import tables to existing tables by name, then columns by name and type
pub struct TableMatcher {
    name_matcher: Box<dyn NameMatcher>,
}

impl TableMatcher {
    /// Create a matcher with the default containment heuristic for table names
    pub fn new() -> Self {
        Self {
            name_matcher: Box::new(ContainmentMatcher::default()),
        }
    }

    /// Create a matcher with a custom table name heuristic
    pub fn with_name_matcher(name_matcher: impl NameMatcher + 'static) -> Self {
        Self {
            name_matcher: Box::new(name_matcher),
        }
    }

    /// Match every import table, in order
    pub fn match_tables(
        &self,
        import_tables: &[JsonTable],
        existing: &[ExistingTableSchema],
    ) -> Vec<TableMatchResult> {
        import_tables
            .iter()
            .map(|table| self.match_table(table, existing))
            .collect()
    }

    pub fn match_table(
        &self,
        table: &JsonTable,
        existing: &[ExistingTableSchema],
    ) -> TableMatchResult {
        // Phase 1: case-insensitive name
        let exact = existing
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(&table.name));

        // Phase 2: loose name
        let (target, fuzzy) = match exact {
            Some(target) => (target, false),
            None => match existing
                .iter()
                .find(|e| self.name_matcher.is_match(&table.name, &e.name))
            {
                Some(target) => (target, true),
                None => {
                    debug!(table = %table.name, "No existing table matches");
                    return TableMatchResult::new_table(&table.name);
                }
            },
        };

        let analysis = analyze_columns(table, target);
        let score = if fuzzy {
            analysis.score * FUZZY_TABLE_DISCOUNT
        } else {
            analysis.score
        };
        let match_score = score.round().clamp(0.0, 100.0) as u32;

        let match_type = if match_score == 100 {
            MatchType::Exact
        } else if match_score > 0 {
            MatchType::Partial
        } else {
            MatchType::NameOnly
        };
        let status = if analysis.conflicts.is_empty() {
            ImportStatus::Insert
        } else {
            ImportStatus::Conflict
        };

        debug!(
            table = %table.name,
            existing = %target.name,
            fuzzy,
            score = match_score,
            conflicts = analysis.conflicts.len(),
            "Matched table"
        );

        TableMatchResult {
            import_table: table.name.clone(),
            match_type,
            existing_table: Some(target.name.clone()),
            match_score,
            column_matches: analysis.column_matches,
            conflicts: analysis.conflicts,
            missing_columns: analysis.missing_columns,
            extra_columns: analysis.extra_columns,
            status,
        }
    }
}

impl Default for TableMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Match import tables against existing tables with the default heuristics
pub fn match_tables(
    import_tables: &[JsonTable],
    existing: &[ExistingTableSchema],
) -> Vec<TableMatchResult> {
    TableMatcher::new().match_tables(import_tables, existing)
}

/// Pair the data columns of an import table with the columns of an existing table.
///
/// Each existing column pairs with at most one import column. The existing
/// `id` column receives remapped row ids and never pairs with a data column.
/// Types of import columns are inferred from every row of the table.
pub fn analyze_columns(table: &JsonTable, existing: &ExistingTableSchema) -> ColumnAnalysis {
    let mut used: HashSet<usize> = existing
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name.eq_ignore_ascii_case(IDENTITY_COLUMN))
        .map(|(idx, _)| idx)
        .collect();
    let mut column_matches = Vec::new();
    let mut conflicts = Vec::new();
    let mut missing_columns = Vec::new();
    let mut compatible = 0usize;
    let mut import_count = 0usize;

    for column in table.data_columns() {
        import_count += 1;

        let exact = existing
            .columns
            .iter()
            .enumerate()
            .find(|(idx, c)| !used.contains(idx) && c.name.eq_ignore_ascii_case(&column.name));
        let (found, fuzzy) = match exact {
            Some(found) => (Some(found), false),
            None => {
                let wanted = normalize_name(&column.name);
                let loose = existing.columns.iter().enumerate().find(|(idx, c)| {
                    !used.contains(idx) && !wanted.is_empty() && normalize_name(&c.name) == wanted
                });
                (loose, true)
            }
        };

        let Some((idx, existing_column)) = found else {
            missing_columns.push(column.name.clone());
            continue;
        };
        used.insert(idx);

        let import_type = table.infer_column(&column.name).inferred_type;
        let type_match = types_compatible(import_type, &existing_column.data_type);
        if type_match {
            compatible += 1;
        } else {
            conflicts.push(ColumnConflict {
                column: column.name.clone(),
                existing_column: existing_column.name.clone(),
                import_type,
                existing_type: existing_column.data_type.clone(),
                resolution: ConflictResolution::default(),
            });
        }

        column_matches.push(ColumnMatch {
            import_column: column.name.clone(),
            existing_column: existing_column.name.clone(),
            import_type,
            existing_type: existing_column.data_type.clone(),
            type_match,
            fuzzy,
        });
    }

    let extra_columns = existing
        .columns
        .iter()
        .enumerate()
        .filter(|(idx, c)| !used.contains(idx) && !c.name.eq_ignore_ascii_case(IDENTITY_COLUMN))
        .map(|(_, c)| c.name.clone())
        .collect();

    let score = if import_count == 0 {
        100.0
    } else {
        compatible as f64 * 100.0 / import_count as f64
    };

    ColumnAnalysis {
        column_matches,
        conflicts,
        missing_columns,
        extra_columns,
        score,
    }
}
