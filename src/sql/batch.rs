//! INSERT batch sizing

/// Hard per-statement bind parameter limit of PostgreSQL
pub const MAX_PARAMETERS: usize = 65_535;

/// Ceiling on `columns x rows` per INSERT, well below [`MAX_PARAMETERS`]
pub const SAFE_PARAMETER_LIMIT: usize = 30_000;

/// Ceiling on rows per INSERT, so that statements stay reviewable
pub const MAX_ROWS_PER_BATCH: usize = 500;

/// Tables up to this size are split into at most two statements
pub const SMALL_TABLE_ROWS: usize = 50;

/// Rows per INSERT statement for a table.
///
/// Never exceeds `total_rows`, and is 0 only when there are no rows.
pub fn calculate_batch_size(column_count: usize, total_rows: usize) -> usize {
    if total_rows == 0 {
        return 0;
    }

    let by_parameters = (SAFE_PARAMETER_LIMIT / column_count.max(1)).max(1);
    let size = by_parameters.min(MAX_ROWS_PER_BATCH);

    if total_rows <= SMALL_TABLE_ROWS {
        size.min(total_rows)
    } else if total_rows <= MAX_ROWS_PER_BATCH {
        size.min(total_rows.div_ceil(2)).max(SMALL_TABLE_ROWS.min(size))
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_rows() {
        assert!(calculate_batch_size(10, 5) <= 5);
        assert_eq!(calculate_batch_size(10, 5), 5);
        assert_eq!(calculate_batch_size(3, 1), 1);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(calculate_batch_size(10, 0), 0);
        assert_eq!(calculate_batch_size(0, 10), 10);
        assert_eq!(calculate_batch_size(0, 0), 0);
    }

    #[test]
    fn test_parameter_ceiling() {
        assert_eq!(calculate_batch_size(100, 10_000), 300);
        assert_eq!(calculate_batch_size(1, 10_000), MAX_ROWS_PER_BATCH);
        assert_eq!(calculate_batch_size(40_000, 10_000), 1);

        for columns in [1, 7, 60, 250, 1_000] {
            let size = calculate_batch_size(columns, 100_000);
            assert!(size * columns <= SAFE_PARAMETER_LIMIT.max(columns));
        }
    }

    #[test]
    fn test_medium_tables_split() {
        assert_eq!(calculate_batch_size(5, 200), 100);
        assert_eq!(calculate_batch_size(5, 60), 50);
    }
}
