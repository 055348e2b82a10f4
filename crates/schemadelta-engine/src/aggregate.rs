//! Delta aggregator
//!
//! Folds the table and column results of a run into one [`DeltaResult`].

use crate::column_diff::ColumnDiff;
use indexmap::IndexMap;
use schemadelta_core::{
    DeltaOutcome, DeltaResult, JoinTableSchema, SchemaDelta, SkippedColumn, TableDelta,
};

/// Everything one run produced, before aggregation
#[derive(Debug, Clone, Default)]
pub struct RunParts {
    pub tables: TableDelta,
    pub join_tables: TableDelta,
    pub column_diffs: Vec<ColumnDiff>,
    pub join_schemas: Vec<JoinTableSchema>,
}

/// Combine the parts of a run into its result
///
/// Column deltas without changes are dropped. Skipped columns are
/// deduplicated by table and column; a duplicate marks a conflict if any of
/// its occurrences did.
pub fn aggregate(parts: RunParts) -> DeltaResult {
    let mut columns = Vec::new();
    let mut skipped: IndexMap<(String, String), SkippedColumn> = IndexMap::new();

    for diff in parts.column_diffs {
        for column in diff.skipped {
            let key = (column.table_name.clone(), column.column.clone());
            let conflict = column.schema_conflict;
            skipped
                .entry(key)
                .and_modify(|seen| seen.schema_conflict |= conflict)
                .or_insert(column);
        }

        if !diff.delta.is_empty() {
            columns.push(diff.delta);
        }
    }

    let delta = SchemaDelta {
        tables: parts.tables,
        join_tables: parts.join_tables,
        columns,
    };
    let skipped_columns: Vec<SkippedColumn> = skipped.into_values().collect();

    let outcome = classify(&delta, &skipped_columns);

    DeltaResult {
        outcome,
        delta,
        join_schemas: parts.join_schemas,
        skipped_columns,
    }
}

/// Ternary outcome of a run
///
/// Conflicts only matter when there is something to change.
pub fn classify(delta: &SchemaDelta, skipped: &[SkippedColumn]) -> DeltaOutcome {
    if delta.is_empty() {
        DeltaOutcome::NoChange
    } else if skipped.iter().any(|c| c.schema_conflict) {
        DeltaOutcome::ChangesWithConflict
    } else {
        DeltaOutcome::Changes
    }
}
