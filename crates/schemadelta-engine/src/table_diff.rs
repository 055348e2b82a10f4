//! Table differ: which tables must be created, which already exist

use schemadelta_core::TableDelta;

/// Outcome of probing one group of tables (regular or join)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDiff {
    pub delta: TableDelta,

    /// Tables that exist and need a column diff, in input order
    pub existing: Vec<String>,
}

/// Split tables by their existence answers
///
/// `exists` holds one answer per table, in the same order.
pub fn diff_tables(tables: &[String], exists: &[bool]) -> TableDiff {
    let mut diff = TableDiff::default();

    for (table, present) in tables.iter().zip(exists) {
        if *present {
            diff.existing.push(table.clone());
        } else {
            tracing::debug!(%table, "table is absent, scheduling creation");
            diff.delta.create.push(table.clone());
        }
    }

    diff
}
