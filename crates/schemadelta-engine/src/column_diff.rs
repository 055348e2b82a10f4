//! Column differ for one existing table
//!
//! Both sides are reduced to [`CanonicalKind`] before anything is compared.
//! Live columns whose native type has no canonical kind are set aside as
//! skipped columns and take no further part in the diff.

use indexmap::IndexMap;
use schemadelta_catalog::NativeColumns;
use schemadelta_core::{
    alias_of, CanonicalKind, ColumnDelta, DroppedColumn, IntermediateKind, KindChange, Mode,
    SkippedColumn,
};

/// Column changes and skipped columns for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDiff {
    pub delta: ColumnDelta,
    pub skipped: Vec<SkippedColumn>,
}

impl ColumnDiff {
    /// Compare the live columns of a table with what its model declares
    ///
    /// Creations are always computed. Alterations and drops are computed only
    /// under [`Mode::Alter`]. `retained` names a live column that is never
    /// dropped even though the model does not declare it (the implicit
    /// identity column of regular tables).
    pub fn compute(
        table: &str,
        db_columns: &NativeColumns,
        model_columns: &IndexMap<String, IntermediateKind>,
        mode: Mode,
        retained: Option<&str>,
    ) -> Self {
        let mut skipped = Vec::new();
        let mut live: IndexMap<&str, CanonicalKind> = IndexMap::new();

        for (column, native) in db_columns {
            match alias_of(native) {
                Ok(kind) => {
                    live.insert(column.as_str(), kind);
                }
                Err(_) => skipped.push(SkippedColumn {
                    table_name: table.to_string(),
                    column: column.clone(),
                    native_type: native.clone(),
                    schema_conflict: model_columns.contains_key(column),
                }),
            }
        }

        // A declared field that collides with a skipped column is left alone
        let declared: IndexMap<&str, CanonicalKind> = model_columns
            .iter()
            .filter(|(name, _)| !skipped.iter().any(|s| &s.column == *name))
            .map(|(name, kind)| (name.as_str(), kind.to_canonical()))
            .collect();

        let mut delta = ColumnDelta::new(table);

        delta.create = declared
            .keys()
            .filter(|name| !live.contains_key(*name))
            .map(|name| name.to_string())
            .collect();

        if mode.computes_alterations() {
            for (name, declared_kind) in &declared {
                if let Some(live_kind) = live.get(name) {
                    if live_kind != declared_kind {
                        delta.alter.insert(
                            name.to_string(),
                            KindChange(live_kind.to_intermediate(), declared_kind.to_intermediate()),
                        );
                    }
                }
            }

            for (name, live_kind) in &live {
                if !declared.contains_key(name) && retained != Some(*name) {
                    delta.drop.push(DroppedColumn {
                        column_name: name.to_string(),
                        column_type: live_kind.to_intermediate(),
                    });
                }
            }
        }

        for column in &skipped {
            tracing::warn!(
                table,
                column = %column.column,
                native_type = %column.native_type,
                conflict = column.schema_conflict,
                "skipping column with unsupported type"
            );
        }

        Self { delta, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn live(columns: &[(&str, &str)]) -> NativeColumns {
        columns
            .iter()
            .map(|(name, native)| (name.to_string(), native.to_string()))
            .collect()
    }

    fn declared(columns: &[(&str, IntermediateKind)]) -> IndexMap<String, IntermediateKind> {
        columns
            .iter()
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect()
    }

    fn person_model() -> IndexMap<String, IntermediateKind> {
        declared(&[
            ("id", IntermediateKind::Integer),
            ("firstName", IntermediateKind::String),
        ])
    }

    #[test]
    fn test_no_difference() {
        let db = live(&[("id", "integer"), ("firstName", "varchar(255)")]);
        let diff = ColumnDiff::compute("Person", &db, &person_model(), Mode::Alter, None);

        assert!(diff.delta.is_empty());
        assert!(diff.skipped.is_empty());
    }

    #[test]
    fn test_unsupported_column_is_skipped() {
        let db = live(&[("id", "int4"), ("firstName", "varchar"), ("weirdo", "polygon")]);
        let diff = ColumnDiff::compute("Person", &db, &person_model(), Mode::Create, None);

        assert!(diff.delta.is_empty());
        assert_eq!(
            diff.skipped,
            vec![SkippedColumn {
                table_name: "Person".to_string(),
                column: "weirdo".to_string(),
                native_type: "polygon".to_string(),
                schema_conflict: false,
            }]
        );
    }

    #[test]
    fn test_conflicting_column_is_neither_created_nor_altered() {
        let db = live(&[("id", "integer"), ("firstName", "polygon")]);
        let diff = ColumnDiff::compute("Person", &db, &person_model(), Mode::Alter, None);

        assert!(diff.delta.is_empty());
        assert_eq!(diff.skipped.len(), 1);
        assert!(diff.skipped[0].schema_conflict);
    }

    #[test]
    fn test_missing_columns_are_created_in_model_order() {
        let model = declared(&[
            ("id", IntermediateKind::Integer),
            ("name", IntermediateKind::String),
            ("bio", IntermediateKind::Text),
        ]);
        let db = live(&[("id", "integer")]);
        let diff = ColumnDiff::compute("Dog", &db, &model, Mode::Create, None);

        assert_eq!(diff.delta.create, vec!["name", "bio"]);
    }

    #[test]
    fn test_create_mode_computes_no_alterations() {
        let db = live(&[("id", "bigint"), ("firstName", "text"), ("legacy", "date")]);
        let diff = ColumnDiff::compute("Person", &db, &person_model(), Mode::Create, None);

        assert!(diff.delta.create.is_empty());
        assert!(diff.delta.alter.is_empty());
        assert!(diff.delta.drop.is_empty());
    }

    #[test]
    fn test_alter_mode_reports_changes_in_intermediate_kinds() {
        let db = live(&[("id", "bigint"), ("firstName", "text"), ("legacy", "date")]);
        let diff = ColumnDiff::compute("Person", &db, &person_model(), Mode::Alter, None);

        assert_eq!(
            diff.delta.alter.get("id"),
            Some(&KindChange(IntermediateKind::BigInteger, IntermediateKind::Integer))
        );
        assert_eq!(
            diff.delta.alter.get("firstName"),
            Some(&KindChange(IntermediateKind::Text, IntermediateKind::String))
        );
        assert_eq!(
            diff.delta.drop,
            vec![DroppedColumn {
                column_name: "legacy".to_string(),
                column_type: IntermediateKind::Date,
            }]
        );
    }

    #[test]
    fn test_dialect_spellings_of_the_same_kind_match() {
        let model = declared(&[
            ("at", IntermediateKind::DateTime),
            ("flag", IntermediateKind::Boolean),
            ("doc", IntermediateKind::Json),
        ]);
        let db = live(&[("at", "timestamp with time zone"), ("flag", "bool"), ("doc", "jsonb")]);
        let diff = ColumnDiff::compute("Event", &db, &model, Mode::Alter, None);

        assert!(diff.delta.is_empty());
    }

    #[test]
    fn test_retained_column_is_not_dropped() {
        let model = declared(&[("name", IntermediateKind::String)]);
        let db = live(&[("id", "integer"), ("name", "varchar"), ("old", "text")]);
        let diff = ColumnDiff::compute("Dog", &db, &model, Mode::Alter, Some("id"));

        assert_eq!(
            diff.delta
                .drop
                .iter()
                .map(|d| d.column_name.as_str())
                .collect::<Vec<_>>(),
            vec!["old"]
        );
    }
}
