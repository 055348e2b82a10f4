//! Join table resolver
//!
//! Many-to-many relations name a join table through which they run. The same
//! join table is usually declared from both sides, so contributions are
//! collected per relation and then merged into one schema per table name.
//!
//! Resolution happens in two steps. [`collect_contributions`] runs before
//! any database access and compiles explicit join models, so their
//! unsupported field types are reported together with the regular models'.
//! [`resolve_join_tables`] runs once the live columns of existing join tables
//! are known.

use crate::compiler::compile_model;
use indexmap::IndexMap;
use schemadelta_catalog::NativeColumns;
use schemadelta_core::{
    alias_of, IntermediateKind, JoinTableSchema, ModelSchema, TableSchema, UnsupportedFields,
};
use std::collections::{HashMap, HashSet};

/// Kind given to extra join fields whose type nothing else determines
pub const DEFAULT_EXTRA_KIND: IntermediateKind = IntermediateKind::Json;

/// Kind forced onto the two foreign-key columns of a synthesized join table
pub const FOREIGN_KEY_KIND: IntermediateKind = IntermediateKind::Integer;

/// What one relation says about its join table
#[derive(Debug, Clone, PartialEq)]
pub enum JoinSource {
    /// An explicit join model, already compiled
    Model(TableSchema),

    /// Derived from the relation's column references and extra fields
    Synthesized {
        from_column: String,
        to_column: String,
        extra: Vec<String>,
    },
}

/// One relation's contribution to a join table
#[derive(Debug, Clone, PartialEq)]
pub struct JoinContribution {
    pub table: String,

    /// Model whose relation declared it
    pub declared_by: String,

    pub source: JoinSource,
}

impl JoinContribution {
    /// Build this contribution's schema against the live columns of the table
    ///
    /// `live` is empty when the join table does not exist yet.
    pub fn schema(&self, live: &NativeColumns) -> JoinTableSchema {
        match &self.source {
            // Declared fields stay even when the live column is unrecognized,
            // so the column differ can flag the conflict
            JoinSource::Model(compiled) => {
                let mut schema = JoinTableSchema::new(&self.table);
                schema.columns = compiled.columns.clone();
                schema
            }
            JoinSource::Synthesized {
                from_column,
                to_column,
                extra,
            } => {
                let mut schema = JoinTableSchema::new(&self.table)
                    .with_column(from_column.clone(), FOREIGN_KEY_KIND)
                    .with_column(to_column.clone(), FOREIGN_KEY_KIND);

                for field in extra {
                    let kind = live
                        .get(field)
                        .and_then(|native| alias_of(native).ok())
                        .map(|canonical| canonical.to_intermediate())
                        .unwrap_or(DEFAULT_EXTRA_KIND);
                    schema.columns.entry(field.clone()).or_insert(kind);
                }
                schema
            }
        }
    }
}

/// Gather every join table contribution, in model then relation order
///
/// Relations without a through clause are skipped. A through table that is
/// also declared as a regular model is left to that model. Explicit join
/// models are compiled here; all of their unsupported-type errors are
/// returned together, each scoped to its join table.
pub fn collect_contributions(
    models: &[&ModelSchema],
) -> Result<Vec<JoinContribution>, Vec<UnsupportedFields>> {
    let regular: HashSet<&str> = models.iter().map(|m| m.table_name.as_str()).collect();
    let mut contributions = Vec::new();
    let mut errors = Vec::new();

    for model in models {
        for (relation, through) in model.through_relations() {
            if regular.contains(through.table.as_str()) {
                tracing::debug!(
                    table = %through.table,
                    relation = %relation.name,
                    "join table is also a regular model, treating it as regular"
                );
                continue;
            }

            let source = match &through.model {
                Some(join_model) => match compile_model(join_model) {
                    Ok(compiled) => JoinSource::Model(compiled),
                    Err(err) => {
                        errors.push(err);
                        continue;
                    }
                },
                None => {
                    let (Some((_, from_column)), Some((_, to_column))) =
                        (through.from.split(), through.to.split())
                    else {
                        // validate() rejects these before we get here
                        continue;
                    };
                    JoinSource::Synthesized {
                        from_column: from_column.to_string(),
                        to_column: to_column.to_string(),
                        extra: through.extra.clone(),
                    }
                }
            };

            contributions.push(JoinContribution {
                table: through.table.clone(),
                declared_by: model.table_name.clone(),
                source,
            });
        }
    }

    if errors.is_empty() {
        Ok(contributions)
    } else {
        Err(errors)
    }
}

/// Distinct join table names, in first-declared order
pub fn join_table_names(contributions: &[JoinContribution]) -> Vec<String> {
    let mut seen = HashSet::new();
    contributions
        .iter()
        .filter(|c| seen.insert(c.table.as_str()))
        .map(|c| c.table.clone())
        .collect()
}

/// Merge all contributions into one schema per join table
///
/// Fields are a union by name. The first contribution to declare a field
/// fixes its kind; later ones only add fields that are still missing.
pub fn resolve_join_tables(
    contributions: &[JoinContribution],
    live: &HashMap<String, NativeColumns>,
) -> Vec<JoinTableSchema> {
    let empty = NativeColumns::new();
    let mut merged: IndexMap<&str, JoinTableSchema> = IndexMap::new();

    for contribution in contributions {
        let table_live = live.get(&contribution.table).unwrap_or(&empty);
        let schema = contribution.schema(table_live);

        match merged.get_mut(contribution.table.as_str()) {
            Some(existing) => {
                for (name, kind) in schema.columns {
                    existing.columns.entry(name).or_insert(kind);
                }
            }
            None => {
                merged.insert(contribution.table.as_str(), schema);
            }
        }

        tracing::debug!(
            table = %contribution.table,
            declared_by = %contribution.declared_by,
            "merged join table contribution"
        );
    }

    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemadelta_core::{FieldDecl, RelationDecl, ThroughDecl};

    fn person(extra: &[&str]) -> ModelSchema {
        ModelSchema::new("Person")
            .with_field("id", FieldDecl::integer())
            .with_relation(RelationDecl::through(
                "movies",
                ThroughDecl::new("Person_Movie", "Person_Movie.personId", "Person_Movie.movieId")
                    .with_extra(extra.iter().copied()),
            ))
    }

    fn movie(extra: &[&str]) -> ModelSchema {
        ModelSchema::new("Movie")
            .with_field("id", FieldDecl::integer())
            .with_relation(RelationDecl::through(
                "actors",
                ThroughDecl::new("Person_Movie", "Person_Movie.movieId", "Person_Movie.personId")
                    .with_extra(extra.iter().copied()),
            ))
    }

    fn resolve(models: &[&ModelSchema], live: &HashMap<String, NativeColumns>) -> Vec<JoinTableSchema> {
        let contributions = collect_contributions(models).unwrap();
        resolve_join_tables(&contributions, live)
    }

    #[test]
    fn test_join_tables_merge_across_models() {
        let (p, m) = (person(&["a", "b"]), movie(&["c", "d"]));
        let schemas = resolve(&[&p, &m], &HashMap::new());

        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].table_name, "Person_Movie");
        assert_eq!(
            schemas[0].column_names(),
            vec!["personId", "movieId", "a", "b", "c", "d"]
        );
        assert_eq!(schemas[0].columns["personId"], FOREIGN_KEY_KIND);
        assert_eq!(schemas[0].columns["c"], DEFAULT_EXTRA_KIND);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let (p, m) = (person(&["a", "b"]), movie(&["c", "b"]));

        let sorted = |schemas: Vec<JoinTableSchema>| {
            let mut names: Vec<String> = schemas[0].columns.keys().cloned().collect();
            names.sort();
            names
        };

        assert_eq!(
            sorted(resolve(&[&p, &m], &HashMap::new())),
            sorted(resolve(&[&m, &p], &HashMap::new()))
        );
    }

    #[test]
    fn test_live_columns_resolve_extra_kinds() {
        let p = person(&["role", "since", "shape"]);
        let mut live = HashMap::new();
        live.insert(
            "Person_Movie".to_string(),
            NativeColumns::from_iter([
                ("role".to_string(), "varchar(40)".to_string()),
                ("since".to_string(), "timestamptz".to_string()),
                ("shape".to_string(), "polygon".to_string()),
            ]),
        );

        let schemas = resolve(&[&p], &live);
        assert_eq!(schemas[0].columns["role"], IntermediateKind::String);
        assert_eq!(schemas[0].columns["since"], IntermediateKind::DateTime);
        assert_eq!(schemas[0].columns["shape"], DEFAULT_EXTRA_KIND);
    }

    #[test]
    fn test_foreign_keys_win_over_extras() {
        let p = person(&["personId"]);
        let schemas = resolve(&[&p], &HashMap::new());

        assert_eq!(schemas[0].column_names(), vec!["personId", "movieId"]);
        assert_eq!(schemas[0].columns["personId"], FOREIGN_KEY_KIND);
    }

    #[test]
    fn test_first_declaration_fixes_kind() {
        let casting = ModelSchema::new("Person_Movie")
            .with_field("personId", FieldDecl::new("string"))
            .with_field("billing", FieldDecl::integer());
        let p = ModelSchema::new("Person").with_relation(RelationDecl::through(
            "movies",
            ThroughDecl::new("Person_Movie", "Person_Movie.personId", "Person_Movie.movieId")
                .with_model(casting),
        ));
        let m = movie(&["billing"]);

        let schemas = resolve(&[&p, &m], &HashMap::new());
        assert_eq!(
            schemas[0].column_names(),
            vec!["personId", "billing", "movieId"]
        );
        assert_eq!(schemas[0].columns["personId"], IntermediateKind::String);
        assert_eq!(schemas[0].columns["billing"], IntermediateKind::Integer);
    }

    #[test]
    fn test_join_model_keeps_fields_over_unsupported_live_columns() {
        let casting = ModelSchema::new("Person_Movie")
            .with_field("personId", FieldDecl::integer())
            .with_field("area", FieldDecl::new("string"));
        let p = ModelSchema::new("Person").with_relation(RelationDecl::through(
            "movies",
            ThroughDecl::new("Person_Movie", "Person_Movie.personId", "Person_Movie.movieId")
                .with_model(casting),
        ));

        let mut live = HashMap::new();
        live.insert(
            "Person_Movie".to_string(),
            NativeColumns::from_iter([("area".to_string(), "polygon".to_string())]),
        );

        let schemas = resolve(&[&p], &live);
        assert_eq!(schemas[0].column_names(), vec!["personId", "area"]);
        assert_eq!(schemas[0].columns["area"], IntermediateKind::String);
    }

    #[test]
    fn test_join_model_unsupported_types_are_collected() {
        let bad = |table: &str| {
            ModelSchema::new(table).with_relation(RelationDecl::through(
                "links",
                ThroughDecl::new(format!("{}_Link", table), format!("{}_Link.a", table), format!("{}_Link.b", table))
                    .with_model(
                        ModelSchema::new(format!("{}_Link", table))
                            .with_field("where", FieldDecl::new("point")),
                    ),
            ))
        };
        let (x, y) = (bad("X"), bad("Y"));

        let errors = collect_contributions(&[&x, &y]).unwrap_err();
        assert_eq!(
            errors.iter().map(|e| e.table.as_str()).collect::<Vec<_>>(),
            vec!["X_Link", "Y_Link"]
        );
    }

    #[test]
    fn test_direct_relations_and_regular_tables_are_skipped() {
        let person_movie = ModelSchema::new("Person_Movie").with_field("id", FieldDecl::integer());
        let p = person(&["a"]).with_relation(RelationDecl::direct("pets"));

        let contributions = collect_contributions(&[&p, &person_movie]).unwrap();
        assert!(contributions.is_empty());
        assert!(join_table_names(&contributions).is_empty());
    }

    #[test]
    fn test_join_table_names_are_distinct() {
        let (p, m) = (person(&[]), movie(&[]));
        let contributions = collect_contributions(&[&p, &m]).unwrap();

        assert_eq!(contributions.len(), 2);
        assert_eq!(join_table_names(&contributions), vec!["Person_Movie"]);
    }
}
