//! The delta engine: models plus a live database in, one [`DeltaResult`] out
//!
//! A run goes through these stages, stopping at the first fatal error:
//!
//! 1. validate the model declarations
//! 2. compile models and explicit join models, collecting unsupported types
//! 3. probe which tables exist (concurrently)
//! 4. fetch the live columns of existing tables (concurrently)
//! 5. resolve join table schemas
//! 6. diff the columns of every existing table
//! 7. aggregate

use crate::aggregate::{aggregate, RunParts};
use crate::column_diff::ColumnDiff;
use crate::compiler::{compile_models, validate};
use crate::error::DeltaError;
use crate::join_tables::{collect_contributions, join_table_names, resolve_join_tables};
use crate::probe::{fetch_columns, probe_existence};
use crate::table_diff::diff_tables;
use schemadelta_catalog::{NativeColumns, SchemaReader};
use schemadelta_core::config::{glob_match, DEFAULT_CONCURRENCY};
use schemadelta_core::{verify_kind_tables, Config, DeltaResult, ModelSchema, Mode};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity column regular tables receive on creation
pub const IDENTITY_COLUMN: &str = "id";

/// Run options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub mode: Mode,

    /// Maximum number of probes in flight at once
    pub concurrency: usize,

    /// Glob patterns of tables left out of the run
    pub skip_tables: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            concurrency: DEFAULT_CONCURRENCY,
            skip_tables: Vec::new(),
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.mode,
            concurrency: config.concurrency,
            skip_tables: config.skip_tables.clone(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_skip_tables<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_tables = patterns.into_iter().map(Into::into).collect();
        self
    }

    fn is_skipped(&self, table: &str) -> bool {
        self.skip_tables.iter().any(|pattern| glob_match(pattern, table))
    }
}

/// Computes schema deltas against one database
pub struct DeltaEngine {
    reader: Arc<dyn SchemaReader>,
    options: EngineOptions,
}

impl DeltaEngine {
    /// Create an engine
    ///
    /// Fails if the static kind tables are inconsistent.
    pub fn new(reader: Arc<dyn SchemaReader>, options: EngineOptions) -> Result<Self, DeltaError> {
        verify_kind_tables()?;
        Ok(Self { reader, options })
    }

    /// Compute the delta between `models` and the live database
    pub async fn compute(&self, models: &[ModelSchema]) -> Result<DeltaResult, DeltaError> {
        validate(models)?;

        let models: Vec<&ModelSchema> = models
            .iter()
            .filter(|model| {
                let skip = self.options.is_skipped(&model.table_name);
                if skip {
                    tracing::debug!(table = %model.table_name, "table matches skip_tables");
                }
                !skip
            })
            .collect();

        // Compile everything before touching the database
        let compiled = compile_models(models.iter().copied());
        let contributions = collect_contributions(&models);
        let (compiled, contributions) = match (compiled, contributions) {
            (Ok(compiled), Ok(contributions)) => (compiled, contributions),
            (compiled, contributions) => {
                let errors = compiled
                    .err()
                    .into_iter()
                    .flatten()
                    .chain(contributions.err().into_iter().flatten());
                return Err(DeltaError::unsupported(errors));
            }
        };

        let regular_names: Vec<String> = compiled.iter().map(|s| s.table_name.clone()).collect();
        let join_names: Vec<String> = join_table_names(&contributions)
            .into_iter()
            .filter(|table| !self.options.is_skipped(table))
            .collect();

        let reader = self.reader.as_ref();
        let concurrency = self.options.concurrency;
        tracing::debug!(
            reader = reader.name(),
            tables = regular_names.len(),
            join_tables = join_names.len(),
            concurrency,
            "probing tables"
        );

        let regular = diff_tables(
            &regular_names,
            &probe_existence(reader, &regular_names, concurrency).await?,
        );
        let joins = diff_tables(
            &join_names,
            &probe_existence(reader, &join_names, concurrency).await?,
        );

        let regular_live = fetch_columns(reader, &regular.existing, concurrency).await?;
        let join_live: HashMap<String, NativeColumns> = joins
            .existing
            .iter()
            .cloned()
            .zip(fetch_columns(reader, &joins.existing, concurrency).await?)
            .collect();

        let join_schemas: Vec<_> = resolve_join_tables(&contributions, &join_live)
            .into_iter()
            .filter(|schema| join_names.contains(&schema.table_name))
            .collect();

        let mode = self.options.mode;
        let mut column_diffs = Vec::new();

        for (table, db_columns) in regular.existing.iter().zip(&regular_live) {
            if let Some(schema) = compiled.iter().find(|s| &s.table_name == table) {
                column_diffs.push(ColumnDiff::compute(
                    table,
                    db_columns,
                    &schema.columns,
                    mode,
                    Some(IDENTITY_COLUMN),
                ));
            }
        }

        for table in &joins.existing {
            if let (Some(schema), Some(db_columns)) = (
                join_schemas.iter().find(|s| &s.table_name == table),
                join_live.get(table),
            ) {
                column_diffs.push(ColumnDiff::compute(table, db_columns, &schema.columns, mode, None));
            }
        }

        let result = aggregate(RunParts {
            tables: regular.delta,
            join_tables: joins.delta,
            column_diffs,
            join_schemas,
        });

        if result.has_conflicts() {
            tracing::warn!("live columns of unsupported type collide with declared fields");
        }
        tracing::info!(
            outcome = %result.outcome,
            mode = %mode,
            changes = result.delta.change_count(),
            skipped = result.skipped_columns.len(),
            "schema delta computed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemadelta_catalog::{MemoryReaderBuilder, ProbeError};
    use schemadelta_core::{DeltaOutcome, FieldDecl, IntermediateKind, KindChange};

    fn person() -> ModelSchema {
        ModelSchema::new("Person")
            .with_field("id", FieldDecl::integer())
            .with_field("firstName", FieldDecl::new("string"))
    }

    fn engine(reader: MemoryReaderBuilder, options: EngineOptions) -> DeltaEngine {
        DeltaEngine::new(Arc::new(reader.build()), options).unwrap()
    }

    #[tokio::test]
    async fn test_unchanged_table_is_no_change() {
        let engine = engine(
            MemoryReaderBuilder::new().with_table("Person", [("id", "integer"), ("firstName", "varchar")]),
            EngineOptions::default(),
        );

        let result = engine.compute(&[person()]).await.unwrap();
        assert_eq!(result.outcome, DeltaOutcome::NoChange);
        assert!(result.skipped_columns.is_empty());
    }

    #[tokio::test]
    async fn test_identity_column_survives_alter_mode() {
        let model = ModelSchema::new("Dog").with_field("name", FieldDecl::new("string"));
        let engine = engine(
            MemoryReaderBuilder::new().with_table("Dog", [("id", "integer"), ("name", "varchar")]),
            EngineOptions::default().with_mode(Mode::Alter),
        );

        let result = engine.compute(&[model]).await.unwrap();
        assert_eq!(result.outcome, DeltaOutcome::NoChange);
    }

    #[tokio::test]
    async fn test_alter_mode_end_to_end() {
        let engine = engine(
            MemoryReaderBuilder::new()
                .with_table("Person", [("id", "bigint"), ("firstName", "varchar"), ("age", "integer")]),
            EngineOptions::default().with_mode(Mode::Alter),
        );

        let result = engine.compute(&[person()]).await.unwrap();
        assert_eq!(result.outcome, DeltaOutcome::Changes);

        let columns = &result.delta.columns[0];
        assert_eq!(
            columns.alter.get("id"),
            Some(&KindChange(IntermediateKind::BigInteger, IntermediateKind::Integer))
        );
        assert_eq!(columns.drop[0].column_name, "age");
    }

    #[tokio::test]
    async fn test_skip_tables_patterns() {
        let engine = engine(
            MemoryReaderBuilder::new(),
            EngineOptions::default().with_skip_tables(["knex_*"]),
        );

        let models = vec![
            ModelSchema::new("knex_migrations").with_field("name", FieldDecl::new("string")),
            person(),
        ];
        let result = engine.compute(&models).await.unwrap();
        assert_eq!(result.delta.tables.create, vec!["Person"]);
    }

    #[tokio::test]
    async fn test_validation_happens_before_probing() {
        let engine = engine(
            MemoryReaderBuilder::new()
                .with_error("Person", ProbeError::NetworkError("down".to_string())),
            EngineOptions::default(),
        );

        let err = engine.compute(&[person(), person()]).await.unwrap_err();
        assert!(matches!(err, DeltaError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unsupported_types_abort_before_probing() {
        let engine = engine(
            MemoryReaderBuilder::new()
                .with_error("Person", ProbeError::NetworkError("down".to_string())),
            EngineOptions::default(),
        );

        let model = person().with_field("home", FieldDecl::new("point"));
        let err = engine.compute(&[model]).await.unwrap_err();
        assert!(matches!(err, DeltaError::UnsupportedTypes(_)));
    }
}
