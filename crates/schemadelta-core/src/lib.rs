//! schemadelta core
//!
//! Core domain model shared by every schemadelta crate:
//! - the three type vocabularies and the translators between them
//! - model declarations as supplied by the caller
//! - delta structures produced by the engine
//! - configuration (schemadelta.toml) and the versioned JSON report
//!
//! The numeric outcome codes are part of the public API. Never renumber them.

pub mod kinds;
pub mod schema;
pub mod delta;
pub mod report;
pub mod config;

pub use kinds::{
    alias_of, verify_kind_tables, AbstractType, CanonicalKind, ConsistencyError, IntermediateKind,
    TypeError,
};
pub use schema::{
    ColumnSpec, FieldConstraints, FieldDecl, JoinTableSchema, ModelSchema, RelationDecl,
    TableSchema, ThroughDecl, UnsupportedFields, ValidationError,
};
pub use delta::{
    ColumnDelta, DeltaOutcome, DeltaResult, DroppedColumn, KindChange, Mode, SchemaDelta, SkippedColumn,
    TableDelta,
};
pub use report::{DeltaReport, ReportVersion};
pub use config::{Config, ConfigError, DatabaseConfig, DatabaseDialect};
