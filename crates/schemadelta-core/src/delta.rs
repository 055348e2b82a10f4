//! Structural changes produced by a diff run

use crate::kinds::IntermediateKind;
use crate::schema::JoinTableSchema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which classes of change a run computes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Additive changes only: table and column creations
    #[default]
    Create,

    /// Also compute column alterations and drops
    Alter,
}

impl Mode {
    /// Whether alter and drop entries are computed at all
    pub fn computes_alterations(&self) -> bool {
        matches!(self, Self::Alter)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Alter => "alter",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "alter" => Ok(Self::Alter),
            other => Err(format!("unknown mode '{}' (expected create or alter)", other)),
        }
    }
}

/// Table-level changes
///
/// Regular tables and join tables are kept in separate deltas: regular tables
/// receive an implicit identity column on creation, join tables do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDelta {
    /// Tables to create, in model order
    pub create: Vec<String>,

    /// Table-level alterations (renderers expect the key; the engine leaves it empty)
    pub alter: IndexMap<String, Vec<String>>,

    /// Tables to drop (renderers expect the key; the engine leaves it empty)
    pub drop: Vec<String>,
}

impl TableDelta {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.alter.is_empty() && self.drop.is_empty()
    }
}

/// A column type change, `[from, to]` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindChange(pub IntermediateKind, pub IntermediateKind);

impl KindChange {
    /// Kind currently in the database
    pub fn from(&self) -> IntermediateKind {
        self.0
    }

    /// Kind the model declares
    pub fn to(&self) -> IntermediateKind {
        self.1
    }
}

/// A column present in the database but no longer declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedColumn {
    pub column_name: String,

    /// Type of the dropped column, so a down migration can recreate it
    pub column_type: IntermediateKind,
}

/// Column-level changes for one existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDelta {
    pub table_name: String,

    /// Columns declared by the model but missing from the database
    pub create: Vec<String>,

    /// Columns whose kind differs: name → `[from, to]`
    pub alter: IndexMap<String, KindChange>,

    /// Columns present in the database but not declared
    pub drop: Vec<DroppedColumn>,
}

impl ColumnDelta {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            create: Vec::new(),
            alter: IndexMap::new(),
            drop: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.alter.is_empty() && self.drop.is_empty()
    }
}

/// A live column left out of the diff because its native type is unrecognized
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedColumn {
    pub table_name: String,
    pub column: String,
    pub native_type: String,

    /// The model also declares a field with this name
    pub schema_conflict: bool,
}

/// Everything a migration renderer needs to act on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDelta {
    /// Regular model tables
    pub tables: TableDelta,

    /// Many-to-many join tables
    pub join_tables: TableDelta,

    /// One entry per existing table with column changes
    pub columns: Vec<ColumnDelta>,
}

impl SchemaDelta {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.join_tables.is_empty()
            && self.columns.iter().all(ColumnDelta::is_empty)
    }

    /// Total number of individual changes
    pub fn change_count(&self) -> usize {
        let table_changes = |delta: &TableDelta| delta.create.len() + delta.alter.len() + delta.drop.len();

        table_changes(&self.tables)
            + table_changes(&self.join_tables)
            + self
                .columns
                .iter()
                .map(|c| c.create.len() + c.alter.len() + c.drop.len())
                .sum::<usize>()
    }
}

/// Ternary result of a diff run
///
/// The numeric codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeltaOutcome {
    NoChange,
    Changes,
    ChangesWithConflict,
}

impl DeltaOutcome {
    pub fn code(&self) -> i32 {
        match self {
            Self::NoChange => 1,
            Self::Changes => 2,
            Self::ChangesWithConflict => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoChange => "NO_CHANGE",
            Self::Changes => "CHANGES",
            Self::ChangesWithConflict => "CHANGES_WITH_CONFLICT",
        }
    }
}

impl fmt::Display for DeltaOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaResult {
    pub outcome: DeltaOutcome,
    pub delta: SchemaDelta,

    /// Resolved join table schemas, in resolution order
    pub join_schemas: Vec<JoinTableSchema>,

    /// Always present, whatever the outcome
    pub skipped_columns: Vec<SkippedColumn>,
}

impl DeltaResult {
    pub fn has_conflicts(&self) -> bool {
        self.skipped_columns.iter().any(|c| c.schema_conflict)
    }
}
