//! Type vocabularies and the translators between them
//!
//! Three closed vocabularies meet here:
//! - [`AbstractType`]: what a model declares (`"string"`, `"number"`, ...)
//! - [`IntermediateKind`]: the column-builder vocabulary models compile into
//! - [`CanonicalKind`]: the comparison vocabulary both sides are reduced to
//!
//! Native database spellings only ever enter through [`alias_of`], which looks
//! them up in [`ALIASES`]. Translations between the closed vocabularies are
//! exhaustive matches; only the string boundaries can fail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Type declared on a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractType {
    String,
    Boolean,
    Date,
    Binary,
    Number,

    /// A `number` field carrying an explicit integer constraint
    IntegerNumber,

    Array,
    Object,
    Any,
}

impl AbstractType {
    /// Resolve a declared type name
    ///
    /// `number` is promoted to [`AbstractType::IntegerNumber`] only when the
    /// field declares an integer constraint.
    pub fn parse(declared: &str, is_integer: bool) -> Result<Self, TypeError> {
        let parsed = match declared.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "binary" => Self::Binary,
            "number" if is_integer => Self::IntegerNumber,
            "number" => Self::Number,
            "array" => Self::Array,
            "object" => Self::Object,
            "any" => Self::Any,
            _ => return Err(TypeError::new(declared)),
        };

        Ok(parsed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Binary => "binary",
            Self::Number => "number",
            Self::IntegerNumber => "integer-number",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    /// Column-builder kind a field of this type compiles into
    pub fn to_intermediate(self) -> IntermediateKind {
        match self {
            Self::String => IntermediateKind::String,
            Self::Boolean => IntermediateKind::Boolean,
            Self::Date => IntermediateKind::DateTime,
            Self::Binary => IntermediateKind::Binary,
            Self::Number => IntermediateKind::Float,
            Self::IntegerNumber => IntermediateKind::Integer,
            Self::Array | Self::Object | Self::Any => IntermediateKind::Json,
        }
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate a declared field type straight into the column-builder vocabulary
pub fn abstract_to_intermediate(
    declared: &str,
    is_integer: bool,
) -> Result<IntermediateKind, TypeError> {
    AbstractType::parse(declared, is_integer).map(AbstractType::to_intermediate)
}

/// Column-builder vocabulary
///
/// This is what compiled model schemas carry and what migration renderers
/// consume, so alter and drop entries are reported in it as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntermediateKind {
    String,
    Text,
    Boolean,
    Integer,
    BigInteger,
    TinyInteger,
    Decimal,
    Float,
    Date,
    DateTime,
    Time,
    Json,
    Binary,
}

impl IntermediateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::BigInteger => "bigInteger",
            Self::TinyInteger => "tinyInteger",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Time => "time",
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }

    pub fn to_canonical(self) -> CanonicalKind {
        match self {
            Self::String => CanonicalKind::Varchar,
            Self::Text => CanonicalKind::Text,
            Self::Boolean => CanonicalKind::Boolean,
            Self::Integer => CanonicalKind::Integer,
            Self::BigInteger => CanonicalKind::Bigint,
            Self::TinyInteger => CanonicalKind::Tinyint,
            Self::Decimal => CanonicalKind::Decimal,
            Self::Float => CanonicalKind::Float,
            Self::Date => CanonicalKind::Date,
            Self::DateTime => CanonicalKind::Timestamp,
            Self::Time => CanonicalKind::Time,
            Self::Json => CanonicalKind::Json,
            Self::Binary => CanonicalKind::Blob,
        }
    }

    /// Preferred native spelling for this kind
    pub fn native_type(self) -> &'static str {
        self.to_canonical().as_str()
    }
}

impl fmt::Display for IntermediateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison vocabulary
///
/// Model columns and live database columns are both reduced to this before
/// any diffing happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalKind {
    Varchar,
    Text,
    Boolean,
    Integer,
    Bigint,
    Tinyint,
    Decimal,
    Float,
    Date,
    Timestamp,
    Time,
    Json,
    Blob,
}

impl CanonicalKind {
    pub const ALL: [CanonicalKind; 13] = [
        Self::Varchar,
        Self::Text,
        Self::Boolean,
        Self::Integer,
        Self::Bigint,
        Self::Tinyint,
        Self::Decimal,
        Self::Float,
        Self::Date,
        Self::Timestamp,
        Self::Time,
        Self::Json,
        Self::Blob,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Bigint => "bigint",
            Self::Tinyint => "tinyint",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Time => "time",
            Self::Json => "json",
            Self::Blob => "blob",
        }
    }

    /// Translate back out into the column-builder vocabulary
    pub fn to_intermediate(self) -> IntermediateKind {
        match self {
            Self::Varchar => IntermediateKind::String,
            Self::Text => IntermediateKind::Text,
            Self::Boolean => IntermediateKind::Boolean,
            Self::Integer => IntermediateKind::Integer,
            Self::Bigint => IntermediateKind::BigInteger,
            Self::Tinyint => IntermediateKind::TinyInteger,
            Self::Decimal => IntermediateKind::Decimal,
            Self::Float => IntermediateKind::Float,
            Self::Date => IntermediateKind::Date,
            Self::Timestamp => IntermediateKind::DateTime,
            Self::Time => IntermediateKind::Time,
            Self::Json => IntermediateKind::Json,
            Self::Blob => IntermediateKind::Binary,
        }
    }

    /// Known native spellings for this kind
    pub fn aliases(&self) -> &'static [&'static str] {
        ALIASES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, spellings)| *spellings)
            .unwrap_or(&[])
    }
}

impl fmt::Display for CanonicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical kind → known dialect spellings (PostgreSQL, MySQL, SQLite)
///
/// Spellings are lowercase and carry no length/precision suffix. Each kind
/// lists its own name first; that spelling doubles as the preferred native
/// type.
pub static ALIASES: &[(CanonicalKind, &[&str])] = &[
    (
        CanonicalKind::Varchar,
        &["varchar", "character varying", "char", "character", "bpchar", "nvarchar", "nchar", "string"],
    ),
    (
        CanonicalKind::Text,
        &["text", "tinytext", "mediumtext", "longtext", "citext", "clob"],
    ),
    (CanonicalKind::Boolean, &["boolean", "bool"]),
    (
        CanonicalKind::Integer,
        &["integer", "int", "int4", "int2", "smallint", "mediumint", "serial", "serial4"],
    ),
    (CanonicalKind::Bigint, &["bigint", "int8", "bigserial", "serial8"]),
    (CanonicalKind::Tinyint, &["tinyint"]),
    (CanonicalKind::Decimal, &["decimal", "numeric", "money"]),
    (
        CanonicalKind::Float,
        &["float", "double", "double precision", "real", "float4", "float8"],
    ),
    (CanonicalKind::Date, &["date"]),
    (
        CanonicalKind::Timestamp,
        &[
            "timestamp",
            "timestamptz",
            "datetime",
            "timestamp with time zone",
            "timestamp without time zone",
        ],
    ),
    (
        CanonicalKind::Time,
        &["time", "timetz", "time with time zone", "time without time zone"],
    ),
    (CanonicalKind::Json, &["json", "jsonb"]),
    (
        CanonicalKind::Blob,
        &["blob", "bytea", "binary", "varbinary", "tinyblob", "mediumblob", "longblob"],
    ),
];

static ALIAS_INDEX: LazyLock<HashMap<&'static str, CanonicalKind>> = LazyLock::new(|| {
    let mut index = HashMap::new();
    for (kind, spellings) in ALIASES {
        for spelling in *spellings {
            index.entry(*spelling).or_insert(*kind);
        }
    }
    index
});

/// Reduce a native spelling to its lookup form
///
/// Lowercases, collapses whitespace and strips one trailing parenthetical
/// suffix: `"VARCHAR(255)"` → `"varchar"`, `"numeric(10, 2)"` → `"numeric"`.
pub fn normalize_native(native: &str) -> String {
    let lowered = native.trim().to_ascii_lowercase();

    let base = match (lowered.strip_suffix(')'), lowered.rfind('(')) {
        (Some(_), Some(open)) => &lowered[..open],
        _ => lowered.as_str(),
    };

    base.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Look up the canonical kind of a native database type
pub fn alias_of(native: &str) -> Result<CanonicalKind, TypeError> {
    ALIAS_INDEX
        .get(normalize_native(native).as_str())
        .copied()
        .ok_or_else(|| TypeError::new(native))
}

/// A type name outside the supported vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported type '{type_name}'{}", .context.as_ref().map(|c| format!(" in {}", c)).unwrap_or_default())]
pub struct TypeError {
    /// The offending type, as written
    pub type_name: String,

    /// Owning model or table, when known
    pub context: Option<String>,
}

impl TypeError {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// The alias table and the kind translators disagree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("native type '{alias}' is listed under both {first} and {second}")]
    DuplicateAlias {
        alias: &'static str,
        first: CanonicalKind,
        second: CanonicalKind,
    },

    #[error("canonical kind {0} has no alias entry")]
    MissingAliases(CanonicalKind),

    #[error("canonical kind {0} does not list its own name as an alias")]
    MissingSelfAlias(CanonicalKind),

    #[error("canonical kind {kind} comes back as {returned} after a round trip through the column-builder vocabulary")]
    RoundTrip {
        kind: CanonicalKind,
        returned: CanonicalKind,
    },
}

/// Check that every kind the alias table can produce survives a round trip
///
/// Run once before any diffing. A failure here is a programming error in the
/// static tables, not a property of the input.
pub fn verify_kind_tables() -> Result<(), ConsistencyError> {
    let mut seen: HashMap<&'static str, CanonicalKind> = HashMap::new();

    for (kind, spellings) in ALIASES {
        if !spellings.contains(&kind.as_str()) {
            return Err(ConsistencyError::MissingSelfAlias(*kind));
        }

        for spelling in *spellings {
            if let Some(first) = seen.insert(*spelling, *kind) {
                return Err(ConsistencyError::DuplicateAlias {
                    alias: *spelling,
                    first,
                    second: *kind,
                });
            }
        }

        let returned = kind.to_intermediate().to_canonical();
        if returned != *kind {
            return Err(ConsistencyError::RoundTrip {
                kind: *kind,
                returned,
            });
        }
    }

    for kind in CanonicalKind::ALL {
        if !ALIASES.iter().any(|(listed, _)| *listed == kind) {
            return Err(ConsistencyError::MissingAliases(kind));
        }
    }

    Ok(())
}
