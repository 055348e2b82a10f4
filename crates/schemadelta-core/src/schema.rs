//! Model declarations and compiled table schemas
//!
//! [`ModelSchema`] is what the caller declares. [`TableSchema`] is what the
//! engine compiles it into: column name → [`IntermediateKind`], in declaration
//! order.

use crate::kinds::IntermediateKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A declared data model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSchema {
    /// Table backing the model
    pub table_name: String,

    /// Field name → declaration, in declaration order
    #[serde(default)]
    pub fields: IndexMap<String, FieldDecl>,

    /// Relation declarations
    #[serde(default)]
    pub relations: Vec<RelationDecl>,
}

impl ModelSchema {
    /// Create a model with no fields
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            fields: IndexMap::new(),
            relations: Vec::new(),
        }
    }

    /// Declare a field
    pub fn with_field(mut self, name: impl Into<String>, field: FieldDecl) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Declare a relation
    pub fn with_relation(mut self, relation: RelationDecl) -> Self {
        self.relations.push(relation);
        self
    }

    /// Relations that go through a join table
    pub fn through_relations(&self) -> impl Iterator<Item = (&RelationDecl, &ThroughDecl)> {
        self.relations
            .iter()
            .filter_map(|relation| relation.through.as_ref().map(|through| (relation, through)))
    }
}

/// A single field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecl {
    /// Declared type name (`"string"`, `"number"`, ...)
    #[serde(rename = "type")]
    pub field_type: String,

    /// Constraints attached to the field
    #[serde(flatten)]
    pub constraints: FieldConstraints,
}

impl FieldDecl {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            constraints: FieldConstraints::default(),
        }
    }

    /// A `number` field constrained to integers
    pub fn integer() -> Self {
        Self::new("number").with_integer_constraint()
    }

    pub fn with_integer_constraint(mut self) -> Self {
        self.constraints.is_integer = true;
        self
    }
}

/// Constraints that influence how a field is compiled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConstraints {
    /// Numeric values must be integers
    #[serde(default)]
    pub is_integer: bool,
}

/// A relation declared on a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDecl {
    /// Relation name on the owning model
    pub name: String,

    /// Join table clause; only many-to-many relations carry one
    #[serde(default)]
    pub through: Option<ThroughDecl>,
}

impl RelationDecl {
    /// A relation without a join table
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            through: None,
        }
    }

    /// A many-to-many relation through a join table
    pub fn through(name: impl Into<String>, through: ThroughDecl) -> Self {
        Self {
            name: name.into(),
            through: Some(through),
        }
    }
}

/// Join table clause of a many-to-many relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughDecl {
    /// Join table name
    pub table: String,

    /// Join table column pointing at the owning side (`"Person_Movie.personId"`)
    pub from: ColumnSpec,

    /// Join table column pointing at the related side (`"Person_Movie.movieId"`)
    pub to: ColumnSpec,

    /// Extra columns stored on the join table
    #[serde(default)]
    pub extra: Vec<String>,

    /// Explicit model describing the join table
    #[serde(default)]
    pub model: Option<Box<ModelSchema>>,
}

impl ThroughDecl {
    pub fn new(table: impl Into<String>, from: impl Into<ColumnSpec>, to: impl Into<ColumnSpec>) -> Self {
        Self {
            table: table.into(),
            from: from.into(),
            to: to.into(),
            extra: Vec::new(),
            model: None,
        }
    }

    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra = extra.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: ModelSchema) -> Self {
        self.model = Some(Box::new(model));
        self
    }
}

/// A `table.column` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSpec(pub String);

impl ColumnSpec {
    /// Split into `(table, column)`
    ///
    /// Exactly one dot, both sides non-empty.
    pub fn split(&self) -> Option<(&str, &str)> {
        let (table, column) = self.0.trim().split_once('.')?;
        if table.is_empty() || column.is_empty() || column.contains('.') {
            return None;
        }
        Some((table, column))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ColumnSpec {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ColumnSpec {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A table reduced to column-builder kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub table_name: String,

    /// Column name → kind, in declaration order
    pub columns: IndexMap<String, IntermediateKind>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: IndexMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, kind: IntermediateKind) -> Self {
        self.columns.insert(name.into(), kind);
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }
}

/// Schema synthesized for a many-to-many join table
pub type JoinTableSchema = TableSchema;

/// All unsupported field types found on one table, deduplicated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{table}: unsupported field types {kinds:?}")]
pub struct UnsupportedFields {
    pub table: String,

    /// Offending type names in first-seen order
    pub kinds: Vec<String>,
}

impl UnsupportedFields {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            kinds: Vec::new(),
        }
    }

    /// Record a type name unless already present
    pub fn push(&mut self, kind: impl Into<String>) {
        let kind = kind.into();
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Malformed model input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("model declares an empty table name")]
    EmptyTableName,

    #[error("model '{0}' declares a field with an empty name")]
    EmptyFieldName(String),

    #[error("table '{0}' is declared by more than one model")]
    DuplicateTable(String),

    #[error("relation '{relation}' on '{table}' has malformed column reference '{spec}' (expected table.column)")]
    MalformedColumnSpec {
        table: String,
        relation: String,
        spec: String,
    },

    #[error("relation '{relation}' on '{table}' references '{spec}' outside its join table '{through}'")]
    ThroughTableMismatch {
        table: String,
        relation: String,
        through: String,
        spec: String,
    },

    #[error("join model for '{through}' declares table '{model_table}'")]
    JoinModelMismatch {
        through: String,
        model_table: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_spec_split() {
        assert_eq!(
            ColumnSpec::from("Person_Movie.personId").split(),
            Some(("Person_Movie", "personId"))
        );
        assert_eq!(ColumnSpec::from("personId").split(), None);
        assert_eq!(ColumnSpec::from(".personId").split(), None);
        assert_eq!(ColumnSpec::from("Person_Movie.").split(), None);
        assert_eq!(ColumnSpec::from("a.b.c").split(), None);
    }

    #[test]
    fn model_from_json() {
        let json = r#"{
            "tableName": "Person",
            "fields": {
                "id": { "type": "number", "isInteger": true },
                "firstName": { "type": "string" }
            },
            "relations": [
                {
                    "name": "movies",
                    "through": {
                        "table": "Person_Movie",
                        "from": "Person_Movie.personId",
                        "to": "Person_Movie.movieId",
                        "extra": ["role"]
                    }
                },
                { "name": "pets" }
            ]
        }"#;

        let model: ModelSchema = serde_json::from_str(json).unwrap();
        assert_eq!(model.table_name, "Person");
        assert_eq!(model.fields.keys().collect::<Vec<_>>(), vec!["id", "firstName"]);
        assert!(model.fields["id"].constraints.is_integer);
        assert!(!model.fields["firstName"].constraints.is_integer);
        assert_eq!(model.through_relations().count(), 1);

        let (relation, through) = model.through_relations().next().unwrap();
        assert_eq!(relation.name, "movies");
        assert_eq!(through.extra, vec!["role"]);
        assert!(through.model.is_none());
    }

    #[test]
    fn builder_matches_json() {
        let built = ModelSchema::new("Dog")
            .with_field("id", FieldDecl::integer())
            .with_field("name", FieldDecl::new("string"));

        let parsed: ModelSchema = serde_json::from_str(
            r#"{"tableName":"Dog","fields":{"id":{"type":"number","isInteger":true},"name":{"type":"string"}}}"#,
        )
        .unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn unsupported_fields_dedupe_in_order() {
        let mut unsupported = UnsupportedFields::new("Person");
        unsupported.push("geometry");
        unsupported.push("ref");
        unsupported.push("geometry");

        assert_eq!(unsupported.kinds, vec!["geometry", "ref"]);
        assert_eq!(
            unsupported.to_string(),
            "Person: unsupported field types [\"geometry\", \"ref\"]"
        );
    }
}
