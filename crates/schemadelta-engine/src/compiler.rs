//! Model schema compiler
//!
//! Turns declared model fields into intermediate column kinds. Validation of
//! the declarations themselves happens first and fails fast; unsupported field
//! types are collected per table so the caller can report them all at once.

use schemadelta_core::{AbstractType, ModelSchema, TableSchema, UnsupportedFields, ValidationError};
use std::collections::HashSet;

/// Check model declarations for structural mistakes
///
/// Returns the first problem found, in model order.
pub fn validate(models: &[ModelSchema]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    for model in models {
        validate_fields(model)?;

        if !seen.insert(model.table_name.as_str()) {
            return Err(ValidationError::DuplicateTable(model.table_name.clone()));
        }

        for (relation, through) in model.through_relations() {
            if through.table.trim().is_empty() {
                return Err(ValidationError::EmptyTableName);
            }

            for spec in [&through.from, &through.to] {
                let (table, _) = spec.split().ok_or_else(|| ValidationError::MalformedColumnSpec {
                    table: model.table_name.clone(),
                    relation: relation.name.clone(),
                    spec: spec.to_string(),
                })?;

                if table != through.table {
                    return Err(ValidationError::ThroughTableMismatch {
                        table: model.table_name.clone(),
                        relation: relation.name.clone(),
                        through: through.table.clone(),
                        spec: spec.to_string(),
                    });
                }
            }

            if let Some(join_model) = &through.model {
                if join_model.table_name != through.table {
                    return Err(ValidationError::JoinModelMismatch {
                        through: through.table.clone(),
                        model_table: join_model.table_name.clone(),
                    });
                }
                validate_fields(join_model)?;
            }
        }
    }

    Ok(())
}

fn validate_fields(model: &ModelSchema) -> Result<(), ValidationError> {
    if model.table_name.trim().is_empty() {
        return Err(ValidationError::EmptyTableName);
    }

    if model.fields.keys().any(|name| name.trim().is_empty()) {
        return Err(ValidationError::EmptyFieldName(model.table_name.clone()));
    }

    Ok(())
}

/// Compile one model into its table schema
///
/// Every field is examined. If any declared type is unsupported, no schema
/// is produced and the error lists each offending type once, in declaration
/// order.
pub fn compile_model(model: &ModelSchema) -> Result<TableSchema, UnsupportedFields> {
    let mut schema = TableSchema::new(&model.table_name);
    let mut unsupported = UnsupportedFields::new(&model.table_name);

    for (name, field) in &model.fields {
        match AbstractType::parse(&field.field_type, field.constraints.is_integer) {
            Ok(declared) => {
                schema.columns.insert(name.clone(), declared.to_intermediate());
            }
            Err(err) => {
                let err = err.with_context(format!("{}.{}", model.table_name, name));
                tracing::debug!(%err, "field type has no intermediate kind");
                unsupported.push(err.type_name);
            }
        }
    }

    if unsupported.is_empty() {
        tracing::debug!(
            table = %schema.table_name,
            columns = schema.columns.len(),
            "compiled model"
        );
        Ok(schema)
    } else {
        Err(unsupported)
    }
}

/// Compile every model, collecting all unsupported-type errors
pub fn compile_models<'a, I>(models: I) -> Result<Vec<TableSchema>, Vec<UnsupportedFields>>
where
    I: IntoIterator<Item = &'a ModelSchema>,
{
    let mut compiled = Vec::new();
    let mut errors = Vec::new();

    for model in models {
        match compile_model(model) {
            Ok(schema) => compiled.push(schema),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(compiled)
    } else {
        Err(errors)
    }
}
