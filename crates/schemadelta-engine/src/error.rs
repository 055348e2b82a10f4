//! Errors that abort a diff run

use schemadelta_catalog::ProbeError;
use schemadelta_core::{ConsistencyError, UnsupportedFields, ValidationError};

/// A fatal failure of a diff run
///
/// Unrecognized live column types are not errors; they end up in
/// [`schemadelta_core::SkippedColumn`].
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Malformed model declarations
    #[error("invalid model declarations: {0}")]
    Validation(#[from] ValidationError),

    /// Declared field types outside the supported vocabulary, one entry per table
    #[error("{}", describe_unsupported(.0))]
    UnsupportedTypes(Vec<UnsupportedFields>),

    /// A probe failed for a reason other than the table being absent
    #[error("failed to introspect table '{table}'")]
    Connectivity {
        table: String,
        #[source]
        source: ProbeError,
    },

    /// The static kind tables disagree with each other
    #[error("kind tables are inconsistent: {0}")]
    Consistency(#[from] ConsistencyError),
}

impl DeltaError {
    /// Combine per-table unsupported-type errors into one
    ///
    /// Entries naming the same table are merged; kinds stay deduplicated and
    /// in first-seen order.
    pub fn unsupported(errors: impl IntoIterator<Item = UnsupportedFields>) -> Self {
        let mut combined: Vec<UnsupportedFields> = Vec::new();

        for error in errors {
            match combined.iter_mut().find(|e| e.table == error.table) {
                Some(existing) => error.kinds.into_iter().for_each(|k| existing.push(k)),
                None => combined.push(error),
            }
        }

        Self::UnsupportedTypes(combined)
    }

    pub fn connectivity(table: impl Into<String>, source: ProbeError) -> Self {
        Self::Connectivity {
            table: table.into(),
            source,
        }
    }
}

fn describe_unsupported(errors: &[UnsupportedFields]) -> String {
    let tables = errors
        .iter()
        .map(|e| format!("{} ({})", e.table, e.kinds.join(", ")))
        .collect::<Vec<_>>()
        .join("; ");

    format!("unsupported field types: {}", tables)
}
