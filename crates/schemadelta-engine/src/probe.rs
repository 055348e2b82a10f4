//! Concurrent introspection against a [`SchemaReader`]
//!
//! Probes run through a buffered stream: at most `concurrency` requests are
//! in flight, and answers come back in the order the tables were given. The
//! first fatal failure ends the stream; probes still in flight are dropped
//! with it.

use crate::error::DeltaError;
use futures::stream::{self, StreamExt, TryStreamExt};
use schemadelta_catalog::{NativeColumns, SchemaReader};

/// Probe whether each table exists
///
/// A table is absent when the reader says so or reports
/// [`schemadelta_catalog::ProbeError::TableNotFound`]. Any other probe failure
/// aborts with [`DeltaError::Connectivity`].
pub async fn probe_existence(
    reader: &dyn SchemaReader,
    tables: &[String],
    concurrency: usize,
) -> Result<Vec<bool>, DeltaError> {
    stream::iter(tables)
        .map(|table| async move {
            match reader.table_exists(table).await {
                Ok(exists) => Ok(exists),
                Err(err) if err.is_table_absent() => Ok(false),
                Err(err) => Err(DeltaError::connectivity(table, err)),
            }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Fetch the live columns of each table
///
/// Only called for tables known to exist, so every failure is fatal.
pub async fn fetch_columns(
    reader: &dyn SchemaReader,
    tables: &[String],
    concurrency: usize,
) -> Result<Vec<NativeColumns>, DeltaError> {
    stream::iter(tables)
        .map(|table| async move {
            reader
                .columns_of(table)
                .await
                .map_err(|err| DeltaError::connectivity(table, err))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}
