//! In-memory schema reader
//!
//! This reader answers from tables held in memory instead of a live database.
//! It's useful for:
//! - Unit testing the diff engine
//! - Diffing against a JSON snapshot of a database taken elsewhere
//! - Simulating probe failures and slow connections
//!
//! ## Usage
//!
//! ```rust,ignore
//! use schemadelta_catalog::{MemoryReader, SchemaReader};
//!
//! let reader = MemoryReader::new();
//! reader.add_table("Person", [("id", "integer"), ("firstName", "varchar(255)")]).await;
//!
//! assert!(reader.table_exists("Person").await?);
//! let columns = reader.columns_of("Person").await?;
//! ```
//!
//! ## Snapshots
//!
//! ```rust,ignore
//! let reader = MemoryReader::from_snapshot_json(r#"{"Person": {"id": "integer"}}"#)?;
//! ```

use crate::reader::{NativeColumns, ProbeError, SchemaReader};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory schema reader
///
/// Cloning shares the underlying tables.
pub struct MemoryReader {
    /// Tables by name
    tables: Arc<RwLock<HashMap<String, NativeColumns>>>,

    /// Errors to return for specific tables
    errors: Arc<RwLock<HashMap<String, ProbeError>>>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,
}

impl MemoryReader {
    /// Create a reader with no tables
    pub fn new() -> Self {
        Self::from_tables(HashMap::new())
    }

    /// Create a reader from a pre-built map of tables
    pub fn from_tables(tables: HashMap<String, NativeColumns>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(tables)),
            errors: Arc::new(RwLock::new(HashMap::new())),
            fail_connection: false,
            latency_ms: 0,
        }
    }

    /// Load a snapshot of the form `{"table": {"column": "nativeType"}}`
    ///
    /// Column order is preserved.
    pub fn from_snapshot_json(json: &str) -> Result<Self, ProbeError> {
        let tables: HashMap<String, NativeColumns> = serde_json::from_str(json)
            .map_err(|e| ProbeError::InvalidResponse(format!("Invalid snapshot: {}", e)))?;

        tracing::debug!(tables = tables.len(), "loaded schema snapshot");
        Ok(Self::from_tables(tables))
    }

    /// Add or replace a table
    pub async fn add_table<I, C, T>(&self, table: impl Into<String>, columns: I)
    where
        I: IntoIterator<Item = (C, T)>,
        C: Into<String>,
        T: Into<String>,
    {
        let columns: NativeColumns = columns
            .into_iter()
            .map(|(name, native)| (name.into(), native.into()))
            .collect();
        self.tables.write().await.insert(table.into(), columns);
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure simulated latency for all operations
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Get the number of tables stored in the reader
    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }

    /// Get all table names, sorted
    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Simulate latency if configured
    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }

    async fn configured_error(&self, table: &str) -> Option<ProbeError> {
        self.errors.read().await.get(table).cloned()
    }
}

impl Default for MemoryReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryReader {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            errors: Arc::clone(&self.errors),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
        }
    }
}

#[async_trait::async_trait]
impl SchemaReader for MemoryReader {
    fn name(&self) -> &'static str {
        "Memory"
    }

    async fn table_exists(&self, table: &str) -> Result<bool, ProbeError> {
        self.simulate_latency().await;

        if let Some(error) = self.configured_error(table).await {
            return Err(error);
        }

        Ok(self.tables.read().await.contains_key(table))
    }

    async fn columns_of(&self, table: &str) -> Result<NativeColumns, ProbeError> {
        self.simulate_latency().await;

        if let Some(error) = self.configured_error(table).await {
            return Err(error);
        }

        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| ProbeError::TableNotFound(table.to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProbeError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(ProbeError::NetworkError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Builder for creating a MemoryReader with several tables
///
/// ```rust,ignore
/// let reader = MemoryReaderBuilder::new()
///     .with_table("Person", [("id", "integer"), ("firstName", "varchar")])
///     .with_error("Locked", ProbeError::PermissionDenied("Locked".into()))
///     .build();
/// ```
pub struct MemoryReaderBuilder {
    tables: HashMap<String, NativeColumns>,
    errors: HashMap<String, ProbeError>,
    fail_connection: bool,
    latency_ms: u64,
}

impl MemoryReaderBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
            fail_connection: false,
            latency_ms: 0,
        }
    }

    /// Add a table
    pub fn with_table<I, C, T>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = (C, T)>,
        C: Into<String>,
        T: Into<String>,
    {
        let columns: IndexMap<String, String> = columns
            .into_iter()
            .map(|(name, native)| (name.into(), native.into()))
            .collect();
        self.tables.insert(table.into(), columns);
        self
    }

    /// Add an error for a specific table
    ///
    /// Both probes of that table fail with a clone of `error`.
    pub fn with_error(mut self, table: impl Into<String>, error: ProbeError) -> Self {
        self.errors.insert(table.into(), error);
        self
    }

    /// Configure connection failure
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Build the MemoryReader
    pub fn build(self) -> MemoryReader {
        MemoryReader {
            tables: Arc::new(RwLock::new(self.tables)),
            errors: Arc::new(RwLock::new(self.errors)),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
        }
    }
}

impl Default for MemoryReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
