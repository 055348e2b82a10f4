//! Schema reader trait for probing live table structure

use indexmap::IndexMap;

/// Column name → native type spelling, in ordinal order
pub type NativeColumns = IndexMap<String, String>;

/// Errors that can occur when probing a database
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProbeError {
    /// The only probe outcome a diff can absorb
    pub fn is_table_absent(&self) -> bool {
        matches!(self, Self::TableNotFound(_))
    }
}

/// Trait for readers that can introspect live table structure
#[async_trait::async_trait]
pub trait SchemaReader: Send + Sync {
    /// Get the reader name (e.g., "PostgreSQL", "Memory")
    fn name(&self) -> &'static str;

    /// Check whether a table exists
    ///
    /// An absent table is `Ok(false)`. Readers may also report it as
    /// [`ProbeError::TableNotFound`]; callers treat both the same way.
    async fn table_exists(&self, table: &str) -> Result<bool, ProbeError>;

    /// Fetch the columns of a table with their native type spellings
    async fn columns_of(&self, table: &str) -> Result<NativeColumns, ProbeError>;

    /// Test the connection to the database
    ///
    /// This is useful for validating credentials before attempting
    /// to probe tables.
    async fn test_connection(&self) -> Result<(), ProbeError>;
}
