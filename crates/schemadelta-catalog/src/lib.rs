//! Live schema readers for the delta engine
//!
//! This crate provides the [`SchemaReader`] capability the engine probes
//! tables through, plus two implementations of it.
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL support via `information_schema`
//!
//! The in-memory reader is always available and also loads JSON snapshots.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemadelta_catalog::{MemoryReader, SchemaReader};
//!
//! let reader = MemoryReader::from_snapshot_json(&std::fs::read_to_string("db.json")?)?;
//! if reader.table_exists("Person").await? {
//!     let columns = reader.columns_of("Person").await?;
//! }
//! ```

pub mod memory;
pub mod postgres;
pub mod reader;

pub use memory::{MemoryReader, MemoryReaderBuilder};
pub use postgres::PostgresReader;
pub use reader::{NativeColumns, ProbeError, SchemaReader};
