//! schemadelta engine - the schema delta pipeline
//!
//! This crate turns declared models and a live database into the changes a
//! migration generator has to render:
//! - Model schema compiler
//! - Join table resolver
//! - Table and column differs
//! - Delta aggregation
//!
//! The database is only reached through [`schemadelta_catalog::SchemaReader`].
//!
//! ```rust,ignore
//! let engine = DeltaEngine::new(Arc::new(reader), EngineOptions::default())?;
//! let result = engine.compute(&models).await?;
//! println!("{}", result.outcome);
//! ```

pub mod aggregate;
pub mod column_diff;
pub mod compiler;
pub mod error;
pub mod join_tables;
pub mod pipeline;
pub mod probe;
pub mod table_diff;

pub use column_diff::ColumnDiff;
pub use error::DeltaError;
pub use join_tables::{JoinContribution, JoinSource};
pub use pipeline::{DeltaEngine, EngineOptions};
