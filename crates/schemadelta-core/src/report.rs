//! Delta report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::delta::{DeltaOutcome, DeltaResult, Mode, SchemaDelta, SkippedColumn};
use crate::schema::JoinTableSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Delta report (delta.json v1)
///
/// This is the stable output format consumed by migration renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Mode the run was computed under
    pub mode: Mode,

    /// Ternary outcome
    pub outcome: DeltaOutcome,

    /// Numeric outcome code (1, 2 or 3)
    pub code: i32,

    /// Table and column changes
    pub delta: SchemaDelta,

    /// Resolved join table schemas
    pub join_schemas: Vec<JoinTableSchema>,

    /// Live columns excluded from the diff
    pub skipped_columns: Vec<SkippedColumn>,

    /// Hex SHA-256 of the serialized delta
    pub fingerprint: String,
}

impl DeltaReport {
    /// Build a report from an engine result
    pub fn from_result(mode: Mode, result: &DeltaResult) -> Result<Self, serde_json::Error> {
        Ok(Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            mode,
            outcome: result.outcome,
            code: result.outcome.code(),
            delta: result.delta.clone(),
            join_schemas: result.join_schemas.clone(),
            skipped_columns: result.skipped_columns.clone(),
            fingerprint: fingerprint(&result.delta)?,
        })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

/// Content hash of a delta
///
/// Identical deltas always hash identically, so a generator can recognize a
/// run it has already turned into a migration.
pub fn fingerprint(delta: &SchemaDelta) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(delta)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
