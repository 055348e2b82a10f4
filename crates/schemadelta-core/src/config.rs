//! Configuration schema (schemadelta.toml)

use crate::delta::Mode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of concurrent introspection requests
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Where live table structure comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDialect {
    /// PostgreSQL via information_schema
    #[default]
    Postgres,

    /// A JSON snapshot of table → column → native type
    Snapshot,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Introspection backend
    #[serde(default)]
    pub dialect: DatabaseDialect,

    /// Schema (namespace) the model tables live in
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Connection string; falls back to DATABASE_URL when absent
    #[serde(default)]
    pub url: Option<String>,

    /// Snapshot file for the snapshot dialect
    #[serde(default)]
    pub snapshot: Option<PathBuf>,

    /// Connect over TLS
    #[serde(default)]
    pub tls: bool,
}

fn default_schema() -> String {
    "public".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: DatabaseDialect::default(),
            schema: default_schema(),
            url: None,
            snapshot: None,
            tls: false,
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Which classes of change to compute
    #[serde(default)]
    pub mode: Mode,

    /// Upper bound on concurrent table probes
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Model tables left out of the diff (glob patterns)
    #[serde(default)]
    pub skip_tables: Vec<String>,

    /// Database connection configuration
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            concurrency: DEFAULT_CONCURRENCY,
            skip_tables: Vec::new(),
            database: None,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve a path relative to the project root
    pub fn resolve_path(&self, path: &std::path::Path) -> PathBuf {
        if path.is_relative() {
            self.project_root.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

/// Simple glob matching (supports a single *)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" || pattern == "**" {
        return true;
    }

    if let Some(star_pos) = pattern.find('*') {
        let prefix = &pattern[..star_pos];
        let suffix = &pattern[star_pos + 1..];

        text.len() >= prefix.len() + suffix.len()
            && text.starts_with(prefix)
            && text.ends_with(suffix)
    } else {
        pattern == text
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Create);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert!(config.database.is_none());
        assert_eq!(DatabaseConfig::default().dialect, DatabaseDialect::Postgres);
        assert_eq!(Config::from_toml("[database]").unwrap().database.unwrap().dialect, DatabaseDialect::Postgres);
    }

    #[test]
    fn parse_full_config() {
        let config = Config::from_toml(
            r#"
            mode = "alter"
            concurrency = 8
            skip_tables = ["knex_*", "sessions"]

            [database]
            dialect = "postgres"
            schema = "app"
            tls = true
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Alter);
        assert_eq!(config.concurrency, 8);

        let database = config.database.unwrap();
        assert_eq!(database.dialect, DatabaseDialect::Postgres);
        assert_eq!(database.schema, "app");
        assert!(database.tls);
        assert!(database.url.is_none());
    }

    #[test]
    fn database_defaults() {
        let config = Config::from_toml("[database]\ndialect = \"snapshot\"\nsnapshot = \"db.json\"").unwrap();
        let database = config.database.unwrap();
        assert_eq!(database.schema, "public");
        assert_eq!(database.snapshot, Some(PathBuf::from("db.json")));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = Config::from_toml("concurrency = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn unknown_mode_rejected() {
        let err = Config::from_toml("mode = \"drop\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn config_file_sets_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schemadelta.toml");
        std::fs::write(&path, "mode = \"alter\"\n[database]\ndialect = \"snapshot\"\nsnapshot = \"db.json\"\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.mode, Mode::Alter);
        assert_eq!(loaded.project_root, dir.path());
        assert_eq!(loaded.resolve_path(Path::new("db.json")), dir.path().join("db.json"));
        assert_eq!(loaded.resolve_path(Path::new("/tmp/db.json")), PathBuf::from("/tmp/db.json"));
    }

    #[test]
    fn missing_config_file() {
        let err = Config::from_file(Path::new("/nonexistent/schemadelta.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("knex_*", "knex_migrations"));
        assert!(glob_match("*_lock", "knex_migrations_lock"));
        assert!(!glob_match("knex_*", "Person"));
        assert!(!glob_match("ab*ba", "aba"));
    }
}
