//! Engine configuration
//!
//! Loaded from TOML (with the `config` feature) and overridable through
//! `SQLCRUD_*` environment variables.

#[cfg(feature = "config")]
use crate::error::ErrorContext;
use crate::error::{Error, Result};
use crate::query_builder::DatabaseBackend;
use serde::{Deserialize, Serialize};
use std::env;
#[cfg(feature = "config")]
use std::fs;
#[cfg(feature = "config")]
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_dialect")]
    pub dialect: DatabaseBackend,

    /// Logical database used to qualify table names
    #[serde(default)]
    pub db_name: String,

    /// Limit applied to reads that do not set one; never applied to counts
    #[serde(default)]
    pub query_fetch_limit: Option<u64>,

    #[serde(default = "default_log_statements")]
    pub log_statements: bool,

    /// Tables whose statements are never logged
    #[serde(default)]
    pub quiet_tables: Vec<String>,
}

fn default_dialect() -> DatabaseBackend {
    DatabaseBackend::MySQL
}

fn default_log_statements() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            dialect: default_dialect(),
            db_name: String::new(),
            query_fetch_limit: None,
            log_statements: default_log_statements(),
            quiet_tables: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn new(dialect: DatabaseBackend, db_name: impl Into<String>) -> Self {
        EngineConfig {
            dialect,
            db_name: db_name.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file, then apply environment overrides
    #[cfg(feature = "config")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let content = fs::read_to_string(path_ref).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;

        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("config file '{}'", path_ref.display()))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "config")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse config: {}. Check TOML syntax.", e)))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dialect) = env::var("SQLCRUD_DIALECT") {
            self.dialect = DatabaseBackend::parse(&dialect)
                .ok_or_else(|| Error::config(format!("Invalid SQLCRUD_DIALECT value '{}'", dialect)))?;
        }
        if let Ok(db_name) = env::var("SQLCRUD_DB_NAME") {
            self.db_name = db_name;
        }
        if let Ok(limit) = env::var("SQLCRUD_FETCH_LIMIT") {
            self.query_fetch_limit = Some(
                limit
                    .parse()
                    .map_err(|_| Error::config("Invalid SQLCRUD_FETCH_LIMIT value"))?,
            );
        }
        if let Ok(flag) = env::var("SQLCRUD_LOG_STATEMENTS") {
            self.log_statements = flag
                .parse()
                .map_err(|_| Error::config("Invalid SQLCRUD_LOG_STATEMENTS value"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dialect != DatabaseBackend::MySQL && self.db_name.trim().is_empty() {
            return Err(Error::config(format!(
                "db_name is required for the {} dialect",
                self.dialect
            )));
        }
        if self.query_fetch_limit == Some(0) {
            return Err(Error::config("query_fetch_limit cannot be 0"));
        }
        Ok(())
    }

    /// Whether statements against `table` should be logged
    pub fn logs_table(&self, table: &str) -> bool {
        self.log_statements && !self.quiet_tables.iter().any(|t| t == table)
    }
}
