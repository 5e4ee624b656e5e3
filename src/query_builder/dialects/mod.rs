//! Per-dialect SQL differences
//!
//! Everything that varies between backends (placeholder syntax, schema
//! qualification, operator spellings, limit handling) is answered by a
//! [`SqlDialect`] value instead of being switched on at each call site.

use crate::database::types::SqlValue;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Database backends supported by sqlcrud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[serde(alias = "mariadb")]
    MySQL,
    #[serde(alias = "postgresql")]
    Postgres,
    #[serde(alias = "mssql")]
    SqlServer,
}

impl DatabaseBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseBackend::MySQL => "mysql",
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::SqlServer => "sqlserver",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(DatabaseBackend::MySQL),
            "postgres" | "postgresql" => Some(DatabaseBackend::Postgres),
            "sqlserver" | "mssql" => Some(DatabaseBackend::SqlServer),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How limit and skip are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT ? OFFSET ?`
    LimitOffset,
    /// `SELECT TOP n` or `OFFSET ? ROWS FETCH NEXT ? ROWS ONLY`
    TopOrFetch,
}

/// Trait for database-specific SQL generation
pub trait SqlDialect: Send + Sync {
    fn backend(&self) -> DatabaseBackend;

    /// Generate a parameter placeholder for the given 1-based position
    fn placeholder(&self, position: usize) -> String;

    /// Name a table, qualifying it with the logical database when the dialect needs it
    fn table_name(&self, db_name: &str, table: &str) -> String;

    /// Operator replacing `=` in a regex predicate, if the dialect has one
    fn regex_operator(&self) -> Option<&'static str>;

    /// JSON containment predicate for `field`, as the text before and
    /// after its single placeholder
    fn json_contains(&self, field: &str) -> Option<(String, String)>;

    /// Argument bound for a JSON containment operand
    fn json_contains_arg(&self, value: &JsonValue) -> Result<SqlValue> {
        Ok(SqlValue::String(serde_json::to_string(value)?))
    }

    /// Whole statement inserting one all-default row
    fn empty_insert(&self, table: &str) -> String;

    /// Whole statement inserting `rows` all-default rows, if the dialect
    /// can write more than one in a single statement
    fn empty_insert_many(&self, table: &str, rows: usize) -> Option<String> {
        (rows == 1).then(|| self.empty_insert(table))
    }

    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn current_date(&self) -> &'static str {
        "CURRENT_DATE"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    /// Whether `$set` on `a.b` becomes a JSON path merge
    fn supports_json_path_set(&self) -> bool {
        false
    }
}

pub mod mysql;
pub mod postgres;
pub mod sqlserver;

pub use mysql::MySQLDialect;
pub use postgres::PostgresDialect;
pub use sqlserver::SqlServerDialect;

/// Factory function to create the appropriate dialect for a database backend
pub fn create_dialect(backend: DatabaseBackend) -> Box<dyn SqlDialect> {
    match backend {
        DatabaseBackend::MySQL => Box::new(MySQLDialect::new()),
        DatabaseBackend::Postgres => Box::new(PostgresDialect::new()),
        DatabaseBackend::SqlServer => Box::new(SqlServerDialect::new()),
    }
}
