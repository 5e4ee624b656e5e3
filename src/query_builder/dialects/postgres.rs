//! PostgreSQL dialect implementation
//!
//! Tables live in a schema named after the logical database, JSON columns
//! are expected to be JSONB so containment and path updates can use the
//! native operators.

use super::{DatabaseBackend, SqlDialect};
use crate::database::types::SqlValue;
use crate::error::Result;
use serde_json::Value as JsonValue;

pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        PostgresDialect
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for PostgresDialect {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn table_name(&self, db_name: &str, table: &str) -> String {
        qualify(db_name, table)
    }

    fn regex_operator(&self) -> Option<&'static str> {
        Some("~")
    }

    fn json_contains(&self, field: &str) -> Option<(String, String)> {
        Some((format!("{} @> ", field), String::new()))
    }

    // `@>` has no jsonb/text overload, so the operand must reach the server typed as jsonb
    fn json_contains_arg(&self, value: &JsonValue) -> Result<SqlValue> {
        Ok(SqlValue::Json(value.clone()))
    }

    fn empty_insert(&self, table: &str) -> String {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    }

    fn supports_json_path_set(&self) -> bool {
        true
    }
}

/// `<schema>.<table>`, or the bare table when no schema is configured
pub(crate) fn qualify(db_name: &str, table: &str) -> String {
    if db_name.is_empty() {
        table.to_string()
    } else {
        format!("{}.{}", db_name, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_operators() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.regex_operator(), Some("~"));
        assert_eq!(
            dialect.json_contains("Obj1"),
            Some(("Obj1 @> ".to_string(), String::new()))
        );
        assert!(dialect.supports_json_path_set());
    }

    #[test]
    fn test_contains_operand_is_jsonb() {
        let value = serde_json::json!({"a": [1, 2]});
        assert_eq!(
            PostgresDialect::new().json_contains_arg(&value).unwrap(),
            SqlValue::Json(value)
        );
    }

    #[test]
    fn test_unqualified_without_schema() {
        assert_eq!(PostgresDialect::new().table_name("", "users"), "users");
    }
}
