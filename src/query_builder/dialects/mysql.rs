//! MySQL dialect implementation

use super::{DatabaseBackend, SqlDialect};

/// MySQL / MariaDB dialect
///
/// Tables are addressed unqualified because the connection already
/// selects the logical database.
pub struct MySQLDialect;

impl MySQLDialect {
    pub fn new() -> Self {
        MySQLDialect
    }
}

impl Default for MySQLDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for MySQLDialect {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySQL
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn table_name(&self, _db_name: &str, table: &str) -> String {
        table.to_string()
    }

    fn regex_operator(&self) -> Option<&'static str> {
        Some("REGEXP")
    }

    fn json_contains(&self, field: &str) -> Option<(String, String)> {
        Some((format!("json_contains({},", field), ")".to_string()))
    }

    fn empty_insert(&self, table: &str) -> String {
        // MySQL has no DEFAULT VALUES clause
        format!("INSERT INTO {} () VALUES ()", table)
    }

    fn empty_insert_many(&self, table: &str, rows: usize) -> Option<String> {
        Some(format!("INSERT INTO {} () VALUES {}", table, vec!["()"; rows].join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_operators() {
        let dialect = MySQLDialect::new();
        assert_eq!(dialect.regex_operator(), Some("REGEXP"));
        assert_eq!(
            dialect.json_contains("Obj1"),
            Some(("json_contains(Obj1,".to_string(), ")".to_string()))
        );
        assert_eq!(dialect.empty_insert("t"), "INSERT INTO t () VALUES ()");
        assert_eq!(
            dialect.empty_insert_many("t", 3).as_deref(),
            Some("INSERT INTO t () VALUES (), (), ()")
        );
    }
}
