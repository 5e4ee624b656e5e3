//! SQL Server dialect implementation

use super::postgres::qualify;
use super::{DatabaseBackend, LimitStyle, SqlDialect};

/// SQL Server dialect
///
/// Named `@pN` parameters, schema-qualified tables, `TOP`/`OFFSET FETCH`
/// paging. No regex predicate and no JSON containment operator.
pub struct SqlServerDialect;

impl SqlServerDialect {
    pub fn new() -> Self {
        SqlServerDialect
    }
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for SqlServerDialect {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::SqlServer
    }

    fn placeholder(&self, position: usize) -> String {
        format!("@p{}", position)
    }

    fn table_name(&self, db_name: &str, table: &str) -> String {
        qualify(db_name, table)
    }

    fn regex_operator(&self) -> Option<&'static str> {
        None
    }

    fn json_contains(&self, _field: &str) -> Option<(String, String)> {
        None
    }

    fn empty_insert(&self, table: &str) -> String {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    }

    fn current_date(&self) -> &'static str {
        "CAST( GETDATE() AS date )"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::TopOrFetch
    }
}
