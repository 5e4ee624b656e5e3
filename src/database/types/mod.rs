//! Values moving between requests, statements and drivers
//!
//! Bound arguments, raw driver cells and their normalised form all use
//! [`SqlValue`]. Driver-specific extraction and binding live in the
//! converter modules; [`coerce`] turns raw cells into canonical values.

pub mod coerce;
pub mod mysql_converter;
pub mod postgres_converter;
pub mod value;

pub use coerce::{coerce, coerce_row, rfc3339_nano};
pub use mysql_converter::MySqlTypeConverter;
pub use postgres_converter::PostgresTypeConverter;
pub use value::SqlValue;

/// Name and driver-reported type of a result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Upper-case base type name (`BIGINT`, `VARCHAR`, `JSONB`, ...)
    pub type_name: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, type_name: impl AsRef<str>) -> Self {
        ColumnInfo {
            name: name.into(),
            type_name: base_type_name(type_name.as_ref()),
        }
    }
}

/// Raw result of a query, cells not yet coerced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<SqlValue>>) -> Self {
        RowSet { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Strip modifiers such as `UNSIGNED` or `(11)` from a driver type name
fn base_type_name(type_name: &str) -> String {
    type_name
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}
