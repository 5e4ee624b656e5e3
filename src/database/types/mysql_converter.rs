//! MySQL-specific cell extraction and parameter binding

use super::value::SqlValue;
use super::{ColumnInfo, RowSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};

/// MySQL type converter
#[derive(Clone, Default)]
pub struct MySqlTypeConverter;

impl MySqlTypeConverter {
    pub fn new() -> Self {
        MySqlTypeConverter
    }

    /// Column descriptions of a result row
    pub fn columns(row: &MySqlRow) -> Vec<ColumnInfo> {
        row.columns()
            .iter()
            .map(|column| ColumnInfo::new(column.name(), column.type_info().name()))
            .collect()
    }

    /// Convert fetched rows into a raw row set
    pub fn row_set(rows: &[MySqlRow]) -> RowSet {
        let columns = rows.first().map(Self::columns).unwrap_or_default();
        let rows = rows.iter().map(Self::extract_row).collect();
        RowSet::new(columns, rows)
    }

    /// Pull every cell of a row out as a raw value
    pub fn extract_row(row: &MySqlRow) -> Vec<SqlValue> {
        (0..row.columns().len())
            .map(|index| Self::extract_value(row, index))
            .collect()
    }

    fn extract_value(row: &MySqlRow, index: usize) -> SqlValue {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return SqlValue::Null,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Failed to get raw value at index {}: {}", index, e);
                return SqlValue::Null;
            }
        }

        let type_name = row.columns()[index].type_info().name().to_ascii_uppercase();
        log::trace!("Extracting MySQL column {} of type {}", index, type_name);

        let value = match type_name.as_str() {
            "BOOLEAN" => row.try_get::<bool, _>(index).ok().map(SqlValue::Bool),
            "TINYINT" => row
                .try_get::<i8, _>(index)
                .ok()
                .map(|v| SqlValue::BigInt(i64::from(v)))
                .or_else(|| row.try_get::<bool, _>(index).ok().map(SqlValue::Bool)),
            "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                row.try_get::<i64, _>(index).ok().map(SqlValue::BigInt)
            }
            t if t.ends_with("UNSIGNED") => row
                .try_get::<u64, _>(index)
                .ok()
                .map(SqlValue::UnsignedBigInt),
            "FLOAT" => row
                .try_get::<f32, _>(index)
                .ok()
                .map(|v| SqlValue::Double(f64::from(v))),
            "DOUBLE" | "REAL" => row.try_get::<f64, _>(index).ok().map(SqlValue::Double),
            "DECIMAL" | "NUMERIC" => Self::extract_decimal(row, index),
            "BIT" => row
                .try_get::<u64, _>(index)
                .ok()
                .map(|v| SqlValue::Bool(v != 0))
                .or_else(|| row.try_get::<bool, _>(index).ok().map(SqlValue::Bool)),
            "JSON" => row.try_get::<JsonValue, _>(index).ok().map(SqlValue::Json),
            "DATETIME" => row
                .try_get::<NaiveDateTime, _>(index)
                .ok()
                .map(|dt| SqlValue::Timestamp(dt.and_utc().fixed_offset())),
            "TIMESTAMP" => row
                .try_get::<DateTime<Utc>, _>(index)
                .ok()
                .map(|dt| SqlValue::Timestamp(dt.fixed_offset())),
            "DATE" => row.try_get::<NaiveDate, _>(index).ok().and_then(|d| {
                d.and_hms_opt(0, 0, 0)
                    .map(|dt| SqlValue::Timestamp(dt.and_utc().fixed_offset()))
            }),
            "TIME" => row.try_get::<NaiveTime, _>(index).ok().map(|t| {
                SqlValue::Timestamp(NaiveDate::default().and_time(t).and_utc().fixed_offset())
            }),
            "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
                row.try_get::<String, _>(index).ok().map(SqlValue::String)
            }
            _ => None,
        };

        value.unwrap_or_else(|| {
            // Unknown or mismatched types fall back to the raw payload
            match row.try_get_unchecked::<Vec<u8>, _>(index) {
                Ok(bytes) => SqlValue::Bytes(bytes),
                Err(e) => {
                    log::warn!("Could not extract {} at index {}: {}", type_name, index, e);
                    SqlValue::Null
                }
            }
        })
    }

    #[cfg(feature = "decimal")]
    fn extract_decimal(row: &MySqlRow, index: usize) -> Option<SqlValue> {
        row.try_get::<rust_decimal::Decimal, _>(index)
            .ok()
            .map(|d| SqlValue::String(d.to_string()))
    }

    #[cfg(not(feature = "decimal"))]
    fn extract_decimal(row: &MySqlRow, index: usize) -> Option<SqlValue> {
        row.try_get_unchecked::<String, _>(index)
            .ok()
            .map(SqlValue::String)
    }

    /// Bind a SqlValue to a MySQL query
    pub fn bind_param<'q>(
        query: Query<'q, MySql, MySqlArguments>,
        value: SqlValue,
    ) -> Query<'q, MySql, MySqlArguments> {
        match value {
            SqlValue::Null => query.bind(None::<Vec<u8>>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::BigInt(i) => query.bind(i),
            SqlValue::UnsignedBigInt(u) => query.bind(u),
            SqlValue::Double(f) => query.bind(f),
            SqlValue::String(s) => query.bind(s),
            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(j),
            // DATETIME carries no zone
            SqlValue::Timestamp(ts) => query.bind(ts.naive_utc()),
        }
    }
}
