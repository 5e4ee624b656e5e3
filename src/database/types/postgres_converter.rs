//! PostgreSQL-specific cell extraction and parameter binding

use super::value::SqlValue;
use super::{ColumnInfo, RowSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

/// PostgreSQL type converter
#[derive(Clone, Default)]
pub struct PostgresTypeConverter;

impl PostgresTypeConverter {
    pub fn new() -> Self {
        PostgresTypeConverter
    }

    pub fn columns(row: &PgRow) -> Vec<ColumnInfo> {
        row.columns()
            .iter()
            .map(|column| ColumnInfo::new(column.name(), column.type_info().name()))
            .collect()
    }

    /// Convert fetched rows into a raw row set
    pub fn row_set(rows: &[PgRow]) -> RowSet {
        let columns = rows.first().map(Self::columns).unwrap_or_default();
        let rows = rows.iter().map(Self::extract_row).collect();
        RowSet::new(columns, rows)
    }

    pub fn extract_row(row: &PgRow) -> Vec<SqlValue> {
        (0..row.columns().len())
            .map(|index| Self::extract_value(row, index))
            .collect()
    }

    fn extract_value(row: &PgRow, index: usize) -> SqlValue {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return SqlValue::Null,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Failed to get raw value at index {}: {}", index, e);
                return SqlValue::Null;
            }
        }

        let type_name = row.columns()[index].type_info().name().to_ascii_uppercase();
        log::trace!("Extracting PostgreSQL column {} of type {}", index, type_name);

        let value = match type_name.as_str() {
            "BOOL" => row.try_get::<bool, _>(index).ok().map(SqlValue::Bool),
            "INT2" => row
                .try_get::<i16, _>(index)
                .ok()
                .map(|v| SqlValue::BigInt(i64::from(v))),
            "INT4" => row
                .try_get::<i32, _>(index)
                .ok()
                .map(|v| SqlValue::BigInt(i64::from(v))),
            "INT8" => row.try_get::<i64, _>(index).ok().map(SqlValue::BigInt),
            "FLOAT4" => row
                .try_get::<f32, _>(index)
                .ok()
                .map(|v| SqlValue::Double(f64::from(v))),
            "FLOAT8" => row.try_get::<f64, _>(index).ok().map(SqlValue::Double),
            "NUMERIC" => Self::extract_decimal(row, index),
            "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index).ok().map(SqlValue::Json),
            "TIMESTAMPTZ" => row
                .try_get::<DateTime<Utc>, _>(index)
                .ok()
                .map(|dt| SqlValue::Timestamp(dt.fixed_offset())),
            "TIMESTAMP" => row
                .try_get::<NaiveDateTime, _>(index)
                .ok()
                .map(|dt| SqlValue::Timestamp(dt.and_utc().fixed_offset())),
            "DATE" => row.try_get::<NaiveDate, _>(index).ok().and_then(|d| {
                d.and_hms_opt(0, 0, 0)
                    .map(|dt| SqlValue::Timestamp(dt.and_utc().fixed_offset()))
            }),
            "TIME" => row.try_get::<NaiveTime, _>(index).ok().map(|t| {
                SqlValue::Timestamp(NaiveDate::default().and_time(t).and_utc().fixed_offset())
            }),
            "UUID" => row
                .try_get::<sqlx::types::Uuid, _>(index)
                .ok()
                .map(|u| SqlValue::String(u.to_string())),
            "BYTEA" => row.try_get::<Vec<u8>, _>(index).ok().map(SqlValue::Bytes),
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
                row.try_get::<String, _>(index).ok().map(SqlValue::String)
            }
            _ => None,
        };

        value.unwrap_or_else(|| {
            // Enums and other custom types decode as text
            match row.try_get_unchecked::<String, _>(index) {
                Ok(text) => SqlValue::String(text),
                Err(e) => {
                    log::warn!("Could not extract {} at index {}: {}", type_name, index, e);
                    SqlValue::Null
                }
            }
        })
    }

    #[cfg(feature = "decimal")]
    fn extract_decimal(row: &PgRow, index: usize) -> Option<SqlValue> {
        row.try_get::<rust_decimal::Decimal, _>(index)
            .ok()
            .map(|d| SqlValue::String(d.to_string()))
    }

    #[cfg(not(feature = "decimal"))]
    fn extract_decimal(row: &PgRow, index: usize) -> Option<SqlValue> {
        row.try_get_unchecked::<String, _>(index)
            .ok()
            .map(SqlValue::String)
    }

    /// Bind a SqlValue to a PostgreSQL query
    pub fn bind_param<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: SqlValue,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            // sqlx declares every parameter type; a bytea NULL only fits bytea or
            // untyped positions, other columns need a cast in the statement
            SqlValue::Null => query.bind(None::<Vec<u8>>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::BigInt(i) => query.bind(i),
            // No unsigned types in PostgreSQL
            SqlValue::UnsignedBigInt(u) => match i64::try_from(u) {
                Ok(i) => query.bind(i),
                Err(_) => query.bind(u.to_string()),
            },
            SqlValue::Double(f) => query.bind(f),
            SqlValue::String(s) => query.bind(s),
            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(j),
            SqlValue::Timestamp(ts) => query.bind(ts.with_timezone(&Utc)),
        }
    }
}
