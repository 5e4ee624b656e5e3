//! Normalisation of raw driver cells
//!
//! Drivers hand back the same logical value in different shapes depending
//! on backend, column type and even query shape (a MySQL TINYINT may be
//! text `"1"` or an integer `1`). [`coerce`] maps all of them onto one
//! canonical form. Canonical values pass through unchanged, so applying
//! it twice is the same as applying it once.

use super::value::SqlValue;
use super::ColumnInfo;
use crate::query_builder::DatabaseBackend;
use crate::request::Row;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use serde_json::Value as JsonValue;

/// Normalise one cell given the column's reported type name
pub fn coerce(value: SqlValue, type_name: &str, backend: DatabaseBackend) -> SqlValue {
    let type_name = type_name.to_ascii_uppercase();
    let type_name = type_name.as_str();

    match value {
        SqlValue::String(text) => coerce_string(text, type_name, backend),
        SqlValue::Bytes(bytes) => coerce_bytes(bytes, type_name, backend),
        SqlValue::BigInt(i) if type_name == "TINYINT" => SqlValue::Bool(i == 1),
        SqlValue::Timestamp(ts) => SqlValue::String(format_time(&ts, type_name)),
        other => other,
    }
}

/// Coerce a full result row and key it by column name
pub fn coerce_row(columns: &[ColumnInfo], values: Vec<SqlValue>, backend: DatabaseBackend) -> Row {
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| {
            let value = coerce(value, &column.type_name, backend);
            (column.name.clone(), value.to_json())
        })
        .collect()
}

fn coerce_string(text: String, type_name: &str, backend: DatabaseBackend) -> SqlValue {
    if matches!(type_name, "JSON" | "JSONB") {
        if let Ok(parsed) = serde_json::from_str::<JsonValue>(&text) {
            return SqlValue::Json(parsed);
        }
    }

    if backend == DatabaseBackend::SqlServer || type_name == "NVARCHAR" {
        if looks_like_json(&text) {
            if let Ok(parsed) = serde_json::from_str::<JsonValue>(&text) {
                return SqlValue::Json(parsed);
            }
        }
        return SqlValue::String(text);
    }

    // Numeric and boolean text arrives as strings from some decoders
    match type_name {
        "TINYINT" | "BIGINT" | "INT" | "SMALLINT" | "DECIMAL" | "NUMERIC" | "FLOAT" => {
            coerce_text(text, type_name, backend)
        }
        "DATETIME" if backend == DatabaseBackend::MySQL => coerce_text(text, type_name, backend),
        _ => SqlValue::String(text),
    }
}

fn coerce_bytes(bytes: Vec<u8>, type_name: &str, backend: DatabaseBackend) -> SqlValue {
    match type_name {
        "BIT" => match bytes.first() {
            Some(first) => SqlValue::Bool(*first == 1),
            None => SqlValue::Bytes(bytes),
        },
        "JSON" | "JSONB" => match serde_json::from_slice::<JsonValue>(&bytes) {
            Ok(parsed) => SqlValue::Json(parsed),
            Err(_) => SqlValue::Bytes(bytes),
        },
        "VARCHAR" | "CHAR" | "TEXT" | "NAME" | "BPCHAR" | "TIMESTAMP" | "TIME" | "DATE" => {
            SqlValue::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        "TINYINT" | "BIGINT" | "INT" | "SMALLINT" | "DECIMAL" | "NUMERIC" | "FLOAT" | "DATETIME" => {
            coerce_text(String::from_utf8_lossy(&bytes).into_owned(), type_name, backend)
        }
        _ => SqlValue::Bytes(bytes),
    }
}

/// Parse weakly typed text; on failure the text is kept and a warning logged
fn coerce_text(text: String, type_name: &str, backend: DatabaseBackend) -> SqlValue {
    match type_name {
        "TINYINT" => match parse_bool(&text) {
            Some(b) => SqlValue::Bool(b),
            None => {
                log::warn!("Could not parse TINYINT value '{}' as bool", text);
                SqlValue::String(text)
            }
        },
        "BIGINT" | "INT" | "SMALLINT" => match text.trim().parse::<i64>() {
            Ok(i) => SqlValue::BigInt(i),
            Err(e) => {
                log::warn!("Could not parse {} value '{}': {}", type_name, text, e);
                SqlValue::String(text)
            }
        },
        "DECIMAL" | "NUMERIC" | "FLOAT" => match text.trim().parse::<f64>() {
            Ok(f) => SqlValue::Double(f),
            Err(e) => {
                log::warn!("Could not parse {} value '{}': {}", type_name, text, e);
                SqlValue::String(text)
            }
        },
        "DATETIME" if backend == DatabaseBackend::MySQL => {
            match NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f") {
                Ok(naive) => SqlValue::String(rfc3339_nano(&naive.and_utc())),
                Err(e) => {
                    // Already canonical output lands here as well
                    log::trace!("DATETIME value '{}' kept as is: {}", text, e);
                    SqlValue::String(text)
                }
            }
        }
        _ => SqlValue::String(text),
    }
}

/// Boolean spellings accepted for TINYINT text
fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn looks_like_json(text: &str) -> bool {
    (text.starts_with('{') && text.ends_with('}')) || (text.starts_with('[') && text.ends_with(']'))
}

fn format_time(ts: &DateTime<FixedOffset>, type_name: &str) -> String {
    match type_name {
        "TIME" => format!("{}{}", ts.format("%H:%M:%S"), trimmed_fraction(ts.nanosecond())),
        "DATE" => ts.format("%Y-%m-%d").to_string(),
        _ => rfc3339_nano(&ts.with_timezone(&Utc)),
    }
}

/// UTC RFC-3339 with the fractional second trimmed of trailing zeros
pub fn rfc3339_nano(ts: &DateTime<Utc>) -> String {
    format!(
        "{}{}Z",
        ts.format("%Y-%m-%dT%H:%M:%S"),
        trimmed_fraction(ts.nanosecond())
    )
}

fn trimmed_fraction(nanos: u32) -> String {
    // Leap seconds are reported as nanos >= 1e9
    let nanos = nanos % 1_000_000_000;
    if nanos == 0 {
        return String::new();
    }
    let digits = format!("{:09}", nanos);
    format!(".{}", digits.trim_end_matches('0'))
}
