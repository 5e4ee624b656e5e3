//! Shaping of coerced rows into a read response
//!
//! Join reads come back as flat rows whose columns are aliased
//! `table__column`. They are folded back into one object per root row,
//! with each joined table nested under its parent.

use crate::database::types::rfc3339_nano;
use crate::error::{Error, Result};
use crate::query_builder::FETCH_TS_FIELD;
use crate::request::{JoinOption, ReadData, ReadOperation, ReadResponse, Row};
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Build the response for a read from its coerced rows
pub fn shape_response(
    operation: ReadOperation,
    col: &str,
    rows: Vec<Row>,
    joins: &[JoinOption],
    debug: bool,
) -> Result<ReadResponse> {
    if operation == ReadOperation::Count {
        let count = rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| Error::no_response("query returned no rows"))?;
        return Ok(ReadResponse {
            count,
            data: ReadData::Count(count),
        });
    }

    let mut items = if joins.is_empty() {
        rows
    } else {
        nest_rows(col, &rows, joins)
    };

    if debug {
        let ts = JsonValue::String(rfc3339_nano(&Utc::now()));
        for item in items.iter_mut() {
            item.insert(FETCH_TS_FIELD.to_string(), ts.clone());
        }
    }

    match operation {
        ReadOperation::One => {
            let row = items
                .into_iter()
                .next()
                .ok_or_else(|| Error::no_response("query returned no rows"))?;
            Ok(ReadResponse {
                count: 1,
                data: ReadData::Row(row),
            })
        }
        _ => Ok(ReadResponse {
            count: items.len() as i64,
            data: ReadData::Rows(items.into_iter().map(JsonValue::Object).collect()),
        }),
    }
}

#[derive(Debug, Default)]
struct Node {
    fields: Row,
    children: IndexMap<String, Children>,
}

#[derive(Debug)]
struct Children {
    single: bool,
    nodes: IndexMap<String, Node>,
}

/// Columns of `table` in a flat row, with the prefix removed
fn table_fields(row: &Row, table: &str, is_root: bool) -> Row {
    let prefix = format!("{}__", table);
    row.iter()
        .filter_map(|(key, value)| match key.strip_prefix(&prefix) {
            Some(column) => Some((column.to_string(), value.clone())),
            // Unaliased columns belong to the root
            None if is_root && !key.contains("__") => Some((key.clone(), value.clone())),
            None => None,
        })
        .collect()
}

fn identity(fields: &Row) -> String {
    JsonValue::Object(fields.clone()).to_string()
}

fn merge_joins(node: &mut Node, row: &Row, joins: &[JoinOption]) {
    for join in joins {
        let children = node
            .children
            .entry(join.nested_name().to_string())
            .or_insert_with(|| Children {
                single: join.op == Some(ReadOperation::One),
                nodes: IndexMap::new(),
            });

        let fields = table_fields(row, &join.table, false);
        // Unmatched side of an outer join
        if fields.values().all(JsonValue::is_null) {
            continue;
        }

        let child = children.nodes.entry(identity(&fields)).or_insert_with(|| Node {
            fields,
            children: IndexMap::new(),
        });
        merge_joins(child, row, &join.join);
    }
}

fn into_row(node: Node) -> Row {
    let mut row = node.fields;
    for (name, children) in node.children {
        let mut nested = children.nodes.into_values().map(into_row);
        let value = if children.single {
            JsonValue::Object(nested.next().unwrap_or_default())
        } else {
            JsonValue::Array(nested.map(JsonValue::Object).collect())
        };
        row.insert(name, value);
    }
    row
}

/// Fold flat join rows into nested documents, preserving first-seen order
pub fn nest_rows(col: &str, rows: &[Row], joins: &[JoinOption]) -> Vec<Row> {
    let mut roots: IndexMap<String, Node> = IndexMap::new();

    for row in rows {
        let fields = table_fields(row, col, true);
        let root = roots.entry(identity(&fields)).or_insert_with(|| Node {
            fields,
            children: IndexMap::new(),
        });
        merge_joins(root, row, joins);
    }

    roots.into_values().map(into_row).collect()
}
