//! Update operator compilation
//!
//! Every operator starts from the plain `SET field=<value>` statement and
//! rewrites the value expression of each assignment. Operators that write
//! a SQL literal drop the bound value instead of leaving a placeholder.

use super::core::{QueryBuilder, UpdateStatement};
use super::post_process;
use super::statement::{RenderedStatement, Statement};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use crate::request::FilterSpec;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Recognised update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    Set,
    Inc,
    Mul,
    Max,
    Min,
    CurrentDate,
}

impl UpdateOperator {
    pub const ALL: [UpdateOperator; 6] = [
        UpdateOperator::Set,
        UpdateOperator::Inc,
        UpdateOperator::Mul,
        UpdateOperator::Max,
        UpdateOperator::Min,
        UpdateOperator::CurrentDate,
    ];

    /// Parse an operator key; unknown keys (`$push`, `$unset`, ...) are rejected
    pub fn parse(key: &str) -> Result<Self> {
        match key {
            "$set" => Ok(UpdateOperator::Set),
            "$inc" => Ok(UpdateOperator::Inc),
            "$mul" => Ok(UpdateOperator::Mul),
            "$max" => Ok(UpdateOperator::Max),
            "$min" => Ok(UpdateOperator::Min),
            "$currentDate" => Ok(UpdateOperator::CurrentDate),
            other => Err(Error::invalid_params(format!(
                "unsupported update operator {}",
                other
            ))),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            UpdateOperator::Set => "$set",
            UpdateOperator::Inc => "$inc",
            UpdateOperator::Mul => "$mul",
            UpdateOperator::Max => "$max",
            UpdateOperator::Min => "$min",
            UpdateOperator::CurrentDate => "$currentDate",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            UpdateOperator::Inc | UpdateOperator::Mul | UpdateOperator::Max | UpdateOperator::Min
        )
    }
}

impl fmt::Display for UpdateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Translate a `$currentDate` operand (`{"$type": "date"|"timestamp"}`) to SQL
pub fn current_date_literal(builder: &QueryBuilder, field: &str, operand: &JsonValue) -> Result<String> {
    let spec = operand.as_object().ok_or_else(|| {
        Error::invalid_format(format!("invalid current date format provided for {}", field))
    })?;

    let kind = match spec.get("$type") {
        Some(kind) if spec.len() == 1 => kind,
        _ => {
            return Err(Error::invalid_format(format!(
                "current date for {} must be exactly {{\"$type\": \"date\"|\"timestamp\"}}",
                field
            )))
        }
    };

    let literal = match kind.as_str() {
        Some("date") => builder.dialect().current_date(),
        Some("timestamp") => builder.dialect().current_timestamp(),
        _ => {
            return Err(Error::invalid_format(format!(
                "invalid current date type ({}) provided for {}",
                kind, field
            )))
        }
    };
    Ok(literal.to_string())
}

fn ensure_numeric(field: &str, value: &JsonValue) -> Result<()> {
    if value.is_number() {
        Ok(())
    } else {
        Err(Error::invalid_format(format!(
            "invalid data format provided for {}: expected a number",
            field
        )))
    }
}

/// Compile one operator of an update request into an executable statement
pub fn compile_update(
    builder: &QueryBuilder,
    col: &str,
    find: &FilterSpec,
    update: &Map<String, JsonValue>,
    op: UpdateOperator,
) -> Result<RenderedStatement> {
    let fields = update
        .get(op.key())
        .ok_or_else(|| Error::invalid_params(format!("update has no {} operator", op)))?
        .as_object()
        .ok_or_else(|| Error::invalid_params(format!("{} expects an object of fields", op)))?;

    if op.is_numeric() {
        for (field, value) in fields {
            ensure_numeric(field, value)?;
        }
    }

    let mut base = builder.render_update_base(col, find, fields)?;
    rewrite_assignments(builder, &mut base, fields, op)?;

    let (stmt, markers) = base.into_statement();
    let rendered = post_process::finish(stmt, &markers, builder.dialect())?;

    #[cfg(debug_assertions)]
    {
        log::trace!("QueryBuilder UPDATE ({}) SQL: {}", op, rendered.sql);
        log::trace!("  Parameters to bind: {:?}", rendered.args);
    }

    Ok(rendered)
}

fn rewrite_assignments(
    builder: &QueryBuilder,
    base: &mut UpdateStatement,
    fields: &Map<String, JsonValue>,
    op: UpdateOperator,
) -> Result<()> {
    for (assignment, (field, operand)) in base.assignments.iter_mut().zip(fields.iter()) {
        let column = assignment.column.clone();
        let mut value = Statement::new();

        match op {
            UpdateOperator::Set => {
                let path: Vec<&str> = column.split('.').collect();
                if path.len() >= 2 && builder.dialect().supports_json_path_set() {
                    value
                        .push_sql(format!("jsonb_set({}, '{{{}}}', ", path[0], path[1..].join(",")))
                        .push_param(SqlValue::Json(operand.clone()))
                        .push_sql(")");
                    assignment.column = path[0].to_string();
                } else {
                    value.push_param(SqlValue::from_json(operand));
                }
            }
            UpdateOperator::Inc => {
                value
                    .push_sql(format!("{}+", column))
                    .push_param(SqlValue::from_json(operand));
            }
            UpdateOperator::Mul => {
                value
                    .push_sql(format!("{}*", column))
                    .push_param(SqlValue::from_json(operand));
            }
            UpdateOperator::Max => {
                value
                    .push_sql(format!("GREATEST({},", column))
                    .push_param(SqlValue::from_json(operand))
                    .push_sql(")");
            }
            UpdateOperator::Min => {
                value
                    .push_sql(format!("LEAST({},", column))
                    .push_param(SqlValue::from_json(operand))
                    .push_sql(")");
            }
            UpdateOperator::CurrentDate => {
                value.push_sql(current_date_literal(builder, field, operand)?);
            }
        }

        assignment.value = value;
    }
    Ok(())
}
