//! Dialect-specific finishing passes
//!
//! Runs after a statement has been rendered in the shared shape: table
//! qualification, regex operator resolution, SQL Server paging and the
//! final placeholder serialisation.

use super::dialects::{LimitStyle, SqlDialect};
use super::statement::{strip_quotes, Fragment, RenderedStatement, Statement};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};

/// Table reference as it appears in SQL for this dialect
pub fn table_name(dialect: &dyn SqlDialect, db_name: &str, table: &str) -> String {
    strip_quotes(&dialect.table_name(db_name, table))
}

/// Replace the pending operator of every regex predicate in `markers`
pub fn resolve_regex(stmt: &mut Statement, markers: &[String], dialect: &dyn SqlDialect) -> Result<()> {
    if markers.is_empty() {
        return Ok(());
    }

    let operator = dialect
        .regex_operator()
        .ok_or_else(|| Error::unsupported(dialect.backend(), "$regex"))?;

    for fragment in stmt.fragments_mut().iter_mut() {
        let resolved = matches!(
            fragment,
            Fragment::RegexOperator { field } if markers.iter().any(|m| m == field)
        );
        if resolved {
            *fragment = Fragment::Sql(operator.to_string());
        }
    }
    Ok(())
}

/// Resolve markers and serialise
pub fn finish(mut stmt: Statement, markers: &[String], dialect: &dyn SqlDialect) -> Result<RenderedStatement> {
    resolve_regex(&mut stmt, markers, dialect)?;
    stmt.finish(dialect)
}

/// What a select returns
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Explicit column expressions; empty means `*`
    Columns(Vec<String>),
    Count,
    Distinct(String),
}

/// Clauses of a select before paging is laid out for the dialect
#[derive(Debug, Clone)]
pub struct SelectParts {
    pub projection: Projection,
    pub table: String,
    pub joins: Statement,
    pub filter: Statement,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

/// Lay out a select, placing limit and skip the way the dialect expects
pub fn assemble_select(parts: SelectParts, dialect: &dyn SqlDialect) -> Result<Statement> {
    let style = dialect.limit_style();
    let top = match (style, parts.limit, parts.skip) {
        (LimitStyle::TopOrFetch, Some(limit), None) => Some(limit),
        _ => None,
    };

    if style == LimitStyle::TopOrFetch && parts.skip.is_some() && parts.order_by.is_empty() {
        return Err(Error::invalid_params(
            "sql server cannot process skip operation, sort option is mandatory with skip",
        ));
    }

    let mut stmt = Statement::sql("SELECT ");
    if let Projection::Distinct(_) = parts.projection {
        stmt.push_sql("DISTINCT ");
    }
    if let Some(limit) = top {
        stmt.push_sql(format!("TOP {} ", limit));
    }
    match &parts.projection {
        Projection::Columns(columns) if columns.is_empty() => {
            stmt.push_sql("*");
        }
        Projection::Columns(columns) => {
            stmt.push_sql(columns.join(", "));
        }
        Projection::Count => {
            stmt.push_sql("COUNT(*)");
        }
        Projection::Distinct(field) => {
            stmt.push_ident(field);
        }
    }

    stmt.push_sql(" FROM ").push_ident(&parts.table);
    stmt.append(parts.joins);

    if !parts.filter.is_empty() {
        stmt.push_sql(" WHERE ");
        stmt.append(parts.filter);
    }

    if !parts.order_by.is_empty() {
        stmt.push_sql(" ORDER BY ").push_sql(parts.order_by.join(", "));
    }

    match style {
        LimitStyle::LimitOffset => {
            if let Some(limit) = parts.limit {
                stmt.push_sql(" LIMIT ").push_param(SqlValue::UnsignedBigInt(limit));
            }
            if let Some(skip) = parts.skip {
                stmt.push_sql(" OFFSET ").push_param(SqlValue::UnsignedBigInt(skip));
            }
        }
        LimitStyle::TopOrFetch => {
            if let Some(skip) = parts.skip {
                stmt.push_sql(" OFFSET ")
                    .push_param(SqlValue::UnsignedBigInt(skip))
                    .push_sql(" ROWS");
                if let Some(limit) = parts.limit {
                    stmt.push_sql(" FETCH NEXT ")
                        .push_param(SqlValue::UnsignedBigInt(limit))
                        .push_sql(" ROWS ONLY");
                }
            }
        }
    }

    Ok(stmt)
}
