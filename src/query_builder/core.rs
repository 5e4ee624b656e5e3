//! Statement rendering for reads, inserts, updates and deletes
//!
//! The builder renders one shared statement shape for every backend; the
//! dialect only decides names, placeholders and paging at the edges.

use super::dialects::{create_dialect, DatabaseBackend, SqlDialect};
use super::filter::{compile_filter, Filter};
use super::post_process::{self, Projection, SelectParts};
use super::statement::{strip_quotes, RenderedStatement, Statement};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use crate::request::{
    CreateOperation, CreateRequest, FilterSpec, JoinOption, JoinType, ReadOperation, ReadRequest, Row,
};
use serde_json::Value as JsonValue;

/// Field added to rows by debug reads, never selected from the table
pub const FETCH_TS_FIELD: &str = "_dbFetchTs";

/// Main query builder, one per dialect and logical database
pub struct QueryBuilder {
    pub(crate) dialect: Box<dyn SqlDialect>,
    pub(crate) db_name: String,
}

/// A value in an INSERT row
#[derive(Debug, Clone, PartialEq)]
pub enum InsertValue {
    Bind(SqlValue),
    /// SQL expression written into the statement as-is
    Literal(String),
}

/// `column=<expr>` inside an UPDATE's SET list
#[derive(Debug, Clone)]
pub struct Assignment {
    pub column: String,
    pub value: Statement,
}

/// An UPDATE before serialisation; the update compiler rewrites assignments
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub filter: Statement,
    pub regex_markers: Vec<String>,
}

impl UpdateStatement {
    pub fn into_statement(self) -> (Statement, Vec<String>) {
        let mut stmt = Statement::sql("UPDATE ");
        stmt.push_ident(&self.table).push_sql(" SET ");
        for (i, assignment) in self.assignments.into_iter().enumerate() {
            if i > 0 {
                stmt.push_sql(",");
            }
            stmt.push_ident(&assignment.column).push_sql("=");
            stmt.append(assignment.value);
        }
        if !self.filter.is_empty() {
            stmt.push_sql(" WHERE ");
            stmt.append(self.filter);
        }
        (stmt, self.regex_markers)
    }
}

impl QueryBuilder {
    /// Create a new query builder for the specified database backend
    pub fn new(backend: DatabaseBackend) -> Self {
        QueryBuilder {
            dialect: create_dialect(backend),
            db_name: String::new(),
        }
    }

    /// Logical database (schema) used to qualify tables
    pub fn db_name<S: Into<String>>(mut self, db_name: S) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.dialect.backend()
    }

    /// Table name as written into SQL
    pub fn table(&self, col: &str) -> String {
        post_process::table_name(self.dialect(), &self.db_name, col)
    }

    /// Compile a where clause from a main filter plus extra AND-ed filters
    fn where_clause(&self, find: &FilterSpec, match_where: &[FilterSpec]) -> Result<(Statement, Vec<String>)> {
        let mut members = Vec::with_capacity(match_where.len() + 1);
        for spec in match_where {
            members.push(Filter::parse(spec, false)?);
        }
        if !find.is_empty() {
            members.push(Filter::parse(find, false)?);
        }
        let compiled = compile_filter(&Filter::And(members), self.dialect())?;
        Ok((compiled.expr, compiled.regex_markers))
    }

    /// Build a SELECT for a read request
    pub fn render_read(&self, col: &str, req: &ReadRequest) -> Result<RenderedStatement> {
        let options = &req.options;
        let is_join = !options.join.is_empty();

        if is_join && options.select.is_empty() {
            return Err(Error::invalid_params("select cannot be empty when using joins"));
        }

        let (filter, mut markers) = self.where_clause(&req.find, &req.match_where)?;

        let mut joins = Statement::new();
        self.render_joins(&options.join, &mut joins, &mut markers)?;

        let projection = match req.operation {
            ReadOperation::Count => Projection::Count,
            ReadOperation::Distinct => {
                let field = options
                    .distinct
                    .as_ref()
                    .ok_or_else(|| Error::invalid_params("distinct field is required for distinct reads"))?;
                Projection::Distinct(field.clone())
            }
            ReadOperation::One | ReadOperation::All => Projection::Columns(
                options
                    .select
                    .iter()
                    .filter(|key| key.as_str() != FETCH_TS_FIELD)
                    .map(|key| {
                        let key = strip_quotes(key);
                        if is_join {
                            format!("{} AS {}", key, key.replace('.', "__"))
                        } else {
                            key
                        }
                    })
                    .collect(),
            ),
        };

        let order_by = options
            .sort
            .iter()
            .map(|value| match value.strip_prefix('-') {
                Some(field) => format!("{} DESC", strip_quotes(field)),
                None => format!("{} ASC", strip_quotes(value)),
            })
            .collect();

        let stmt = post_process::assemble_select(
            SelectParts {
                projection,
                table: self.table(col),
                joins,
                filter,
                order_by,
                limit: options.limit,
                skip: options.skip,
            },
            self.dialect(),
        )?;

        let rendered = post_process::finish(stmt, &markers, self.dialect())?;

        #[cfg(debug_assertions)]
        {
            log::trace!("QueryBuilder SELECT SQL: {}", rendered.sql);
            log::trace!("  Parameters to bind: {:?}", rendered.args);
        }

        Ok(rendered)
    }

    fn render_joins(&self, joins: &[JoinOption], out: &mut Statement, markers: &mut Vec<String>) -> Result<()> {
        for join in joins {
            let keyword = match join.join_type {
                JoinType::Left => " LEFT JOIN ",
                JoinType::Right => " RIGHT JOIN ",
                JoinType::Inner => " INNER JOIN ",
                JoinType::Outer => {
                    if self.backend() == DatabaseBackend::MySQL {
                        return Err(Error::unsupported(self.backend(), "FULL OUTER JOIN"));
                    }
                    " FULL OUTER JOIN "
                }
            };

            let on = Filter::parse(&join.on, true)?;
            if on.is_empty() {
                return Err(Error::invalid_params(format!(
                    "join on table {} needs an on condition",
                    join.table
                )));
            }
            let compiled = compile_filter(&on, self.dialect())?;
            markers.extend(compiled.regex_markers);

            out.push_sql(keyword).push_ident(&self.table(&join.table)).push_sql(" ON ");
            out.append(compiled.expr);

            self.render_joins(&join.join, out, markers)?;
        }
        Ok(())
    }

    /// Build an INSERT for a create request
    ///
    /// `One` takes a single object; `All` takes an array of objects which
    /// must all carry exactly the same fields.
    pub fn render_create(&self, col: &str, req: &CreateRequest) -> Result<RenderedStatement> {
        match (req.operation, &req.document) {
            (CreateOperation::One, JsonValue::Object(row)) => self.render_insert_row(col, row, &[]),
            (CreateOperation::All, JsonValue::Array(items)) => {
                let rows = items
                    .iter()
                    .map(|item| {
                        item.as_object()
                            .ok_or_else(|| Error::invalid_params("incorrect insert object provided"))
                    })
                    .collect::<Result<Vec<&Row>>>()?;
                self.render_bulk_insert(col, &rows)
            }
            (CreateOperation::One, _) => Err(Error::invalid_params(
                "create with operation one expects a single document",
            )),
            (CreateOperation::All, _) => Err(Error::invalid_params(
                "create with operation all expects an array of documents",
            )),
        }
    }

    /// Single-row INSERT with extra columns set to SQL literals
    pub fn render_insert_row(
        &self,
        col: &str,
        row: &Row,
        literals: &[(String, String)],
    ) -> Result<RenderedStatement> {
        let mut columns: Vec<String> = row.keys().cloned().collect();
        let mut values: Vec<InsertValue> = row
            .values()
            .map(|v| InsertValue::Bind(SqlValue::from_json(v)))
            .collect();
        for (column, literal) in literals {
            columns.push(column.clone());
            values.push(InsertValue::Literal(literal.clone()));
        }
        self.render_insert(col, &columns, vec![values])
    }

    fn render_bulk_insert(&self, col: &str, rows: &[&Row]) -> Result<RenderedStatement> {
        let first = rows
            .first()
            .ok_or_else(|| Error::invalid_params("bulk insert needs at least one document"))?;

        let columns: Vec<String> = first.keys().cloned().collect();
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != columns.len() || !columns.iter().all(|c| row.contains_key(c)) {
                return Err(Error::invalid_params(
                    "all documents of a bulk insert must have the same fields",
                ));
            }
            values.push(
                columns
                    .iter()
                    .map(|c| InsertValue::Bind(SqlValue::from_json(&row[c])))
                    .collect(),
            );
        }

        if columns.is_empty() && rows.len() > 1 {
            let table = self.table(col);
            let sql = self
                .dialect
                .empty_insert_many(&table, rows.len())
                .ok_or_else(|| Error::unsupported(self.backend(), "bulk insert of empty documents"))?;
            return Ok(RenderedStatement::new(sql, Vec::new()));
        }

        self.render_insert(col, &columns, values)
    }

    fn render_insert(&self, col: &str, columns: &[String], rows: Vec<Vec<InsertValue>>) -> Result<RenderedStatement> {
        let table = self.table(col);

        if columns.is_empty() {
            return Ok(RenderedStatement::new(self.dialect.empty_insert(&table), Vec::new()));
        }

        let mut stmt = Statement::sql("INSERT INTO ");
        stmt.push_ident(&table).push_sql(" (");
        let columns: Vec<String> = columns.iter().map(|c| strip_quotes(c)).collect();
        stmt.push_sql(columns.join(", ")).push_sql(") VALUES ");

        for (i, row) in rows.into_iter().enumerate() {
            if i > 0 {
                stmt.push_sql(", ");
            }
            stmt.push_sql("(");
            for (j, value) in row.into_iter().enumerate() {
                if j > 0 {
                    stmt.push_sql(", ");
                }
                match value {
                    InsertValue::Bind(v) => {
                        stmt.push_param(v);
                    }
                    InsertValue::Literal(text) => {
                        stmt.push_sql(text);
                    }
                }
            }
            stmt.push_sql(")");
        }

        let rendered = stmt.finish(self.dialect())?;

        #[cfg(debug_assertions)]
        {
            log::trace!("QueryBuilder INSERT SQL: {}", rendered.sql);
            log::trace!("  Parameters to bind: {:?}", rendered.args);
        }

        Ok(rendered)
    }

    /// Build the plain `SET field=<value>` form of an update for `fields`
    pub fn render_update_base(
        &self,
        col: &str,
        find: &FilterSpec,
        fields: &serde_json::Map<String, JsonValue>,
    ) -> Result<UpdateStatement> {
        if fields.is_empty() {
            return Err(Error::invalid_params("update operator has no fields"));
        }

        let (filter, regex_markers) = self.where_clause(find, &[])?;

        let assignments = fields
            .iter()
            .map(|(column, value)| {
                let mut expr = Statement::new();
                expr.push_param(SqlValue::from_json(value));
                Assignment {
                    column: strip_quotes(column),
                    value: expr,
                }
            })
            .collect();

        Ok(UpdateStatement {
            table: self.table(col),
            assignments,
            filter,
            regex_markers,
        })
    }

    /// Build a DELETE; an empty filter deletes every row
    pub fn render_delete(&self, col: &str, find: &FilterSpec) -> Result<RenderedStatement> {
        let (filter, markers) = self.where_clause(find, &[])?;

        let mut stmt = Statement::sql("DELETE FROM ");
        stmt.push_ident(&self.table(col));
        if !filter.is_empty() {
            stmt.push_sql(" WHERE ");
            stmt.append(filter);
        }

        post_process::finish(stmt, &markers, self.dialect())
    }
}
