//! Insert-if-absent-else-update
//!
//! Every statement an upsert may run is rendered up front into an
//! [`UpsertPlan`], so a malformed request fails before anything reaches
//! the database. The plan then runs as a small state machine on one
//! transaction: the existence check and the write it selects share it.

use crate::database::session::Transaction;
use crate::error::{Error, OptionExt, Result};
use crate::query_builder::update::current_date_literal;
use crate::query_builder::{compile_update, QueryBuilder, RenderedStatement, UpdateOperator};
use crate::request::{FilterSpec, ReadOperation, ReadRequest, Row};
use serde_json::{Map, Value as JsonValue};

/// Statements for every branch of an upsert
#[derive(Debug, Clone)]
pub struct UpsertPlan {
    pub check: RenderedStatement,
    pub insert: RenderedStatement,
    pub updates: Vec<RenderedStatement>,
}

#[derive(Debug)]
enum UpsertState {
    Checking,
    Inserting,
    Updating,
    Done(u64),
}

/// Render the statements of every operator key in `update`, in order
pub fn compile_update_all(
    builder: &QueryBuilder,
    col: &str,
    find: &FilterSpec,
    update: &Map<String, JsonValue>,
) -> Result<Vec<RenderedStatement>> {
    if update.is_empty() {
        return Err(Error::invalid_params("update has no operators"));
    }
    update
        .keys()
        .map(|key| {
            let op = UpdateOperator::parse(key)?;
            compile_update(builder, col, find, update, op)
        })
        .collect()
}

/// Collapse a filter into plain field values for the insert branch
///
/// Operator objects contribute their payload; `$or` groups are skipped.
pub fn flatten_find(find: &FilterSpec) -> Row {
    let mut doc = Row::new();
    for (field, value) in find {
        if field.starts_with('$') {
            continue;
        }
        match value {
            JsonValue::Object(ops) => {
                if let Some(payload) = ops.values().next() {
                    doc.insert(field.clone(), payload.clone());
                }
            }
            other => {
                doc.insert(field.clone(), other.clone());
            }
        }
    }
    doc
}

/// Document and SQL literals inserted when no row matches
pub fn insert_document(
    builder: &QueryBuilder,
    find: &FilterSpec,
    update: &Map<String, JsonValue>,
) -> Result<(Row, Vec<(String, String)>)> {
    let mut doc = flatten_find(find);
    let mut literals = Vec::new();

    for (key, fields) in update {
        let op = UpdateOperator::parse(key)?;
        let fields = fields
            .as_object()
            .or_invalid(format!("{} expects an object of fields", op))?;

        for (field, value) in fields {
            if op == UpdateOperator::CurrentDate {
                doc.remove(field);
                literals.retain(|(column, _): &(String, String)| column != field);
                literals.push((field.clone(), current_date_literal(builder, field, value)?));
            } else {
                literals.retain(|(column, _): &(String, String)| column != field);
                doc.insert(field.clone(), value.clone());
            }
        }
    }

    Ok((doc, literals))
}

impl UpsertPlan {
    pub fn build(
        builder: &QueryBuilder,
        col: &str,
        find: &FilterSpec,
        update: &Map<String, JsonValue>,
    ) -> Result<Self> {
        let updates = compile_update_all(builder, col, find, update)?;

        let check = builder.render_read(
            col,
            &ReadRequest::new(ReadOperation::All).find(find.clone()),
        )?;

        let (doc, literals) = insert_document(builder, find, update)?;
        let insert = builder.render_insert_row(col, &doc, &literals)?;

        Ok(UpsertPlan {
            check,
            insert,
            updates,
        })
    }

    /// Run the plan on `tx`; the caller commits or rolls back
    pub async fn execute(self, tx: &mut dyn Transaction) -> Result<u64> {
        let UpsertPlan {
            check,
            insert,
            updates,
        } = self;
        let mut state = UpsertState::Checking;

        loop {
            state = match state {
                UpsertState::Checking => {
                    let existing = tx.query(&check.sql, check.args.clone()).await?;
                    log::trace!("Upsert check matched {} rows", existing.len());
                    if existing.is_empty() {
                        UpsertState::Inserting
                    } else {
                        UpsertState::Updating
                    }
                }
                UpsertState::Inserting => {
                    let count = tx.execute(&insert.sql, insert.args.clone()).await?;
                    UpsertState::Done(count)
                }
                UpsertState::Updating => {
                    let mut total = 0;
                    for stmt in &updates {
                        total += tx.execute(&stmt.sql, stmt.args.clone()).await?;
                    }
                    UpsertState::Done(total)
                }
                UpsertState::Done(count) => return Ok(count),
            };
        }
    }
}
