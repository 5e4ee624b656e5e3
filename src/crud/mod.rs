//! Request execution against a database session
//!
//! [`SqlCrud`] renders requests with a [`QueryBuilder`] and hands the
//! resulting statements to a [`DatabaseSession`]. Writes that span more
//! than one statement run inside a single transaction.

pub mod read;
pub mod upsert;

pub use read::{nest_rows, shape_response};
pub use upsert::{compile_update_all, flatten_find, insert_document, UpsertPlan};

use crate::config::EngineConfig;
use crate::database::session::{DatabaseSession, Transaction};
use crate::database::types::{coerce_row, RowSet, SqlValue};
use crate::error::{Error, ErrorChain, Result};
use crate::query_builder::{DatabaseBackend, QueryBuilder, RenderedStatement};
use crate::request::{
    BatchRequest, CreateRequest, DeleteRequest, ReadOperation, ReadRequest, ReadResponse, Row,
    UpdateOperation, UpdateRequest,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// A write prepared for execution
enum WritePlan {
    Single(RenderedStatement),
    Many(Vec<RenderedStatement>),
    Upsert(UpsertPlan),
}

impl WritePlan {
    async fn execute(self, tx: &mut dyn Transaction) -> Result<u64> {
        match self {
            WritePlan::Single(stmt) => tx.execute(&stmt.sql, stmt.args).await,
            WritePlan::Many(stmts) => {
                let mut total = 0;
                for stmt in stmts {
                    total += tx.execute(&stmt.sql, stmt.args).await?;
                }
                Ok(total)
            }
            WritePlan::Upsert(plan) => plan.execute(tx).await,
        }
    }
}

/// CRUD engine for one logical database
pub struct SqlCrud {
    builder: QueryBuilder,
    config: EngineConfig,
    session: Arc<dyn DatabaseSession>,
}

impl SqlCrud {
    pub fn new(config: EngineConfig, session: Arc<dyn DatabaseSession>) -> Result<Self> {
        config.validate()?;
        if session.backend() != config.dialect {
            return Err(Error::config(format!(
                "session backend {} does not match configured dialect {}",
                session.backend(),
                config.dialect
            )));
        }

        let builder = QueryBuilder::new(config.dialect).db_name(config.db_name.clone());
        log::info!(
            "SQL CRUD ready for {} database '{}'",
            config.dialect,
            config.db_name
        );

        Ok(SqlCrud {
            builder,
            config,
            session,
        })
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.builder.backend()
    }

    fn log_statement(&self, col: &str, kind: &str, stmt: &RenderedStatement) {
        if self.config.logs_table(col) {
            log::debug!("{} on {}: {} {:?}", kind, col, stmt.sql, stmt.args);
        }
    }

    fn coerce_rows(&self, set: RowSet) -> Vec<Row> {
        let backend = self.backend();
        let RowSet { columns, rows } = set;
        rows.into_iter()
            .map(|values| coerce_row(&columns, values, backend))
            .collect()
    }

    /// Insert one document or a uniform batch of documents
    pub async fn create(&self, col: &str, req: &CreateRequest) -> Result<u64> {
        let stmt = self.builder.render_create(col, req)?;
        self.log_statement(col, "create", &stmt);

        self
            .session
            .execute(&stmt.sql, stmt.args)
            .await
            .map_err(|e| log_failure(&format!("Create on {}", col), e))
    }

    /// Run a read and shape the rows for its operation
    pub async fn read(&self, col: &str, req: &ReadRequest) -> Result<ReadResponse> {
        let mut req = req.clone();
        if req.operation != ReadOperation::Count && req.options.limit.is_none() {
            req.options.limit = self.config.query_fetch_limit;
        }

        let stmt = self.builder.render_read(col, &req)?;
        self.log_statement(col, "read", &stmt);

        let set = self
            .session
            .query(&stmt.sql, stmt.args)
            .await
            .map_err(|e| log_failure(&format!("Read on {}", col), e))?;

        let rows = self.coerce_rows(set);
        shape_response(req.operation, col, rows, &req.options.join, req.options.debug)
    }

    fn plan_update(&self, col: &str, req: &UpdateRequest) -> Result<WritePlan> {
        match req.operation {
            UpdateOperation::All => Ok(WritePlan::Many(compile_update_all(
                &self.builder,
                col,
                &req.find,
                &req.update,
            )?)),
            UpdateOperation::Upsert => Ok(WritePlan::Upsert(UpsertPlan::build(
                &self.builder,
                col,
                &req.find,
                &req.update,
            )?)),
            UpdateOperation::One => Err(Error::invalid_params(
                "update with operation one is not supported for sql databases",
            )),
        }
    }

    fn log_plan(&self, col: &str, plan: &WritePlan) {
        match plan {
            WritePlan::Single(stmt) => self.log_statement(col, "write", stmt),
            WritePlan::Many(stmts) => {
                for stmt in stmts {
                    self.log_statement(col, "update", stmt);
                }
            }
            WritePlan::Upsert(plan) => {
                self.log_statement(col, "upsert check", &plan.check);
                self.log_statement(col, "upsert insert", &plan.insert);
                for stmt in &plan.updates {
                    self.log_statement(col, "upsert update", stmt);
                }
            }
        }
    }

    /// Apply an update (or upsert) inside one transaction
    pub async fn update(&self, col: &str, req: &UpdateRequest) -> Result<u64> {
        let plan = self.plan_update(col, req)?;
        self.log_plan(col, &plan);

        let mut tx = self.session.begin().await?;
        let result = plan.execute(tx.as_mut()).await;
        finish_transaction(tx, result)
            .await
            .map_err(|e| log_failure(&format!("Update on {}", col), e))
    }

    /// Delete the rows matching `find`; an empty filter deletes everything
    pub async fn delete(&self, col: &str, req: &DeleteRequest) -> Result<u64> {
        let stmt = self.builder.render_delete(col, &req.find)?;
        self.log_statement(col, "delete", &stmt);

        self
            .session
            .execute(&stmt.sql, stmt.args)
            .await
            .map_err(|e| log_failure(&format!("Delete on {}", col), e))
    }

    /// Run several writes in order inside one transaction
    ///
    /// Returns the affected-row count of each request. Every request is
    /// rendered before the transaction opens; any failure rolls back.
    pub async fn batch(&self, requests: &[BatchRequest]) -> Result<Vec<u64>> {
        let mut plans = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            let (col, plan) = match request {
                BatchRequest::Create { col, request } => {
                    (col, WritePlan::Single(self.builder.render_create(col, request)?))
                }
                BatchRequest::Update { col, request } => (col, self.plan_update(col, request)?),
                BatchRequest::Delete { col, request } => {
                    (col, WritePlan::Single(self.builder.render_delete(col, &request.find)?))
                }
            };
            log::trace!("Batch request {} planned for {}", i, col);
            self.log_plan(col, &plan);
            plans.push(plan);
        }

        let mut tx = self.session.begin().await?;
        let mut counts = Vec::with_capacity(plans.len());
        let mut result = Ok(());
        for plan in plans {
            match plan.execute(tx.as_mut()).await {
                Ok(count) => counts.push(count),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        finish_transaction(tx, result).await.map_err(|e| log_failure("Batch", e))?;
        Ok(counts)
    }

    /// Execute caller-supplied SQL without arguments
    pub async fn raw_exec(&self, sql: &str) -> Result<u64> {
        if self.config.log_statements {
            log::debug!("raw exec: {}", sql);
        }
        self.session.execute(sql, Vec::new()).await
    }

    /// Run caller-supplied SQL and return coerced rows
    pub async fn raw_query(&self, sql: &str, args: Vec<JsonValue>) -> Result<Vec<Row>> {
        let args = args.iter().map(SqlValue::from_json).collect::<Vec<_>>();
        if self.config.log_statements {
            log::debug!("raw query: {} {:?}", sql, args);
        }
        let set = self.session.query(sql, args).await?;
        Ok(self.coerce_rows(set))
    }

    pub async fn ping(&self) -> Result<bool> {
        self.session.ping().await
    }
}

fn log_failure(what: &str, e: Error) -> Error {
    log::error!("{} failed: {}", what, ErrorChain::new(&e));
    e
}

/// Commit on success, roll back on failure
async fn finish_transaction<T>(tx: Box<dyn Transaction>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                log::warn!("Rollback failed after error '{}': {}", e, rollback);
            }
            Err(e)
        }
    }
}
