//! Execution seam between the CRUD layer and concrete drivers
//!
//! The engine only needs to run rendered SQL with positional arguments,
//! read back raw rows and scope work in a transaction. Drivers implement
//! these traits; tests substitute an in-memory recorder.

use super::types::{RowSet, SqlValue};
use crate::error::Result;
use crate::query_builder::DatabaseBackend;
use async_trait::async_trait;

/// A pooled connection source for one backend
#[async_trait]
pub trait DatabaseSession: Send + Sync {
    fn backend(&self) -> DatabaseBackend;

    /// Run a statement that modifies data; returns rows affected
    async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<u64>;

    /// Run a query and return raw rows
    async fn query(&self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet>;

    /// Open a transaction on a dedicated connection
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    async fn ping(&self) -> Result<bool>;
}

/// An open transaction
///
/// Dropping it without calling [`Transaction::commit`] rolls back.
#[async_trait]
pub trait Transaction: Send {
    async fn execute(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<u64>;

    async fn query(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
