//! MySQL session backed by an sqlx pool

use crate::database::session::{DatabaseSession, Transaction};
use crate::database::types::{MySqlTypeConverter, RowSet, SqlValue};
use crate::error::{Error, Result};
use crate::query_builder::DatabaseBackend;
use async_trait::async_trait;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool};
use std::sync::Arc;

fn build_query(sql: &str, args: Vec<SqlValue>) -> Query<'_, MySql, MySqlArguments> {
    let mut query = sqlx::query(sql);
    for arg in args {
        query = MySqlTypeConverter::bind_param(query, arg);
    }
    query
}

/// MySQL database session
#[derive(Clone)]
pub struct MySqlSession {
    pool: Arc<MySqlPool>,
}

impl MySqlSession {
    /// Connect a new pool
    pub async fn connect(connection_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(connection_url)
            .await
            .map_err(|e| Error::execution(format!("Failed to connect to MySQL: {}", e)))?;
        Ok(Self::from_pool(pool))
    }

    /// Create session from existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseSession for MySqlSession {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySQL
    }

    async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        #[cfg(debug_assertions)]
        {
            log::debug!("MySQL EXECUTE: {}", sql);
            log::debug!("  Parameters: {:?}", args);
        }

        let result = build_query(sql, args)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet> {
        #[cfg(debug_assertions)]
        {
            log::debug!("MySQL QUERY: {}", sql);
            log::debug!("  Parameters: {:?}", args);
        }

        let rows = build_query(sql, args)
            .fetch_all(&*self.pool)
            .await?;
        Ok(MySqlTypeConverter::row_set(&rows))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::transaction(format!("Failed to begin MySQL transaction: {}", e)))?;
        Ok(Box::new(MySqlTransaction { tx }))
    }

    async fn ping(&self) -> Result<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&*self.pool)
            .await
            .map(|_| true)
            .map_err(Error::from)
    }
}

/// Open MySQL transaction
pub struct MySqlTransaction {
    tx: sqlx::Transaction<'static, MySql>,
}

#[async_trait]
impl Transaction for MySqlTransaction {
    async fn execute(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        #[cfg(debug_assertions)]
        log::debug!("MySQL TX EXECUTE: {} {:?}", sql, args);

        let result = build_query(sql, args)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet> {
        #[cfg(debug_assertions)]
        log::debug!("MySQL TX QUERY: {} {:?}", sql, args);

        let rows = build_query(sql, args)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(MySqlTypeConverter::row_set(&rows))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| Error::transaction(format!("MySQL commit failed: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| Error::transaction(format!("MySQL rollback failed: {}", e)))
    }
}
