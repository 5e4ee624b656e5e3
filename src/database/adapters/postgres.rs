//! PostgreSQL session backed by an sqlx pool

use crate::database::session::{DatabaseSession, Transaction};
use crate::database::types::{PostgresTypeConverter, RowSet, SqlValue};
use crate::error::{Error, Result};
use crate::query_builder::DatabaseBackend;
use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use std::sync::Arc;

fn build_query(sql: &str, args: Vec<SqlValue>) -> Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for arg in args {
        query = PostgresTypeConverter::bind_param(query, arg);
    }
    query
}

/// PostgreSQL database session
#[derive(Clone)]
pub struct PostgresSession {
    pool: Arc<PgPool>,
}

impl PostgresSession {
    /// Connect a new pool
    pub async fn connect(connection_url: &str) -> Result<Self> {
        let pool = PgPool::connect(connection_url)
            .await
            .map_err(|e| Error::execution(format!("Failed to connect to PostgreSQL: {}", e)))?;
        Ok(Self::from_pool(pool))
    }

    /// Create session from existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseSession for PostgresSession {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        #[cfg(debug_assertions)]
        {
            log::debug!("PostgreSQL EXECUTE: {}", sql);
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
            log::debug!("PostgreSQL QUERY: {}", sql);
            log::debug!("  Parameters: {:?}", args);
        }

        let rows = build_query(sql, args)
            .fetch_all(&*self.pool)
            .await?;
        Ok(PostgresTypeConverter::row_set(&rows))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::transaction(format!("Failed to begin PostgreSQL transaction: {}", e)))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn ping(&self) -> Result<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&*self.pool)
            .await
            .map(|_| true)
            .map_err(Error::from)
    }
}

/// Open PostgreSQL transaction
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        #[cfg(debug_assertions)]
        log::debug!("PostgreSQL TX EXECUTE: {} {:?}", sql, args);

        let result = build_query(sql, args)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet> {
        #[cfg(debug_assertions)]
        log::debug!("PostgreSQL TX QUERY: {} {:?}", sql, args);

        let rows = build_query(sql, args)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(PostgresTypeConverter::row_set(&rows))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| Error::transaction(format!("PostgreSQL commit failed: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| Error::transaction(format!("PostgreSQL rollback failed: {}", e)))
    }
}
