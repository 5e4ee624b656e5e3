//! sqlcrud - document-style CRUD requests rendered to SQL
//!
//! Translates Mongo-style filters, update operators and upserts into
//! parameterised SQL for MySQL, PostgreSQL and SQL Server:
//! - `query_builder`: filter compilation, statement rendering and dialects
//! - `database`: value coercion and sqlx-backed sessions
//! - `crud`: request execution, transactions and upserts

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod config;
pub mod crud;
pub mod database;
pub mod error;
pub mod query_builder;
pub mod request;

pub use config::EngineConfig;
pub use crud::SqlCrud;
pub use error::{Error, Result};
pub use query_builder::{DatabaseBackend, QueryBuilder, RenderedStatement};

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::crud::SqlCrud;
    pub use crate::database::{DatabaseSession, RowSet, SqlValue, Transaction};
    pub use crate::error::{Error, ErrorContext, Result};
    pub use crate::query_builder::{DatabaseBackend, QueryBuilder, RenderedStatement};
    pub use crate::request::{
        BatchRequest, CreateRequest, DeleteRequest, JoinOption, JoinType, ReadData, ReadOperation,
        ReadOptions, ReadRequest, ReadResponse, UpdateOperation, UpdateRequest,
    };
}
