//! sqlx-backed sessions
//!
//! SQL Server has no driver here; callers plug in their own
//! [`DatabaseSession`](crate::database::DatabaseSession) for it.

pub mod mysql;
pub mod postgres;

pub use mysql::{MySqlSession, MySqlTransaction};
pub use postgres::{PostgresSession, PostgresTransaction};
