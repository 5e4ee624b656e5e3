//! Database access: value types, coercion and driver sessions

pub mod adapters;
pub mod session;
pub mod types;

pub use adapters::{MySqlSession, PostgresSession};
pub use session::{DatabaseSession, Transaction};
pub use types::{coerce, ColumnInfo, RowSet, SqlValue};
