//! SQL rendering for document-style requests
//!
//! - `filter`: filter specs to predicates
//! - `core`: SELECT / INSERT / UPDATE / DELETE rendering
//! - `update`: update operator rewriting
//! - `post_process`: dialect finishing passes
//! - `statement`: the fragment list all of the above build on

pub mod core;
pub mod dialects;
pub mod filter;
pub mod post_process;
pub mod statement;
pub mod update;

pub use self::core::{Assignment, InsertValue, QueryBuilder, UpdateStatement, FETCH_TS_FIELD};
pub use dialects::{create_dialect, DatabaseBackend, LimitStyle, SqlDialect};
pub use filter::{compile, CompiledFilter, CompareOp, Filter, Operand};
pub use statement::{Fragment, RenderedStatement, Statement};
pub use update::{compile_update, UpdateOperator};
