//! Query-execution capability consumed by tenant handles and janitors.
//!
//! The core only depends on [`QueryExecutor`] and [`BackendConnector`];
//! [`SqliteConnector`] is the bundled adapter over a shared `sqlx` pool.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use sqlite::{SqliteConnector, SqliteExecutor};
pub use traits::{
    BackendConnector, NamedParams, ParamValue, QueryExecutor, QueryOutcome, named_params,
};
