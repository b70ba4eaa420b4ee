//! Cross-driver SQL access: quote-aware prefix and placeholder rewriting, a
//! driver-independent parameter model, and statements that return the same row
//! shapes whether the driver binds by name or only by position.

pub mod binder;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod native;
pub mod params;
pub mod prelude;
pub mod query;
pub mod results;
pub mod scanner;
pub mod statement;
pub mod types;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use database::Database;
pub use error::SqlBridgeError;
pub use query::Query;
pub use statement::{Statement, StatementState};
pub use types::{DriverKind, ParamType, SqlValue};
