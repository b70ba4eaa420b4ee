//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use crate::connection::{Connection, Connector, Dialect};
pub use crate::database::{ColumnInfo, Database};
pub use crate::error::SqlBridgeError;
pub use crate::params::{BoundParams, ParamKey, Parameter};
pub use crate::query::Query;
pub use crate::results::{AssocRow, FetchMode, FetchedRow, MixedRow, Record, RowKey};
pub use crate::scanner::{map_placeholders, rewrite_prefix};
pub use crate::statement::{Statement, StatementState};
pub use crate::types::{DriverKind, ParamType, SqlValue};

#[cfg(feature = "mysql")]
pub use crate::mysql::{MysqlConnection, MysqlConnector};
#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresConnection, PostgresConnector};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteConnector};
