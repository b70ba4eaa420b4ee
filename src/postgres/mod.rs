// PostgreSQL module - positional-only driver over tokio-postgres
//
// - params: ToSql for SqlValue, converting by the server's declared type
// - query: value extraction from rows
// - statement: PositionalNativeStatement with client-side buffering
// - connection: blocking Connection and Connector on a current-thread runtime

pub mod connection;
pub mod params;
pub mod query;
pub mod statement;

pub use connection::{PostgresConnection, PostgresConnector};
pub use statement::PostgresStatement;

use crate::native::NativeError;

/// Text of a tokio-postgres error, prefixed with its SQLSTATE when the server sent one.
pub(crate) fn native_error(err: &tokio_postgres::Error) -> NativeError {
    match err.as_db_error() {
        Some(db) => NativeError::new(format!("[{}] {}", db.code().code(), db.message()), 0),
        None => NativeError::new(err.to_string(), 0),
    }
}
