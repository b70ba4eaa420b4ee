// SQLite module - named-capable driver over rusqlite
//
// - params: value conversion between SqlValue and rusqlite types
// - query: result extraction and buffering
// - statement: NamedNativeStatement over a cached rusqlite statement
// - connection: Connection and Connector implementations

pub mod connection;
pub mod params;
pub mod query;
pub mod statement;

pub use connection::{SqliteConnection, SqliteConnector};
pub use statement::SqliteStatement;

use crate::native::NativeError;

/// Text and extended result code of a rusqlite error.
pub(crate) fn native_error(err: &rusqlite::Error) -> NativeError {
    match err {
        rusqlite::Error::SqliteFailure(ffi, message) => NativeError::new(
            message.clone().unwrap_or_else(|| ffi.to_string()),
            ffi.extended_code,
        ),
        other => NativeError::new(other.to_string(), 0),
    }
}
