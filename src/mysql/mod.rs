// MySQL module - positional-only driver over mysql_async
//
// - params: value conversion between SqlValue and mysql_async values
// - statement: PositionalNativeStatement with client-side buffering
// - connection: blocking Connection and Connector on a current-thread runtime

pub mod connection;
pub mod params;
pub mod statement;

pub use connection::{MysqlConnection, MysqlConnector};
pub use statement::MysqlStatement;

use crate::native::NativeError;

/// Server message and error number of a `mysql_async` error; client-side failures carry code 0.
pub(crate) fn native_error(err: &mysql_async::Error) -> NativeError {
    match err {
        mysql_async::Error::Server(server) => {
            NativeError::new(server.message.clone(), i32::from(server.code))
        }
        other => NativeError::new(other.to_string(), 0),
    }
}
