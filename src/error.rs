use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;
#[cfg(feature = "mysql")]
use mysql_async;

#[derive(Debug, Error)]
pub enum SqlBridgeError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MysqlError(#[from] mysql_async::Error),

    #[error("Unsupported parameter type `{0}`")]
    UnsupportedParameterType(String),

    #[error("Prepare/bind failure ({code}): {message}")]
    PrepareOrBindFailure {
        message: String,
        code: i32,
        sql: String,
    },

    #[error("SQL execution failure ({code}): {message}")]
    ExecutionFailure {
        message: String,
        code: i32,
        sql: String,
    },

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Invalid statement state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlBridgeError {
    /// The SQL text attached to a prepare or execution failure, after prefix rewriting.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            SqlBridgeError::PrepareOrBindFailure { sql, .. }
            | SqlBridgeError::ExecutionFailure { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Native error code carried by prepare and execution failures.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            SqlBridgeError::PrepareOrBindFailure { code, .. }
            | SqlBridgeError::ExecutionFailure { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, SqlBridgeError::ExecutionFailure { .. })
    }

    pub(crate) fn prepare(native: crate::native::NativeError, sql: &str) -> Self {
        SqlBridgeError::PrepareOrBindFailure {
            message: native.message,
            code: native.code,
            sql: sql.to_string(),
        }
    }

    pub(crate) fn execution(native: crate::native::NativeError, sql: &str) -> Self {
        SqlBridgeError::ExecutionFailure {
            message: native.message,
            code: native.code,
            sql: sql.to_string(),
        }
    }
}
