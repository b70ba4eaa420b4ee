use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::connection::{Connection, Connector, Dialect};
use crate::error::SqlBridgeError;
use crate::statement::Statement;

use super::statement::SqliteStatement;

/// An open `SQLite` database.
pub struct SqliteConnection {
    conn: Rc<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Open (or create) the database at `path`; `:memory:` opens a private in-memory one.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::ConnectionError`] when the file cannot be opened.
    pub fn open(path: &str) -> Result<Self, SqlBridgeError> {
        let conn = rusqlite::Connection::open(path).map_err(|e| {
            SqlBridgeError::ConnectionError(format!("Failed to open SQLite database {path}: {e}"))
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        if path != ":memory:" {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        debug!(path, "opened sqlite connection");
        Ok(Self::from_rusqlite(conn))
    }

    /// Wrap an already open rusqlite connection.
    #[must_use]
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Rc::new(conn),
        }
    }

    /// Direct access to the underlying rusqlite connection.
    #[must_use]
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn prepare(&self, sql: &str) -> Result<Statement, SqlBridgeError> {
        let handle = SqliteStatement::prepare(Rc::clone(&self.conn), sql)
            .map_err(|e| SqlBridgeError::prepare(e, sql))?;
        Ok(Statement::native(sql, Box::new(handle)))
    }

    fn ping(&self) -> bool {
        self.conn
            .query_row(Dialect::Sqlite.ping_sql(), [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn last_insert_id(&self) -> Result<i64, SqlBridgeError> {
        Ok(self.conn.last_insert_rowid())
    }
}

/// Opens [`SqliteConnection`]s for a fixed path.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: String,
}

impl SqliteConnector {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Connector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn Connection>, SqlBridgeError> {
        Ok(Box::new(SqliteConnection::open(&self.path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BoundParams;
    use crate::types::{ParamType, SqlValue};

    #[test]
    fn prepare_wraps_native_statement() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        assert!(conn.ping());

        let mut create = conn.prepare("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)").unwrap();
        create.execute(&BoundParams::new()).unwrap();

        let mut insert = conn.prepare("INSERT INTO t (v) VALUES (:v)").unwrap();
        assert!(!insert.is_emulated());
        let mut params = BoundParams::new();
        params.bind("v", "x", ParamType::Str);
        insert.execute(&params).unwrap();
        assert_eq!(insert.row_count(), 1);
        assert_eq!(conn.last_insert_id().unwrap(), 1);

        let mut select = conn.prepare("SELECT v FROM t").unwrap();
        select.execute(&BoundParams::new()).unwrap();
        assert_eq!(
            select.fetch_column(0).unwrap(),
            Some(SqlValue::Text("x".into()))
        );
    }

    #[test]
    fn prepare_failure_carries_sql() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        let err = conn.prepare("SELECT * FROM missing_table").unwrap_err();
        assert!(matches!(err, SqlBridgeError::PrepareOrBindFailure { .. }));
        assert_eq!(err.sql(), Some("SELECT * FROM missing_table"));
    }
}
