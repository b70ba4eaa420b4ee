use std::future::Future;
use std::rc::Rc;

use tokio::runtime::{Builder, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, warn};

use crate::connection::{Connection, Connector, Dialect};
use crate::error::SqlBridgeError;
use crate::scanner::{PlaceholderMap, map_placeholders, number_positional_markers};
use crate::statement::Statement;

use super::native_error;
use super::statement::PostgresStatement;

/// A client plus the single-threaded runtime that drives it.
pub(crate) struct Session {
    runtime: Runtime,
    client: tokio_postgres::Client,
}

impl Session {
    pub(crate) fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// A blocking `PostgreSQL` connection.
pub struct PostgresConnection {
    session: Rc<Session>,
}

impl PostgresConnection {
    /// Connect with a libpq-style connection string or URL.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::ConnectionError`] when the runtime cannot start or the
    /// server refuses the connection.
    pub fn connect(url: &str) -> Result<Self, SqlBridgeError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SqlBridgeError::ConnectionError(format!("Failed to start runtime: {e}")))?;

        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(url, NoTls))
            .map_err(|e| SqlBridgeError::ConnectionError(format!("Failed to connect to PostgreSQL: {e}")))?;

        // the connection task only runs while a call blocks on the runtime
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection closed with error");
            }
        });

        debug!("opened postgres connection");
        Ok(Self {
            session: Rc::new(Session { runtime, client }),
        })
    }
}

impl Connection for PostgresConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn prepare(&self, sql: &str) -> Result<Statement, SqlBridgeError> {
        let mapping = map_placeholders(sql);
        let numbered = number_positional_markers(mapping.sql()).into_owned();
        let statement = self
            .session
            .block_on(self.session.client().prepare(&numbered))
            .map_err(|e| SqlBridgeError::prepare(native_error(&e), sql))?;

        let placeholders = PlaceholderMap::with_sql(&numbered, mapping.occurrences().to_vec());
        let handle = PostgresStatement::new(Rc::clone(&self.session), statement);
        Ok(Statement::emulated(sql, placeholders, Box::new(handle)))
    }

    fn ping(&self) -> bool {
        if self.session.client().is_closed() {
            return false;
        }
        self.session
            .block_on(self.session.client().simple_query(Dialect::Postgres.ping_sql()))
            .is_ok()
    }

    fn last_insert_id(&self) -> Result<i64, SqlBridgeError> {
        let row = self
            .session
            .block_on(self.session.client().query_one("SELECT lastval()", &[]))?;
        Ok(row.try_get::<_, i64>(0)?)
    }
}

/// Opens [`PostgresConnection`]s for a fixed connection string.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    url: String,
}

impl PostgresConnector {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for PostgresConnector {
    fn connect(&self) -> Result<Box<dyn Connection>, SqlBridgeError> {
        Ok(Box::new(PostgresConnection::connect(&self.url)?))
    }
}
