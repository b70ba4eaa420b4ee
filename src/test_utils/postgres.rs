//! Embedded `PostgreSQL` server for integration tests.

use postgresql_embedded::PostgreSQL;
use tokio::runtime::{Builder, Runtime};

/// A running embedded server and the URL of its test database.
pub struct EmbeddedPostgres {
    runtime: Runtime,
    postgresql: PostgreSQL,
    pub database_url: String,
}

/// Install (bundled binaries), start, and create `db_name`.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, or the database
/// cannot be created.
pub fn setup_postgres_embedded(
    db_name: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    let (postgresql, database_url) = runtime.block_on(async {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(db_name).await?;

        let settings = postgresql.settings();
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{db_name}",
            settings.username, settings.password, settings.host, settings.port
        );
        Ok::<_, postgresql_embedded::Error>((postgresql, database_url))
    })?;

    Ok(EmbeddedPostgres {
        runtime,
        postgresql,
        database_url,
    })
}

impl EmbeddedPostgres {
    /// Stop the server; errors while stopping are ignored.
    pub fn stop(self) {
        let Self {
            runtime,
            postgresql,
            ..
        } = self;
        let _ = runtime.block_on(postgresql.stop());
    }
}
