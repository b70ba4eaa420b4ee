use tracing::warn;

use super::Database;
use crate::error::SqlBridgeError;
use crate::query::Query;

impl Database {
    /// Number of started transactions not yet committed or rolled back.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.transaction_depth
    }

    /// # Errors
    /// Returns the execution error.
    pub fn transaction_start(&mut self) -> Result<(), SqlBridgeError> {
        self.set_query("BEGIN");
        self.execute()?;
        self.transaction_depth += 1;
        Ok(())
    }

    /// # Errors
    /// Returns the execution error; the transaction then still counts as open.
    pub fn transaction_commit(&mut self) -> Result<(), SqlBridgeError> {
        self.set_query("COMMIT");
        self.execute()?;
        self.transaction_depth = self.transaction_depth.saturating_sub(1);
        Ok(())
    }

    /// Ends the transaction even when the rollback itself fails.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn transaction_rollback(&mut self) -> Result<(), SqlBridgeError> {
        self.set_query("ROLLBACK");
        let result = self.execute();
        self.transaction_depth = self.transaction_depth.saturating_sub(1);
        result
    }

    /// Run `queries` in one transaction, rolling back at the first failure.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::InvalidState`] for an empty list, otherwise the
    /// error of the failing query after the rollback.
    pub fn transaction<I, Q>(&mut self, queries: I) -> Result<(), SqlBridgeError>
    where
        I: IntoIterator<Item = Q>,
        Q: Into<Query>,
    {
        let queries: Vec<Query> = queries.into_iter().map(Into::into).collect();
        if queries.is_empty() {
            return Err(SqlBridgeError::InvalidState(
                "no queries for transaction".into(),
            ));
        }

        self.transaction_start()?;
        for query in queries {
            self.set_query(query);
            if let Err(err) = self.execute() {
                if let Err(rollback) = self.transaction_rollback() {
                    warn!(error = %rollback, "rollback after failed transaction query failed");
                }
                return Err(err);
            }
        }
        self.transaction_commit()
    }
}
