use std::rc::Rc;

use tokio_postgres::types::ToSql;

use crate::native::{NativeError, OutputBuffer, PositionalNativeStatement, type_code};
use crate::results::ResultSet;
use crate::types::SqlValue;

use super::connection::Session;
use super::native_error;
use super::query::postgres_row_values;

/// A prepared `PostgreSQL` statement with `$n` markers.
///
/// Rows are only handed out through output variables registered with
/// `bind_result`, one row per `fetch`.
pub struct PostgresStatement {
    session: Rc<Session>,
    statement: tokio_postgres::Statement,
    values: Vec<SqlValue>,
    pending: Option<Vec<Vec<SqlValue>>>,
    result: Option<ResultSet>,
    outputs: Option<OutputBuffer>,
    affected: usize,
}

impl PostgresStatement {
    pub(crate) fn new(session: Rc<Session>, statement: tokio_postgres::Statement) -> Self {
        Self {
            session,
            statement,
            values: Vec::new(),
            pending: None,
            result: None,
            outputs: None,
            affected: 0,
        }
    }
}

impl PositionalNativeStatement for PostgresStatement {
    fn param_count(&self) -> usize {
        self.statement.params().len()
    }

    fn bind_all(&mut self, types: &str, values: &[SqlValue]) -> Result<(), NativeError> {
        let count = self.param_count();
        self.values.clear();
        if types.chars().count() != values.len() || values.len() != count {
            return Err(NativeError::new(
                format!(
                    "number of bind variables ({}) does not match number of parameters ({count})",
                    values.len()
                ),
                0,
            ));
        }
        if let Some(bad) = types
            .chars()
            .find(|c| ![type_code::INT, type_code::STR].contains(c))
        {
            return Err(NativeError::new(format!("unknown type code '{bad}'"), 0));
        }
        self.values = values.to_vec();
        Ok(())
    }

    fn execute(&mut self) -> Result<(), NativeError> {
        let params: Vec<&(dyn ToSql + Sync)> = self
            .values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect();

        self.pending = None;
        if self.statement.columns().is_empty() {
            let affected = self
                .session
                .block_on(self.session.client().execute(&self.statement, &params))
                .map_err(|e| native_error(&e))?;
            self.affected = usize::try_from(affected).unwrap_or(usize::MAX);
        } else {
            let rows = self
                .session
                .block_on(self.session.client().query(&self.statement, &params))
                .map_err(|e| native_error(&e))?;
            let mut buffered = Vec::with_capacity(rows.len());
            for row in &rows {
                buffered.push(postgres_row_values(row).map_err(|e| native_error(&e))?);
            }
            self.affected = 0;
            self.pending = Some(buffered);
        }
        Ok(())
    }

    fn result_metadata(&mut self) -> Option<Vec<String>> {
        let columns = self.statement.columns();
        if columns.is_empty() {
            None
        } else {
            Some(columns.iter().map(|c| c.name().to_string()).collect())
        }
    }

    fn store_result(&mut self) -> Result<(), NativeError> {
        let rows = self
            .pending
            .take()
            .ok_or_else(|| NativeError::new("no result to store", 0))?;
        let mut result = ResultSet::with_capacity(rows.len());
        for row in rows {
            result.add_row_values(row);
        }
        self.result = Some(result);
        Ok(())
    }

    fn bind_result(&mut self, outputs: OutputBuffer) -> Result<(), NativeError> {
        let expected = self.statement.columns().len();
        if outputs.arity() != expected {
            return Err(NativeError::new(
                format!(
                    "number of output variables ({}) does not match number of columns ({expected})",
                    outputs.arity()
                ),
                0,
            ));
        }
        self.outputs = Some(outputs);
        Ok(())
    }

    fn fetch(&mut self) -> Result<bool, NativeError> {
        let outputs = self
            .outputs
            .as_ref()
            .ok_or_else(|| NativeError::new("no output variables bound", 0))?;
        match self.result.as_mut().and_then(ResultSet::pop_row) {
            Some(row) => {
                outputs.fill(row);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn affected_rows(&self) -> usize {
        self.affected
    }

    fn num_rows(&self) -> usize {
        self.result.as_ref().map_or(0, ResultSet::num_rows)
    }

    fn free_result(&mut self) {
        self.pending = None;
        self.result = None;
    }
}
