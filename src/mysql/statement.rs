use std::rc::Rc;

use mysql_async::prelude::Queryable;
use mysql_async::{Params, Row, Value};

use crate::native::{NativeError, OutputBuffer, PositionalNativeStatement, type_code};
use crate::results::ResultSet;
use crate::types::SqlValue;

use super::connection::Session;
use super::native_error;
use super::params::{from_mysql_value, to_mysql_value};

/// A server-side prepared `MySQL` statement with `?` markers.
///
/// Rows are only handed out through output variables registered with
/// `bind_result`, one row per `fetch`.
pub struct MysqlStatement {
    session: Rc<Session>,
    statement: mysql_async::Statement,
    values: Vec<Value>,
    pending: Option<Vec<Vec<SqlValue>>>,
    result: Option<ResultSet>,
    outputs: Option<OutputBuffer>,
    affected: usize,
}

impl MysqlStatement {
    pub(crate) fn new(session: Rc<Session>, statement: mysql_async::Statement) -> Self {
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

    fn params(&self) -> Params {
        if self.values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(self.values.clone())
        }
    }
}

fn row_values(mut row: Row) -> Vec<SqlValue> {
    (0..row.len())
        .map(|idx| from_mysql_value(row.take::<Value, usize>(idx).unwrap_or(Value::NULL)))
        .collect()
}

impl PositionalNativeStatement for MysqlStatement {
    fn param_count(&self) -> usize {
        usize::from(self.statement.num_params())
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
        let mut converted = Vec::with_capacity(values.len());
        for (code, value) in types.chars().zip(values) {
            if ![type_code::INT, type_code::STR].contains(&code) {
                return Err(NativeError::new(format!("unknown type code '{code}'"), 0));
            }
            converted.push(to_mysql_value(value, code)?);
        }
        self.values = converted;
        Ok(())
    }

    fn execute(&mut self) -> Result<(), NativeError> {
        let params = self.params();
        let mut conn = self.session.conn()?;

        self.pending = None;
        if self.statement.columns().is_empty() {
            self.session
                .block_on(conn.exec_drop(&self.statement, params))
                .map_err(|e| native_error(&e))?;
            self.affected = usize::try_from(conn.affected_rows()).unwrap_or(usize::MAX);
        } else {
            let rows: Vec<Row> = self
                .session
                .block_on(conn.exec(&self.statement, params))
                .map_err(|e| native_error(&e))?;
            self.affected = 0;
            self.pending = Some(rows.into_iter().map(row_values).collect());
        }
        Ok(())
    }

    fn result_metadata(&mut self) -> Option<Vec<String>> {
        let columns = self.statement.columns();
        if columns.is_empty() {
            None
        } else {
            Some(columns.iter().map(|c| c.name_str().into_owned()).collect())
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
