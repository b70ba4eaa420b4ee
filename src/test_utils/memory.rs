//! A scripted, in-memory positional-only driver.
//!
//! Responses are keyed by the exact SQL the driver receives (after prefix rewriting
//! and placeholder mapping). Every `bind_all` and `bind_result` call is recorded so
//! tests can check what reached the driver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::connection::{Connection, Connector, Dialect};
use crate::error::SqlBridgeError;
use crate::native::{NativeError, OutputBuffer, PositionalNativeStatement};
use crate::results::ResultSet;
use crate::scanner::{Segment, map_placeholders, segments};
use crate::statement::Statement;
use crate::types::SqlValue;

/// Error code reported while the backend is down.
pub const GONE_AWAY: i32 = 2006;

/// Scripted outcome of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// A result with these columns and rows.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    /// A statement without result columns.
    Affected(usize),
    /// Execution fails with this error.
    Fail { message: String, code: i32 },
    /// Preparation fails with this error.
    Reject { message: String, code: i32 },
}

/// One recorded `bind_all` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BindCall {
    pub sql: String,
    pub types: String,
    pub values: Vec<SqlValue>,
}

#[derive(Debug)]
struct BackendState {
    dialect: Dialect,
    scripts: HashMap<String, Script>,
    alive: bool,
    accepting: bool,
    connects: usize,
    executed: Vec<String>,
    binds: Vec<BindCall>,
    bind_results: usize,
    last_insert_id: i64,
}

/// Shared state behind every connection a [`MemoryConnector`] opens.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Rc<RefCell<BackendState>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Dialect::Sqlite)
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            state: Rc::new(RefCell::new(BackendState {
                dialect,
                scripts: HashMap::new(),
                alive: true,
                accepting: true,
                connects: 0,
                executed: Vec::new(),
                binds: Vec::new(),
                bind_results: 0,
                last_insert_id: 0,
            })),
        }
    }

    /// Script `sql` to return `rows` under `columns`.
    pub fn on_query(&self, sql: &str, columns: Vec<String>, rows: Vec<Vec<SqlValue>>) {
        self.script(sql, Script::Rows { columns, rows });
    }

    /// Script `sql` to affect `count` rows.
    pub fn on_execute(&self, sql: &str, count: usize) {
        self.script(sql, Script::Affected(count));
    }

    pub fn script(&self, sql: &str, script: Script) {
        self.state.borrow_mut().scripts.insert(sql.to_string(), script);
    }

    /// Drop the server: executes fail and pings report a dead link until the next connect.
    pub fn kill(&self) {
        self.state.borrow_mut().alive = false;
    }

    /// Refuse (or accept again) new connections.
    pub fn set_accepting(&self, accepting: bool) {
        self.state.borrow_mut().accepting = accepting;
    }

    pub fn set_last_insert_id(&self, id: i64) {
        self.state.borrow_mut().last_insert_id = id;
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.state.borrow().connects
    }

    /// SQL of every execute call that reached the driver, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.state.borrow().executed.clone()
    }

    #[must_use]
    pub fn binds(&self) -> Vec<BindCall> {
        self.state.borrow().binds.clone()
    }

    #[must_use]
    pub fn bind_result_calls(&self) -> usize {
        self.state.borrow().bind_results
    }

    #[must_use]
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            backend: self.clone(),
        }
    }

    fn lookup(&self, sql: &str) -> Option<Script> {
        self.state.borrow().scripts.get(sql).cloned()
    }
}

/// Opens [`MemoryConnection`]s on a shared [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    backend: MemoryBackend,
}

impl Connector for MemoryConnector {
    fn connect(&self) -> Result<Box<dyn Connection>, SqlBridgeError> {
        let mut state = self.backend.state.borrow_mut();
        if !state.accepting {
            return Err(SqlBridgeError::ConnectionError(
                "memory backend refused the connection".into(),
            ));
        }
        state.connects += 1;
        state.alive = true;
        Ok(Box::new(MemoryConnection {
            backend: self.backend.clone(),
        }))
    }
}

/// A connection whose statements are [`MemoryStatement`]s.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    backend: MemoryBackend,
}

impl MemoryConnection {
    #[must_use]
    pub fn new(backend: MemoryBackend) -> Self {
        Self { backend }
    }
}

impl Connection for MemoryConnection {
    fn dialect(&self) -> Dialect {
        self.backend.state.borrow().dialect
    }

    fn prepare(&self, sql: &str) -> Result<Statement, SqlBridgeError> {
        let mapping = map_placeholders(sql);
        let handle = MemoryStatement::prepare(self.backend.clone(), mapping.sql())
            .map_err(|e| SqlBridgeError::prepare(e, sql))?;
        Ok(Statement::emulated(sql, mapping, Box::new(handle)))
    }

    fn ping(&self) -> bool {
        self.backend.state.borrow().alive
    }

    fn last_insert_id(&self) -> Result<i64, SqlBridgeError> {
        Ok(self.backend.state.borrow().last_insert_id)
    }
}

/// Positional-only statement answering from the backend's scripts.
#[derive(Debug)]
pub struct MemoryStatement {
    backend: MemoryBackend,
    sql: String,
    param_count: usize,
    values: Vec<SqlValue>,
    script: Option<Script>,
    result: Option<ResultSet>,
    outputs: Option<OutputBuffer>,
}

impl MemoryStatement {
    /// # Errors
    /// Returns the scripted error for a [`Script::Reject`] entry.
    pub fn prepare(backend: MemoryBackend, sql: &str) -> Result<Self, NativeError> {
        let script = backend.lookup(sql);
        if let Some(Script::Reject { message, code }) = &script {
            return Err(NativeError::new(message.clone(), *code));
        }
        let param_count = segments(sql)
            .filter_map(|seg| match seg {
                Segment::Unquoted(span) => Some(span.slice(sql).matches('?').count()),
                Segment::Quoted(_) => None,
            })
            .sum();
        Ok(Self {
            backend,
            sql: sql.to_string(),
            param_count,
            values: Vec::new(),
            script: None,
            result: None,
            outputs: None,
        })
    }

    /// Values passed to the last `bind_all`.
    #[must_use]
    pub fn bound_values(&self) -> &[SqlValue] {
        &self.values
    }
}

impl PositionalNativeStatement for MemoryStatement {
    fn param_count(&self) -> usize {
        self.param_count
    }

    fn bind_all(&mut self, types: &str, values: &[SqlValue]) -> Result<(), NativeError> {
        if types.chars().count() != values.len() || values.len() != self.param_count {
            self.values.clear();
            return Err(NativeError::new(
                "Number of variables doesn't match number of parameters in prepared statement",
                2031,
            ));
        }
        self.values = values.to_vec();
        self.backend.state.borrow_mut().binds.push(BindCall {
            sql: self.sql.clone(),
            types: types.to_string(),
            values: values.to_vec(),
        });
        Ok(())
    }

    fn execute(&mut self) -> Result<(), NativeError> {
        if !self.backend.state.borrow().alive {
            return Err(NativeError::new("server has gone away", GONE_AWAY));
        }
        self.backend.state.borrow_mut().executed.push(self.sql.clone());
        let script = self
            .backend
            .lookup(&self.sql)
            .unwrap_or(Script::Affected(0));
        if let Script::Fail { message, code } = &script {
            return Err(NativeError::new(message.clone(), *code));
        }
        self.script = Some(script);
        self.result = None;
        Ok(())
    }

    fn result_metadata(&mut self) -> Option<Vec<String>> {
        match &self.script {
            Some(Script::Rows { columns, .. }) => Some(columns.clone()),
            _ => None,
        }
    }

    fn store_result(&mut self) -> Result<(), NativeError> {
        let Some(Script::Rows { rows, .. }) = &self.script else {
            return Err(NativeError::new("Commands out of sync", 2014));
        };
        let mut result = ResultSet::with_capacity(rows.len());
        for row in rows {
            result.add_row_values(row.clone());
        }
        self.result = Some(result);
        Ok(())
    }

    fn bind_result(&mut self, outputs: OutputBuffer) -> Result<(), NativeError> {
        let expected = match &self.script {
            Some(Script::Rows { columns, .. }) => columns.len(),
            _ => 0,
        };
        if outputs.arity() != expected {
            return Err(NativeError::new(
                "Number of bind variables doesn't match number of fields in prepared statement",
                2031,
            ));
        }
        self.outputs = Some(outputs);
        self.backend.state.borrow_mut().bind_results += 1;
        Ok(())
    }

    fn fetch(&mut self) -> Result<bool, NativeError> {
        let outputs = self
            .outputs
            .as_ref()
            .ok_or_else(|| NativeError::new("no output variables bound", 2053))?;
        match self.result.as_mut().and_then(ResultSet::pop_row) {
            Some(row) => {
                outputs.fill(row);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn affected_rows(&self) -> usize {
        match &self.script {
            Some(Script::Affected(count)) => *count,
            _ => 0,
        }
    }

    fn num_rows(&self) -> usize {
        self.result.as_ref().map_or(0, ResultSet::num_rows)
    }

    fn free_result(&mut self) {
        self.result = None;
    }
}
