//! Prepared statements over either native driver model.

use std::fmt;

use tracing::debug;

use crate::binder;
use crate::error::SqlBridgeError;
use crate::native::{NamedNativeStatement, OutputBuffer, PositionalNativeStatement};
use crate::params::BoundParams;
use crate::results::{ColumnSet, FetchMode, FetchedRow};
use crate::scanner::{PlaceholderMap, map_placeholders};
use crate::types::SqlValue;

/// Lifecycle of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Native handle created, never executed.
    Prepared,
    /// Executed; the cursor sits before the next row.
    Executed,
    /// Every row of the current execution has been read.
    Exhausted,
    /// Cursor released; the statement may be executed again.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
enum ColumnCache {
    Unknown,
    NoResult,
    Columns(ColumnSet),
}

struct NativeShaped {
    handle: Box<dyn NamedNativeStatement>,
    columns: Option<ColumnSet>,
}

struct EmulatedShaped {
    handle: Box<dyn PositionalNativeStatement>,
    columns: ColumnCache,
    outputs: OutputBuffer,
    outputs_bound: bool,
}

enum Shaping {
    Native(NativeShaped),
    Emulated(EmulatedShaped),
}

/// A prepared statement with a uniform execute/fetch surface.
///
/// Drivers that shape rows themselves are passed through; for positional-only
/// drivers the statement binds an output buffer once, pulls each row into it, and
/// builds the requested shape from a copy of the buffer and the cached columns.
pub struct Statement {
    sql: String,
    placeholders: PlaceholderMap,
    fetch_mode: FetchMode,
    state: StatementState,
    shaping: Shaping,
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("native_sql", &self.native_sql())
            .field("emulated", &self.is_emulated())
            .field("state", &self.state)
            .field("fetch_mode", &self.fetch_mode)
            .finish_non_exhaustive()
    }
}

impl Statement {
    /// Wrap a named-capable handle prepared from `sql` as written.
    ///
    /// The placeholder scan is kept only to check that every name gets a value.
    #[must_use]
    pub fn native(sql: &str, handle: Box<dyn NamedNativeStatement>) -> Self {
        // the driver keeps the original text; the scan only supplies names
        let placeholders =
            PlaceholderMap::with_sql(sql, map_placeholders(sql).occurrences().to_vec());
        Self {
            sql: sql.to_string(),
            placeholders,
            fetch_mode: FetchMode::default(),
            state: StatementState::Prepared,
            shaping: Shaping::Native(NativeShaped {
                handle,
                columns: None,
            }),
        }
    }

    /// Wrap a positional-only handle prepared from `placeholders.sql()`.
    #[must_use]
    pub fn emulated(
        sql: &str,
        placeholders: PlaceholderMap,
        handle: Box<dyn PositionalNativeStatement>,
    ) -> Self {
        Self {
            sql: sql.to_string(),
            placeholders,
            fetch_mode: FetchMode::default(),
            state: StatementState::Prepared,
            shaping: Shaping::Emulated(EmulatedShaped {
                handle,
                columns: ColumnCache::Unknown,
                outputs: OutputBuffer::default(),
                outputs_bound: false,
            }),
        }
    }

    /// SQL after prefix rewriting, as handed to `prepare`.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// SQL text the native driver was prepared with.
    #[must_use]
    pub fn native_sql(&self) -> &str {
        self.placeholders.sql()
    }

    #[must_use]
    pub fn placeholders(&self) -> &PlaceholderMap {
        &self.placeholders
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    #[must_use]
    pub fn is_emulated(&self) -> bool {
        matches!(self.shaping, Shaping::Emulated(_))
    }

    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    /// Default mode used by [`Statement::fetch_next`].
    pub fn set_fetch_mode(&mut self, mode: FetchMode) {
        self.fetch_mode = mode;
    }

    /// Bind `params` and run the statement.
    ///
    /// Executing again while a previous result is unread discards that result.
    ///
    /// # Errors
    /// Bind problems surface as [`SqlBridgeError::PrepareOrBindFailure`],
    /// [`SqlBridgeError::ParameterError`] or
    /// [`SqlBridgeError::UnsupportedParameterType`]; a failed native execute as
    /// [`SqlBridgeError::ExecutionFailure`] carrying [`Statement::sql`].
    pub fn execute(&mut self, params: &BoundParams) -> Result<(), SqlBridgeError> {
        if self.state == StatementState::Executed {
            debug!(sql = %self.sql, "closing unconsumed cursor before re-execution");
            self.close_cursor();
        }

        debug!(sql = %self.sql, params = params.len(), "executing statement");

        match &mut self.shaping {
            Shaping::Native(native) => {
                binder::bind_named(native.handle.as_mut(), params, &self.placeholders, &self.sql)?;
                native
                    .handle
                    .execute()
                    .map_err(|e| SqlBridgeError::execution(e, &self.sql))?;
                if native.columns.is_none() {
                    native.columns = native.handle.column_names().map(ColumnSet::new);
                }
            }
            Shaping::Emulated(emulated) => {
                binder::bind_positional(
                    emulated.handle.as_mut(),
                    params,
                    &self.placeholders,
                    &self.sql,
                )?;
                emulated
                    .handle
                    .execute()
                    .map_err(|e| SqlBridgeError::execution(e, &self.sql))?;

                if emulated.columns == ColumnCache::Unknown {
                    emulated.columns = match emulated.handle.result_metadata() {
                        Some(names) => {
                            emulated.outputs.resize(names.len());
                            ColumnCache::Columns(ColumnSet::new(names))
                        }
                        None => ColumnCache::NoResult,
                    };
                }

                if let ColumnCache::Columns(_) = emulated.columns {
                    emulated
                        .handle
                        .store_result()
                        .map_err(|e| SqlBridgeError::execution(e, &self.sql))?;
                    if !emulated.outputs_bound {
                        emulated
                            .handle
                            .bind_result(emulated.outputs.clone())
                            .map_err(|e| SqlBridgeError::execution(e, &self.sql))?;
                        emulated.outputs_bound = true;
                    }
                }
            }
        }

        self.state = StatementState::Executed;
        Ok(())
    }

    /// Next row in the statement's default fetch mode.
    ///
    /// # Errors
    /// See [`Statement::fetch`].
    pub fn fetch_next(&mut self) -> Result<Option<FetchedRow>, SqlBridgeError> {
        self.fetch(self.fetch_mode)
    }

    /// Next row in `mode`; `None` once the result is exhausted.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::InvalidState`] before the first execution or after
    /// the cursor was closed, and [`SqlBridgeError::ExecutionFailure`] when the
    /// driver cannot advance the cursor.
    pub fn fetch(&mut self, mode: FetchMode) -> Result<Option<FetchedRow>, SqlBridgeError> {
        match self.state {
            StatementState::Prepared | StatementState::Closed => {
                return Err(SqlBridgeError::InvalidState(format!(
                    "no open cursor ({:?}) for: {}",
                    self.state, self.sql
                )));
            }
            StatementState::Exhausted => return Ok(None),
            StatementState::Executed => {}
        }

        let row = match &mut self.shaping {
            Shaping::Native(native) => native
                .handle
                .fetch(mode)
                .map_err(|e| SqlBridgeError::execution(e, &self.sql))?,
            Shaping::Emulated(emulated) => match &emulated.columns {
                ColumnCache::Columns(columns) => {
                    let advanced = emulated
                        .handle
                        .fetch()
                        .map_err(|e| SqlBridgeError::execution(e, &self.sql))?;
                    if advanced {
                        let values = emulated.outputs.snapshot();
                        Some(FetchedRow::build(mode, columns, values))
                    } else {
                        None
                    }
                }
                ColumnCache::NoResult | ColumnCache::Unknown => None,
            },
        };

        if row.is_none() {
            self.state = StatementState::Exhausted;
        }
        Ok(row)
    }

    /// Every remaining row in `mode`.
    ///
    /// # Errors
    /// See [`Statement::fetch`].
    pub fn fetch_all(&mut self, mode: FetchMode) -> Result<Vec<FetchedRow>, SqlBridgeError> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch(mode)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// One column of the next row; `Some(Null)` when the column does not exist.
    ///
    /// # Errors
    /// See [`Statement::fetch`].
    pub fn fetch_column(&mut self, idx: usize) -> Result<Option<SqlValue>, SqlBridgeError> {
        Ok(self
            .fetch(FetchMode::Column(idx))?
            .and_then(FetchedRow::into_column))
    }

    /// Result rows for a statement with result columns, affected rows otherwise.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match &self.shaping {
            Shaping::Native(native) => native.handle.row_count(),
            Shaping::Emulated(emulated) => match emulated.columns {
                ColumnCache::Columns(_) => emulated.handle.num_rows(),
                ColumnCache::NoResult => emulated.handle.affected_rows(),
                ColumnCache::Unknown => 0,
            },
        }
    }

    /// Column names captured after the first execution.
    #[must_use]
    pub fn column_names(&self) -> Option<&[String]> {
        match &self.shaping {
            Shaping::Native(native) => native.columns.as_ref().map(ColumnSet::names),
            Shaping::Emulated(emulated) => match &emulated.columns {
                ColumnCache::Columns(columns) => Some(columns.names()),
                ColumnCache::NoResult | ColumnCache::Unknown => None,
            },
        }
    }

    /// Release the current result. The statement can be executed again.
    pub fn close_cursor(&mut self) {
        match &mut self.shaping {
            Shaping::Native(native) => native.handle.close_cursor(),
            Shaping::Emulated(emulated) => emulated.handle.free_result(),
        }
        if self.state != StatementState::Prepared {
            self.state = StatementState::Closed;
        }
    }
}
