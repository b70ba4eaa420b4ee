use std::rc::Rc;

use rusqlite::types::Value;

use crate::native::{NamedNativeStatement, NamedNativeType, NativeError};
use crate::params::ParamKey;
use crate::results::{FetchMode, FetchedRow, ResultSet};

use super::native_error;
use super::params::to_sqlite_value;
use super::query::build_result_set;

/// A `SQLite` statement bound by name or one-based index.
///
/// The compiled statement lives in the connection's statement cache; this handle
/// only keeps the SQL, the pending bindings and the buffered result of the last
/// execution.
pub struct SqliteStatement {
    conn: Rc<rusqlite::Connection>,
    sql: String,
    bindings: Vec<(usize, Value)>,
    result: Option<ResultSet>,
}

impl SqliteStatement {
    /// Compile `sql` once so syntax errors surface at prepare time.
    ///
    /// # Errors
    /// Returns the driver's error when `SQLite` rejects the text.
    pub fn prepare(conn: Rc<rusqlite::Connection>, sql: &str) -> Result<Self, NativeError> {
        conn.prepare_cached(sql).map_err(|e| native_error(&e))?;
        Ok(Self {
            conn,
            sql: sql.to_string(),
            bindings: Vec::new(),
            result: None,
        })
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn resolve(&self, key: &ParamKey) -> Result<usize, NativeError> {
        let stmt = self.conn.prepare_cached(&self.sql).map_err(|e| native_error(&e))?;
        let count = stmt.parameter_count();
        match key {
            ParamKey::Named(name) => stmt
                .parameter_index(&format!(":{name}"))
                .map_err(|e| native_error(&e))?
                .ok_or_else(|| NativeError::new(format!("no such parameter :{name}"), 0)),
            ParamKey::Index(idx) if *idx < count => Ok(idx + 1),
            ParamKey::Index(idx) => Err(NativeError::new(
                format!("index {idx} out of range for {count} parameters"),
                0,
            )),
        }
    }
}

impl NamedNativeStatement for SqliteStatement {
    fn bind(
        &mut self,
        key: &ParamKey,
        value: crate::types::SqlValue,
        native_type: NamedNativeType,
        _max_length: Option<usize>,
    ) -> Result<(), NativeError> {
        let position = self.resolve(key)?;
        let value = to_sqlite_value(&value, native_type);
        match self.bindings.iter_mut().find(|(p, _)| *p == position) {
            Some(slot) => slot.1 = value,
            None => self.bindings.push((position, value)),
        }
        Ok(())
    }

    fn clear_bindings(&mut self) {
        self.bindings.clear();
    }

    fn execute(&mut self) -> Result<(), NativeError> {
        let mut stmt = self.conn.prepare_cached(&self.sql).map_err(|e| native_error(&e))?;
        for (position, value) in &self.bindings {
            stmt.raw_bind_parameter(*position, value)
                .map_err(|e| native_error(&e))?;
        }
        let result = build_result_set(&mut stmt).map_err(|e| native_error(&e))?;
        self.result = Some(result);
        Ok(())
    }

    fn column_names(&self) -> Option<Vec<String>> {
        self.result
            .as_ref()
            .and_then(ResultSet::columns)
            .map(|columns| columns.names().to_vec())
    }

    fn fetch(&mut self, mode: FetchMode) -> Result<Option<FetchedRow>, NativeError> {
        let Some(result) = self.result.as_mut() else {
            return Ok(None);
        };
        let Some(columns) = result.columns().cloned() else {
            return Ok(None);
        };
        Ok(result
            .pop_row()
            .map(|values| FetchedRow::build(mode, &columns, values)))
    }

    fn row_count(&self) -> usize {
        match &self.result {
            Some(result) if result.columns().is_some() => result.num_rows(),
            Some(result) => result.rows_affected,
            None => 0,
        }
    }

    fn close_cursor(&mut self) {
        if let Some(result) = self.result.as_mut() {
            result.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlValue;

    fn memory() -> Rc<rusqlite::Connection> {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO t (name) VALUES ('a'), ('b');",
        )
        .unwrap();
        Rc::new(conn)
    }

    #[test]
    fn binds_by_name_and_shapes_rows() {
        let mut stmt = SqliteStatement::prepare(memory(), "SELECT id, name FROM t WHERE name = :name").unwrap();
        stmt.bind(
            &ParamKey::named("name"),
            SqlValue::Text("b".into()),
            NamedNativeType::Str,
            None,
        )
        .unwrap();
        stmt.execute().unwrap();
        assert_eq!(stmt.column_names(), Some(vec!["id".to_string(), "name".to_string()]));
        assert_eq!(stmt.row_count(), 1);

        let row = stmt.fetch(FetchMode::Associative).unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&SqlValue::Int(2)));
        assert!(stmt.fetch(FetchMode::Associative).unwrap().is_none());
    }

    #[test]
    fn unknown_name_is_rejected_at_bind() {
        let mut stmt = SqliteStatement::prepare(memory(), "SELECT * FROM t WHERE id = :id").unwrap();
        let err = stmt
            .bind(&ParamKey::named("nope"), SqlValue::Int(1), NamedNativeType::Int, None)
            .unwrap_err();
        assert!(err.message.contains(":nope"));
    }

    #[test]
    fn dml_reports_changes() {
        let mut stmt = SqliteStatement::prepare(memory(), "UPDATE t SET name = ?").unwrap();
        stmt.bind(&ParamKey::Index(0), SqlValue::Text("z".into()), NamedNativeType::Str, None)
            .unwrap();
        stmt.execute().unwrap();
        assert_eq!(stmt.column_names(), None);
        assert_eq!(stmt.row_count(), 2);
    }

    #[test]
    fn syntax_errors_surface_at_prepare() {
        let err = SqliteStatement::prepare(memory(), "SELEC oops").err().unwrap();
        assert!(err.message.contains("syntax error"));
    }
}
