//! Connection-owning facade: prefix rewriting, execute with reconnect, and row loaders.

mod schema;
mod transaction;

pub use schema::{ColumnInfo, SchemaCache};

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::DatabaseOptions;
use crate::connection::{Connection, Connector, Dialect};
use crate::error::SqlBridgeError;
use crate::query::Query;
use crate::results::{AssocRow, FetchMode, FetchedRow, Record};
use crate::scanner::rewrite_prefix;
use crate::statement::Statement;
use crate::types::{ParamType, SqlValue};

/// One database, one lazily opened connection, one current query.
///
/// ```rust,no_run
/// use sql_bridge::prelude::*;
///
/// # fn main() -> Result<(), SqlBridgeError> {
/// let mut db = Database::open(DatabaseOptions::sqlite("app.db"))?;
/// db.set_query(Query::new("SELECT name FROM #__users WHERE id = :id"))
///     .bind("id", 1, ParamType::Int);
/// let name = db.load_result()?;
/// # let _ = name;
/// # Ok(())
/// # }
/// ```
pub struct Database {
    options: DatabaseOptions,
    connector: Box<dyn Connector>,
    connection: Option<Box<dyn Connection>>,
    query: Query,
    statement: Option<Statement>,
    schema: SchemaCache,
    transaction_depth: usize,
}

impl Database {
    /// Build a database for `options` using the connector of its driver.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::ConfigError`] when the options name no usable driver.
    pub fn open(options: DatabaseOptions) -> Result<Self, SqlBridgeError> {
        let connector = options.connector()?;
        Ok(Self::with_connector(options, connector))
    }

    /// Build a database around any connector. No connection is made yet.
    #[must_use]
    pub fn with_connector(options: DatabaseOptions, connector: Box<dyn Connector>) -> Self {
        Self {
            options,
            connector,
            connection: None,
            query: Query::default(),
            statement: None,
            schema: SchemaCache::default(),
            transaction_depth: 0,
        }
    }

    #[must_use]
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// Open the connection if it is not open yet.
    ///
    /// # Errors
    /// Returns the connector's error.
    pub fn connect(&mut self) -> Result<(), SqlBridgeError> {
        if self.connection.is_none() {
            self.connection = Some(self.connector.connect()?);
        }
        Ok(())
    }

    /// Whether an open connection answers the liveness check.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|conn| conn.ping())
    }

    /// Drop the statement and the connection. An open transaction is abandoned.
    pub fn disconnect(&mut self) {
        self.statement = None;
        self.connection = None;
        self.transaction_depth = 0;
    }

    /// Dialect of the open connection.
    ///
    /// # Errors
    /// Returns the connector's error when a connection has to be opened.
    pub fn dialect(&mut self) -> Result<Dialect, SqlBridgeError> {
        Ok(self.connection()?.dialect())
    }

    fn connection(&mut self) -> Result<&dyn Connection, SqlBridgeError> {
        self.connect()?;
        self.connection
            .as_deref()
            .ok_or_else(|| SqlBridgeError::ConnectionError("no open connection".into()))
    }

    /// `sql` with every unquoted `#__` replaced by the configured table prefix.
    #[must_use]
    pub fn replace_prefix(&self, sql: &str) -> String {
        rewrite_prefix(sql, &self.options.table_prefix).into_owned()
    }

    /// Make `query` current, releasing the previous result. Returns it for binding.
    pub fn set_query(&mut self, query: impl Into<Query>) -> &mut Query {
        self.free_result();
        self.query = query.into();
        &mut self.query
    }

    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// Run the current query.
    ///
    /// When execution fails and the liveness check then reports the connection
    /// dead, the connection is reopened and the query runs once more. Errors on a
    /// live connection are returned unchanged, and so is a lost connection while a
    /// transaction is open: a fresh connection would run the rest of it outside the
    /// transaction.
    ///
    /// # Errors
    /// Returns the prepare, bind or execution error of the (last) attempt, or the
    /// connector's error when reconnecting fails.
    pub fn execute(&mut self) -> Result<(), SqlBridgeError> {
        let sql = self.replace_prefix(&self.query.to_sql());
        match self.run(&sql) {
            Ok(()) => Ok(()),
            Err(err) => {
                if !self.options.reconnect_on_failure || self.connected() {
                    return Err(err);
                }
                if self.transaction_depth > 0 {
                    warn!(
                        sql = %sql,
                        error = %err,
                        depth = self.transaction_depth,
                        "connection lost inside a transaction; not retrying"
                    );
                    return Err(err);
                }
                warn!(sql = %sql, error = %err, "connection lost; reconnecting and retrying once");
                self.disconnect();
                if let Err(reconnect) = self.connect() {
                    debug!(error = %reconnect, "reconnect failed");
                    return Err(err);
                }
                self.run(&sql)
            }
        }
    }

    fn run(&mut self, sql: &str) -> Result<(), SqlBridgeError> {
        let reusable = self.statement.as_ref().is_some_and(|stmt| stmt.sql() == sql);
        if !reusable {
            self.statement = None;
            debug!(sql = %sql, "preparing statement");
            let statement = self.connection()?.prepare(sql)?;
            self.statement = Some(statement);
        }
        let statement = self
            .statement
            .as_mut()
            .ok_or_else(|| SqlBridgeError::InvalidState("statement was not prepared".into()))?;
        statement.execute(self.query.bound())
    }

    fn statement_mut(&mut self) -> Result<&mut Statement, SqlBridgeError> {
        self.statement
            .as_mut()
            .ok_or_else(|| SqlBridgeError::InvalidState("no statement has been executed".into()))
    }

    fn fetch(&mut self, mode: FetchMode) -> Result<Option<FetchedRow>, SqlBridgeError> {
        self.statement_mut()?.fetch(mode)
    }

    fn load_all(&mut self, mode: FetchMode) -> Result<Vec<FetchedRow>, SqlBridgeError> {
        self.execute()?;
        let rows = self.statement_mut()?.fetch_all(mode)?;
        self.free_result();
        Ok(rows)
    }

    fn load_first(&mut self, mode: FetchMode) -> Result<Option<FetchedRow>, SqlBridgeError> {
        self.execute()?;
        let row = self.fetch(mode)?;
        self.free_result();
        Ok(row)
    }

    /// First row as name→value pairs.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_assoc(&mut self) -> Result<Option<AssocRow>, SqlBridgeError> {
        Ok(self
            .load_first(FetchMode::Associative)?
            .and_then(FetchedRow::into_assoc))
    }

    /// First row as an ordered list of values.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_row(&mut self) -> Result<Option<Vec<SqlValue>>, SqlBridgeError> {
        Ok(self
            .load_first(FetchMode::Numeric)?
            .and_then(FetchedRow::into_numeric))
    }

    /// Column `idx` of every row.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_column(&mut self, idx: usize) -> Result<Vec<SqlValue>, SqlBridgeError> {
        Ok(self
            .load_all(FetchMode::Column(idx))?
            .into_iter()
            .filter_map(FetchedRow::into_column)
            .collect())
    }

    /// First column of the first row.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_result(&mut self) -> Result<Option<SqlValue>, SqlBridgeError> {
        Ok(self
            .load_first(FetchMode::Column(0))?
            .and_then(FetchedRow::into_column))
    }

    /// First row as a field record.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_object(&mut self) -> Result<Option<Record>, SqlBridgeError> {
        Ok(self
            .load_first(FetchMode::StandardObject)?
            .and_then(FetchedRow::into_record))
    }

    /// First row deserialized into `T` by column name.
    ///
    /// # Errors
    /// Returns the execution error, or [`SqlBridgeError::Other`] when the row does
    /// not fit `T`.
    pub fn load_object_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>, SqlBridgeError> {
        self.load_object()?
            .map(|record| record.deserialize())
            .transpose()
    }

    /// Every row as name→value pairs.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_assoc_list(&mut self) -> Result<Vec<AssocRow>, SqlBridgeError> {
        Ok(self
            .load_all(FetchMode::Associative)?
            .into_iter()
            .filter_map(FetchedRow::into_assoc)
            .collect())
    }

    /// Every row keyed by its `key` column; a repeated key keeps the last row.
    ///
    /// # Errors
    /// Returns the execution error, or [`SqlBridgeError::Other`] when `key` is not a
    /// result column.
    pub fn load_assoc_map(&mut self, key: &str) -> Result<Vec<(SqlValue, AssocRow)>, SqlBridgeError> {
        let rows = self.load_assoc_list()?;
        let mut keyed = Keyed::with_capacity(rows.len());
        for row in rows {
            let k = row.get(key).cloned().ok_or_else(|| missing_column(key))?;
            keyed.insert(k, row);
        }
        Ok(keyed.into_entries())
    }

    /// `column` of every row keyed by its `key` column; a repeated key keeps the last value.
    ///
    /// # Errors
    /// Returns the execution error, or [`SqlBridgeError::Other`] when either name is
    /// not a result column.
    pub fn load_column_map(
        &mut self,
        key: &str,
        column: &str,
    ) -> Result<Vec<(SqlValue, SqlValue)>, SqlBridgeError> {
        let rows = self.load_assoc_list()?;
        let mut keyed = Keyed::with_capacity(rows.len());
        for row in rows {
            let k = row.get(key).cloned().ok_or_else(|| missing_column(key))?;
            let v = row.get(column).cloned().ok_or_else(|| missing_column(column))?;
            keyed.insert(k, v);
        }
        Ok(keyed.into_entries())
    }

    /// Every row as an ordered list of values.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_row_list(&mut self) -> Result<Vec<Vec<SqlValue>>, SqlBridgeError> {
        Ok(self
            .load_all(FetchMode::Numeric)?
            .into_iter()
            .filter_map(FetchedRow::into_numeric)
            .collect())
    }

    /// Every row as a field record.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn load_object_list(&mut self) -> Result<Vec<Record>, SqlBridgeError> {
        Ok(self
            .load_all(FetchMode::StandardObject)?
            .into_iter()
            .filter_map(FetchedRow::into_record)
            .collect())
    }

    /// Every row as a record keyed by its `key` field; a repeated key keeps the last row.
    ///
    /// # Errors
    /// Returns the execution error, or [`SqlBridgeError::Other`] when `key` is not a
    /// result column.
    pub fn load_object_map(&mut self, key: &str) -> Result<Vec<(SqlValue, Record)>, SqlBridgeError> {
        let records = self.load_object_list()?;
        let mut keyed = Keyed::with_capacity(records.len());
        for record in records {
            let k = record.field(key).cloned().ok_or_else(|| missing_column(key))?;
            keyed.insert(k, record);
        }
        Ok(keyed.into_entries())
    }

    /// Every row deserialized into `T`.
    ///
    /// # Errors
    /// Returns the execution error, or [`SqlBridgeError::Other`] when a row does not
    /// fit `T`.
    pub fn load_object_list_as<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, SqlBridgeError> {
        self.load_object_list()?
            .iter()
            .map(|record| record.deserialize())
            .collect()
    }

    /// Result rows of the last execution.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.statement.as_ref().map_or(0, Statement::row_count)
    }

    /// Rows changed by the last execution.
    #[must_use]
    pub fn affected_rows(&self) -> usize {
        self.statement.as_ref().map_or(0, Statement::row_count)
    }

    /// Id generated by the last insert.
    ///
    /// # Errors
    /// Returns the driver's error.
    pub fn insert_id(&mut self) -> Result<i64, SqlBridgeError> {
        self.connection()?.last_insert_id()
    }

    /// Release the current result; the statement stays prepared.
    pub fn free_result(&mut self) {
        if let Some(statement) = self.statement.as_mut() {
            statement.close_cursor();
        }
    }

    /// Whether a row of `table` (prefix token allowed) matches every `(column, value)` pair.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn record_exists(
        &mut self,
        table: &str,
        properties: &[(&str, SqlValue)],
    ) -> Result<bool, SqlBridgeError> {
        if properties.is_empty() {
            return Ok(false);
        }
        let table = self.replace_prefix(table);
        let dialect = self.dialect()?;
        let conditions: Vec<String> = properties
            .iter()
            .enumerate()
            .map(|(idx, (column, _))| format!("{} = :p{idx}", quote_name_with(dialect, column, None)))
            .collect();
        let mut query = Query::new(format!(
            "SELECT 1 FROM {} WHERE {}",
            quote_name_with(dialect, &table, None),
            conditions.join(" AND ")
        ));
        query.set_limit(1, 0);
        for (idx, (_, value)) in properties.iter().enumerate() {
            query.bind(format!("p{idx}"), value.clone(), ParamType::for_value(value));
        }
        self.set_query(query);
        Ok(self.load_result()?.is_some())
    }

    /// `text` escaped for a single-quoted literal.
    ///
    /// # Errors
    /// Returns the connector's error when a connection has to be opened.
    pub fn escape(&mut self, text: &str, extra: bool) -> Result<String, SqlBridgeError> {
        Ok(self.dialect()?.escape(text, extra))
    }

    /// `text` as a SQL literal. Digit strings without a leading zero are left bare.
    ///
    /// # Errors
    /// Returns the connector's error when a connection has to be opened.
    pub fn quote(&mut self, text: &str, escape: bool) -> Result<String, SqlBridgeError> {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) && !text.starts_with('0') {
            return Ok(text.to_string());
        }
        let body = if escape {
            self.escape(text, false)?
        } else {
            text.to_string()
        };
        Ok(format!("'{body}'"))
    }

    /// Quote each value and join them with `, ` for an `IN (...)` list.
    ///
    /// # Errors
    /// Returns the connector's error when a connection has to be opened.
    pub fn values_to_string(&mut self, values: &[&str]) -> Result<String, SqlBridgeError> {
        let quoted = values
            .iter()
            .map(|v| self.quote(v, true))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(quoted.join(", "))
    }

    /// Quote a possibly dotted identifier, with an optional alias.
    ///
    /// # Errors
    /// Returns the connector's error when a connection has to be opened.
    pub fn quote_name(&mut self, name: &str, alias: Option<&str>) -> Result<String, SqlBridgeError> {
        Ok(quote_name_with(self.dialect()?, name, alias))
    }
}

fn quote_name_with(dialect: Dialect, name: &str, alias: Option<&str>) -> String {
    let q = dialect.name_quote();
    let quoted = name
        .split('.')
        .map(|part| format!("{q}{part}{q}"))
        .collect::<Vec<_>>()
        .join(".");
    match alias {
        Some(alias) => format!("{quoted} AS {q}{alias}{q}"),
        None => quoted,
    }
}

/// Hashable stand-in for a key column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyHash {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl From<&SqlValue> for KeyHash {
    fn from(value: &SqlValue) -> Self {
        match value {
            SqlValue::Null => KeyHash::Null,
            SqlValue::Bool(b) => KeyHash::Bool(*b),
            SqlValue::Int(i) => KeyHash::Int(*i),
            // -0.0 and 0.0 compare equal
            SqlValue::Float(f) if *f == 0.0 => KeyHash::Float(0.0f64.to_bits()),
            SqlValue::Float(f) => KeyHash::Float(f.to_bits()),
            SqlValue::Text(s) => KeyHash::Text(s.clone()),
            SqlValue::Blob(b) => KeyHash::Blob(b.clone()),
            SqlValue::Timestamp(ts) => KeyHash::Timestamp(*ts),
        }
    }
}

/// Rows keyed by a column, in first-seen key order; a repeated key overwrites its slot.
struct Keyed<T> {
    slots: HashMap<KeyHash, usize>,
    entries: Vec<(SqlValue, T)>,
}

impl<T> Keyed<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    fn insert(&mut self, key: SqlValue, value: T) {
        match self.slots.entry(KeyHash::from(&key)) {
            Entry::Occupied(slot) => self.entries[*slot.get()].1 = value,
            Entry::Vacant(slot) => {
                slot.insert(self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    fn into_entries(self) -> Vec<(SqlValue, T)> {
        self.entries
    }
}

fn missing_column(name: &str) -> SqlBridgeError {
    SqlBridgeError::Other(format!("column `{name}` is not in the result"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_dotted_names() {
        assert_eq!(quote_name_with(Dialect::Sqlite, "a.b", None), "`a`.`b`");
        assert_eq!(
            quote_name_with(Dialect::Postgres, "users", Some("u")),
            "\"users\" AS \"u\""
        );
    }

    #[test]
    fn keyed_insert_keeps_last_value_in_first_slot() {
        let mut keyed = Keyed::with_capacity(3);
        keyed.insert(SqlValue::Int(1), "a");
        keyed.insert(SqlValue::Int(2), "b");
        keyed.insert(SqlValue::Int(1), "c");
        assert_eq!(
            keyed.into_entries(),
            vec![(SqlValue::Int(1), "c"), (SqlValue::Int(2), "b")]
        );
    }

    #[test]
    fn keyed_insert_distinguishes_value_kinds() {
        let mut keyed = Keyed::with_capacity(4);
        keyed.insert(SqlValue::Int(1), 'a');
        keyed.insert(SqlValue::Text("1".into()), 'b');
        keyed.insert(SqlValue::Float(-0.0), 'c');
        keyed.insert(SqlValue::Float(0.0), 'd');
        let entries = keyed.into_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], (SqlValue::Float(-0.0), 'd'));
    }

    #[test]
    fn keyed_insert_scales_to_many_rows() {
        let mut keyed = Keyed::with_capacity(20_000);
        for i in 0..20_000i64 {
            keyed.insert(SqlValue::Int(i % 10_000), i);
        }
        let entries = keyed.into_entries();
        assert_eq!(entries.len(), 10_000);
        assert_eq!(entries[0], (SqlValue::Int(0), 10_000));
    }
}
