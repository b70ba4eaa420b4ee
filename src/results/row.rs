use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::SqlBridgeError;
use crate::types::SqlValue;

/// Column names captured from a statement, shared by every row it produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSet {
    names: Arc<Vec<String>>,
    // name -> index; a repeated name resolves to its last column
    index: Arc<HashMap<String, usize>>,
}

impl ColumnSet {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        Self {
            names: Arc::new(names),
            index: Arc::new(index),
        }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a column by name
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Names paired with the column index their value is read from, without repeats.
    pub fn unique(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.names
            .iter()
            .enumerate()
            .filter(|(i, name)| self.index_of(name) == Some(*i))
            .map(|(i, name)| (name.as_str(), i))
    }
}

/// A row keyed by column name.
///
/// Values are stored in column order; lookups go through the statement's shared
/// [`ColumnSet`] index, so building a row never rebuilds the name map.
#[derive(Debug, Clone, PartialEq)]
pub struct AssocRow {
    columns: ColumnSet,
    values: Vec<SqlValue>,
}

impl AssocRow {
    #[must_use]
    pub fn new(columns: ColumnSet, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.columns
            .index_of(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn contains_key(&self, column_name: &str) -> bool {
        self.columns.index_of(column_name).is_some()
    }

    /// `(name, value)` pairs; a repeated column name appears once with its last value.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SqlValue)> + '_ {
        self.columns
            .unique()
            .filter_map(|(name, idx)| self.values.get(idx).map(|v| (name, v)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.unique().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Key of a [`MixedRow`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Index(usize),
    Name(String),
}

impl From<usize> for RowKey {
    fn from(idx: usize) -> Self {
        RowKey::Index(idx)
    }
}

impl From<&str> for RowKey {
    fn from(name: &str) -> Self {
        RowKey::Name(name.to_string())
    }
}

/// A row readable both by position and by name.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedRow {
    columns: ColumnSet,
    values: Vec<SqlValue>,
}

impl MixedRow {
    #[must_use]
    pub fn new(columns: ColumnSet, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn get(&self, key: impl Into<RowKey>) -> Option<&SqlValue> {
        match key.into() {
            RowKey::Index(idx) => self.values.get(idx),
            RowKey::Name(name) => self
                .columns
                .index_of(&name)
                .and_then(|idx| self.values.get(idx)),
        }
    }

    /// Numeric entries first, then the named ones.
    #[must_use]
    pub fn entries(&self) -> Vec<(RowKey, &SqlValue)> {
        let numeric = self
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| (RowKey::Index(i), v));
        let named = self
            .columns
            .unique()
            .filter_map(|(name, idx)| self.values.get(idx).map(|v| (RowKey::Name(name.to_string()), v)));
        numeric.chain(named).collect()
    }

    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// A row materialized as a record with named fields.
///
/// Records serialize as maps, which is what lets [`Record::deserialize`] turn a row
/// into any `serde` type:
/// ```rust
/// use serde::Deserialize;
/// use sql_bridge::results::{ColumnSet, Record};
/// use sql_bridge::SqlValue;
///
/// #[derive(Deserialize)]
/// struct User { id: i64, name: String }
///
/// let columns = ColumnSet::new(vec!["id".into(), "name".into()]);
/// let record = Record::new(columns, vec![SqlValue::Int(7), SqlValue::Text("ann".into())]);
/// let user: User = record.deserialize().unwrap();
/// assert_eq!((user.id, user.name.as_str()), (7, "ann"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: ColumnSet,
    values: Vec<SqlValue>,
}

impl Record {
    #[must_use]
    pub fn new(columns: ColumnSet, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .index_of(name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &SqlValue)> + '_ {
        self.columns
            .unique()
            .filter_map(|(name, idx)| self.values.get(idx).map(|v| (name, v)))
    }

    /// The record as a JSON object.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::Other`] if a value cannot be represented as JSON.
    pub fn to_json(&self) -> Result<JsonMap<String, JsonValue>, SqlBridgeError> {
        let mut map = JsonMap::new();
        for (name, value) in self.fields() {
            let json = serde_json::to_value(value)
                .map_err(|e| SqlBridgeError::Other(format!("record field `{name}`: {e}")))?;
            map.insert(name.to_string(), json);
        }
        Ok(map)
    }

    /// Deserialize the record into `T`, matching fields by column name.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::Other`] when the fields do not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, SqlBridgeError> {
        let json = JsonValue::Object(self.to_json()?);
        serde_json::from_value(json)
            .map_err(|e| SqlBridgeError::Other(format!("record deserialization error: {e}")))
    }

    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.fields() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
