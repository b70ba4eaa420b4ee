use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::{Database, quote_name_with};
use crate::error::SqlBridgeError;
use crate::query::Query;
use crate::results::Record;
use crate::types::{DATE_FORMAT, SqlValue};

/// One column of a table as reported by the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

impl ColumnInfo {
    fn from_record(record: &Record) -> Result<Self, SqlBridgeError> {
        let text = |field: &str| {
            record.field(field).map(catalogue_text).ok_or_else(|| {
                SqlBridgeError::Other(format!("catalogue row has no `{field}` field"))
            })
        };
        let flag = |field: &str| record.field(field).and_then(SqlValue::as_bool).unwrap_or(false);

        Ok(Self {
            name: text("name")?,
            data_type: text("data_type")?,
            nullable: flag("nullable"),
            default_value: record
                .field("default_value")
                .filter(|v| !v.is_null())
                .map(catalogue_text),
            primary_key: flag("primary_key"),
        })
    }
}

fn catalogue_text(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) => f.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        SqlValue::Timestamp(ts) => ts.format(DATE_FORMAT).to_string(),
    }
}

/// Column descriptions per table, owned by one [`Database`].
#[derive(Debug, Default, Clone)]
pub struct SchemaCache {
    columns: HashMap<String, Vec<ColumnInfo>>,
}

impl SchemaCache {
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.columns.get(table).map(Vec::as_slice)
    }

    pub fn insert(&mut self, table: &str, columns: Vec<ColumnInfo>) {
        self.columns.insert(table.to_string(), columns);
    }

    pub fn invalidate(&mut self, table: &str) {
        self.columns.remove(table);
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Database {
    #[must_use]
    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schema
    }

    /// Names of the tables in the current schema, sorted.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn table_list(&mut self) -> Result<Vec<String>, SqlBridgeError> {
        let sql = self.dialect()?.table_list_sql();
        self.set_query(sql);
        Ok(self
            .load_column(0)?
            .into_iter()
            .filter_map(|v| v.as_text().map(str::to_string))
            .collect())
    }

    /// Whether `table` (prefix token allowed) exists.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn table_exists(&mut self, table: &str) -> Result<bool, SqlBridgeError> {
        let table = self.replace_prefix(table);
        Ok(self.table_list()?.contains(&table))
    }

    /// Columns of `table`, read from the catalogue once and cached.
    ///
    /// # Errors
    /// Returns the execution error, or [`SqlBridgeError::Other`] for a malformed
    /// catalogue row.
    pub fn table_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>, SqlBridgeError> {
        let table = self.replace_prefix(table);
        if let Some(columns) = self.schema.get(&table) {
            return Ok(columns.to_vec());
        }

        let dialect = self.dialect()?;
        let sql = dialect.table_columns_sql(
            &format!("'{}'", dialect.escape(&table, false)),
            &dialect.escape(&table, false),
        );
        self.set_query(Query::new(sql));
        let columns = self
            .load_object_list()?
            .iter()
            .map(ColumnInfo::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(table = %table, columns = columns.len(), "cached table columns");
        self.schema.insert(&table, columns.clone());
        Ok(columns)
    }

    /// Drop `table` if it exists.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn drop_table(&mut self, table: &str) -> Result<(), SqlBridgeError> {
        let table = self.replace_prefix(table);
        let quoted = quote_name_with(self.dialect()?, &table, None);
        self.set_query(format!("DROP TABLE IF EXISTS {quoted}"));
        self.execute()?;
        self.schema.invalidate(&table);
        Ok(())
    }

    /// Rename `old` to `new`.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn rename_table(&mut self, old: &str, new: &str) -> Result<(), SqlBridgeError> {
        let old = self.replace_prefix(old);
        let new = self.replace_prefix(new);
        let dialect = self.dialect()?;
        let sql = dialect.rename_sql(
            &quote_name_with(dialect, &old, None),
            &quote_name_with(dialect, &new, None),
        );
        self.set_query(sql);
        self.execute()?;
        self.schema.invalidate(&old);
        self.schema.invalidate(&new);
        Ok(())
    }

    /// Remove every row of `table`.
    ///
    /// # Errors
    /// Returns the execution error.
    pub fn truncate_table(&mut self, table: &str) -> Result<(), SqlBridgeError> {
        let table = self.replace_prefix(table);
        let dialect = self.dialect()?;
        self.set_query(dialect.truncate_sql(&quote_name_with(dialect, &table, None)));
        self.execute()?;
        self.schema.invalidate(&table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_is_per_table() {
        let mut cache = SchemaCache::default();
        cache.insert("a", Vec::new());
        cache.insert("b", Vec::new());
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        cache.clear();
        assert!(cache.is_empty());
    }
}
