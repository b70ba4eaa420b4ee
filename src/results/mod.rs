//! Fetch modes and the row shapes they produce.

mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::{AssocRow, ColumnSet, MixedRow, Record, RowKey};

use crate::types::SqlValue;

/// Structural form a fetched row is returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Ordered list of values.
    Numeric,
    /// Column name → value.
    Associative,
    /// Numeric and associative views merged, numeric keys first.
    #[default]
    Mixed,
    /// Name → value materialized as a [`Record`].
    StandardObject,
    /// A single column of the next row; missing columns read as NULL.
    Column(usize),
}

/// A row in the shape requested by a [`FetchMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedRow {
    Numeric(Vec<SqlValue>),
    Associative(AssocRow),
    Mixed(MixedRow),
    Object(Record),
    Column(SqlValue),
}

impl FetchedRow {
    /// Shape an ordered list of values using the statement's column set.
    #[must_use]
    pub fn build(mode: FetchMode, columns: &ColumnSet, mut values: Vec<SqlValue>) -> Self {
        match mode {
            FetchMode::Numeric => FetchedRow::Numeric(values),
            FetchMode::Associative => FetchedRow::Associative(AssocRow::new(columns.clone(), values)),
            FetchMode::Mixed => FetchedRow::Mixed(MixedRow::new(columns.clone(), values)),
            FetchMode::StandardObject => FetchedRow::Object(Record::new(columns.clone(), values)),
            FetchMode::Column(idx) => {
                if idx < values.len() {
                    FetchedRow::Column(values.swap_remove(idx))
                } else {
                    FetchedRow::Column(SqlValue::Null)
                }
            }
        }
    }

    /// Value of a column by position, for shapes that keep every column.
    #[must_use]
    pub fn get_index(&self, idx: usize) -> Option<&SqlValue> {
        match self {
            FetchedRow::Numeric(values) => values.get(idx),
            FetchedRow::Mixed(row) => row.get(idx),
            FetchedRow::Column(value) if idx == 0 => Some(value),
            _ => None,
        }
    }

    /// Value of a column by name, for shapes that carry names.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        match self {
            FetchedRow::Associative(row) => row.get(name),
            FetchedRow::Mixed(row) => row.get(name),
            FetchedRow::Object(record) => record.field(name),
            _ => None,
        }
    }

    /// The underlying ordered values, whatever the shape.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        match self {
            FetchedRow::Numeric(values) => values,
            FetchedRow::Associative(row) => row.into_values(),
            FetchedRow::Mixed(row) => row.into_values(),
            FetchedRow::Object(record) => record.into_values(),
            FetchedRow::Column(value) => vec![value],
        }
    }

    #[must_use]
    pub fn into_numeric(self) -> Option<Vec<SqlValue>> {
        if let FetchedRow::Numeric(values) = self {
            Some(values)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_assoc(self) -> Option<AssocRow> {
        if let FetchedRow::Associative(row) = self {
            Some(row)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_mixed(self) -> Option<MixedRow> {
        if let FetchedRow::Mixed(row) = self {
            Some(row)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        if let FetchedRow::Object(record) = self {
            Some(record)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_column(self) -> Option<SqlValue> {
        if let FetchedRow::Column(value) = self {
            Some(value)
        } else {
            None
        }
    }
}
