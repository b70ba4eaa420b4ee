use std::collections::VecDeque;

use super::row::ColumnSet;
use crate::types::SqlValue;

/// A buffered result set.
///
/// Drivers fill one of these at execute time and hand rows out one at a time, which
/// is what makes `num_rows` available before the first fetch.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    columns: Option<ColumnSet>,
    rows: VecDeque<Vec<SqlValue>>,
    total_rows: usize,
    /// The number of rows affected (for DML statements)
    pub rows_affected: usize,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            columns: None,
            rows: VecDeque::with_capacity(capacity),
            total_rows: 0,
            rows_affected: 0,
        }
    }

    /// A result set for a statement that produced no columns.
    #[must_use]
    pub fn affected(rows_affected: usize) -> ResultSet {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_columns(&mut self, columns: ColumnSet) {
        self.columns = Some(columns);
    }

    #[must_use]
    pub fn columns(&self) -> Option<&ColumnSet> {
        self.columns.as_ref()
    }

    /// Add a row to the result set
    pub fn add_row_values(&mut self, row_values: Vec<SqlValue>) {
        self.rows.push_back(row_values);
        self.total_rows += 1;
    }

    /// Take the next buffered row.
    pub fn pop_row(&mut self) -> Option<Vec<SqlValue>> {
        self.rows.pop_front()
    }

    /// Rows buffered at execute time, consumed or not.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.total_rows
    }

    /// Rows not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Drop any unread rows.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
