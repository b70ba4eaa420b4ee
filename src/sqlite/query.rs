use rusqlite::types::Value;

use crate::results::{ColumnSet, ResultSet};
use crate::types::SqlValue;

use super::params::from_sqlite_value;

/// Extract a [`SqlValue`] from a `SQLite` row.
///
/// # Errors
///
/// Returns the rusqlite error if the column cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, rusqlite::Error> {
    let value: Value = row.get(idx)?;
    Ok(from_sqlite_value(value))
}

/// Drain a bound statement into a buffered [`ResultSet`].
///
/// Statements without result columns are executed and report their change count.
///
/// # Errors
/// Returns the rusqlite error raised while stepping the statement.
pub fn build_result_set(stmt: &mut rusqlite::Statement<'_>) -> Result<ResultSet, rusqlite::Error> {
    let column_count = stmt.column_count();
    if column_count == 0 {
        let changed = stmt.raw_execute()?;
        return Ok(ResultSet::affected(changed));
    }

    let columns = ColumnSet::new(
        stmt.column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
    );

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_columns(columns);

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(sqlite_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
