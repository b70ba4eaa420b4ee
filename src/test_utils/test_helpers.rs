//! Helper utilities for testing and development.

use crate::types::SqlValue;

/// Owned column names from string slices.
#[must_use]
pub fn column_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

/// A row of text values.
#[must_use]
pub fn text_row(values: &[&str]) -> Vec<SqlValue> {
    values.iter().map(|v| SqlValue::Text((*v).to_string())).collect()
}
