//! Interfaces the core expects from native client statements.
//!
//! Two models are supported. A [`NamedNativeStatement`] binds by name or position
//! and shapes rows itself. A [`PositionalNativeStatement`] binds every parameter in
//! one call with a type-code string and only delivers rows into output variables
//! bound before the first fetch.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::params::ParamKey;
use crate::results::{FetchMode, FetchedRow};
use crate::types::SqlValue;

/// Error text and code reported by a native driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub message: String,
    pub code: i32,
}

impl NativeError {
    #[must_use]
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Type vocabulary of a named-capable driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedNativeType {
    Bool,
    Int,
    Blob,
    Str,
}

/// Type codes understood by a positional-only driver's `bind_all`.
pub mod type_code {
    pub const INT: char = 'i';
    pub const STR: char = 's';
}

/// A prepared statement whose driver binds by name and shapes rows natively.
pub trait NamedNativeStatement {
    /// Bind one value. Index keys are zero-based.
    ///
    /// # Errors
    /// Returns the driver's error when it rejects the key or value.
    fn bind(
        &mut self,
        key: &ParamKey,
        value: SqlValue,
        native_type: NamedNativeType,
        max_length: Option<usize>,
    ) -> Result<(), NativeError>;

    /// Forget every bound value.
    fn clear_bindings(&mut self);

    /// # Errors
    /// Returns the driver's error when execution fails.
    fn execute(&mut self) -> Result<(), NativeError>;

    /// Result column names of the last execution; `None` when it produced no columns.
    fn column_names(&self) -> Option<Vec<String>>;

    /// Next row in the requested shape, `None` once the cursor is exhausted.
    ///
    /// # Errors
    /// Returns the driver's error when the cursor cannot advance.
    fn fetch(&mut self, mode: FetchMode) -> Result<Option<FetchedRow>, NativeError>;

    /// Result rows for a query, affected rows otherwise.
    fn row_count(&self) -> usize;

    fn close_cursor(&mut self);
}

/// Output variables a positional-only driver writes each fetched row into.
///
/// The statement allocates one buffer per statement and hands a clone of the handle
/// to the driver through `bind_result`; both sides see the same slots.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    slots: Rc<RefCell<Vec<SqlValue>>>,
}

impl OutputBuffer {
    #[must_use]
    pub fn new(arity: usize) -> Self {
        Self {
            slots: Rc::new(RefCell::new(vec![SqlValue::Null; arity])),
        }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Reallocate the slots for a different column count.
    pub fn resize(&self, arity: usize) {
        self.slots.borrow_mut().resize(arity, SqlValue::Null);
    }

    /// Overwrite every slot from `values`; extra values are ignored, missing ones read NULL.
    pub fn fill(&self, values: impl IntoIterator<Item = SqlValue>) {
        let mut slots = self.slots.borrow_mut();
        let mut values = values.into_iter();
        for slot in slots.iter_mut() {
            *slot = values.next().unwrap_or(SqlValue::Null);
        }
    }

    /// Copy the current slot values into a plain ordered list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SqlValue> {
        self.slots.borrow().clone()
    }

    #[must_use]
    pub fn shares_slots_with(&self, other: &OutputBuffer) -> bool {
        Rc::ptr_eq(&self.slots, &other.slots)
    }
}

/// A prepared statement whose driver only understands positional markers.
pub trait PositionalNativeStatement {
    /// Number of positional markers in the prepared text.
    fn param_count(&self) -> usize;

    /// Bind every parameter in one call; `types` has one code per value.
    ///
    /// # Errors
    /// Returns the driver's error when it rejects the codes or values.
    fn bind_all(&mut self, types: &str, values: &[SqlValue]) -> Result<(), NativeError>;

    /// # Errors
    /// Returns the driver's error when execution fails.
    fn execute(&mut self) -> Result<(), NativeError>;

    /// Column names of the result, `None` for statements without a result.
    fn result_metadata(&mut self) -> Option<Vec<String>>;

    /// Buffer the whole result client-side so `num_rows` is known.
    ///
    /// # Errors
    /// Returns the driver's error when the result cannot be transferred.
    fn store_result(&mut self) -> Result<(), NativeError>;

    /// Register the output variables rows are written into.
    ///
    /// # Errors
    /// Returns the driver's error when the arity does not match the result.
    fn bind_result(&mut self, outputs: OutputBuffer) -> Result<(), NativeError>;

    /// Advance the cursor, writing the row into the bound outputs.
    ///
    /// # Errors
    /// Returns the driver's error when the cursor cannot advance.
    fn fetch(&mut self) -> Result<bool, NativeError>;

    fn affected_rows(&self) -> usize;

    fn num_rows(&self) -> usize;

    fn free_result(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_buffer_clones_share_slots() {
        let outputs = OutputBuffer::new(2);
        let driver_side = outputs.clone();
        driver_side.fill([SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]);
        assert_eq!(outputs.snapshot(), vec![SqlValue::Int(1), SqlValue::Int(2)]);
        assert!(outputs.shares_slots_with(&driver_side));

        driver_side.fill([SqlValue::Int(9)]);
        assert_eq!(outputs.snapshot(), vec![SqlValue::Int(9), SqlValue::Null]);
    }
}
