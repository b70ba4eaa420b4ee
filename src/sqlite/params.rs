use rusqlite::types::Value;

use crate::native::NamedNativeType;
use crate::types::{DATE_FORMAT, SqlValue};

/// Convert a bound value to the rusqlite storage class its native type asks for.
#[must_use]
pub fn to_sqlite_value(value: &SqlValue, native_type: NamedNativeType) -> Value {
    match (value, native_type) {
        (SqlValue::Null, _) => Value::Null,
        (SqlValue::Bool(b), _) => Value::Integer(i64::from(*b)),
        (SqlValue::Int(i), NamedNativeType::Str) => Value::Text(i.to_string()),
        (SqlValue::Int(i), _) => Value::Integer(*i),
        (SqlValue::Float(f), _) => Value::Real(*f),
        (SqlValue::Text(s), NamedNativeType::Blob) => Value::Blob(s.as_bytes().to_vec()),
        (SqlValue::Text(s), _) => Value::Text(s.clone()),
        (SqlValue::Blob(bytes), _) => Value::Blob(bytes.clone()),
        (SqlValue::Timestamp(dt), _) => Value::Text(dt.format(DATE_FORMAT).to_string()),
    }
}

/// Convert a stored rusqlite value back to a [`SqlValue`].
#[must_use]
pub fn from_sqlite_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}
