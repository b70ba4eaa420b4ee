use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SqlBridgeError;

/// Format used when a timestamp has to travel as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Values that can be bound as query parameters or read back from a row.
///
/// The same enum is used by every driver so helpers never branch on native types:
/// ```rust
/// use sql_bridge::prelude::*;
///
/// let values = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     SqlValue::Bool(true),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// Timestamp value
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let SqlValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let SqlValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => NaiveDateTime::parse_from_str(s, DATE_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }

    /// Human-readable name of the variant, used in conversion errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Blob(_) => "blob",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Driver-independent classification of a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Null,
    Int,
    #[default]
    Str,
    Lob,
}

impl ParamType {
    /// Parse a logical type name.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::UnsupportedParameterType`] for names outside
    /// `bool|boolean`, `null`, `int|integer`, `string|str`, `blob|lob`.
    pub fn parse(name: &str) -> Result<Self, SqlBridgeError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ParamType::Bool),
            "null" => Ok(ParamType::Null),
            "int" | "integer" => Ok(ParamType::Int),
            "string" | "str" => Ok(ParamType::Str),
            "blob" | "lob" => Ok(ParamType::Lob),
            _ => Err(SqlBridgeError::UnsupportedParameterType(name.to_string())),
        }
    }

    /// The logical type that carries `value` without conversion.
    #[must_use]
    pub fn for_value(value: &SqlValue) -> Self {
        match value {
            SqlValue::Null => ParamType::Null,
            SqlValue::Bool(_) => ParamType::Bool,
            SqlValue::Int(_) => ParamType::Int,
            SqlValue::Blob(_) => ParamType::Lob,
            SqlValue::Float(_) | SqlValue::Text(_) | SqlValue::Timestamp(_) => ParamType::Str,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Bool => "bool",
            ParamType::Null => "null",
            ParamType::Int => "int",
            ParamType::Str => "string",
            ParamType::Lob => "lob",
        }
    }
}

impl FromStr for ParamType {
    type Err = SqlBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamType::parse(s)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The database drivers this crate can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// `SQLite` through rusqlite (named-capable statements)
    Sqlite,
    /// `PostgreSQL` through tokio-postgres (positional-only statements)
    Postgres,
    /// `MySQL` and `MariaDB` through `mysql_async` (positional-only statements)
    Mysql,
}
