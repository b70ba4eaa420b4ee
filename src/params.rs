//! Driver-independent parameter model.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::SqlBridgeError;
use crate::types::{DATE_FORMAT, ParamType, SqlValue};

/// Key a parameter is bound under: a placeholder name or a zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// Named placeholder, stored without the leading colon.
    Named(String),
    /// Zero-based position of a positional marker.
    Index(usize),
}

impl ParamKey {
    #[must_use]
    pub fn named(name: &str) -> Self {
        ParamKey::Named(name.strip_prefix(':').unwrap_or(name).to_string())
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        ParamKey::named(name)
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        ParamKey::named(&name)
    }
}

impl From<usize> for ParamKey {
    fn from(index: usize) -> Self {
        ParamKey::Index(index)
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Named(name) => write!(f, ":{name}"),
            ParamKey::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

/// A value bound to a query together with its logical type.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub key: ParamKey,
    pub value: SqlValue,
    pub param_type: ParamType,
    /// Maximum length hint for the native driver; `0` means unbounded.
    pub max_length: usize,
    /// Opaque options handed to the native driver unchanged.
    pub driver_options: Option<JsonValue>,
}

impl Parameter {
    #[must_use]
    pub fn new(key: impl Into<ParamKey>, value: impl Into<SqlValue>, param_type: ParamType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            param_type,
            max_length: 0,
            driver_options: None,
        }
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    #[must_use]
    pub fn with_driver_options(mut self, options: JsonValue) -> Self {
        self.driver_options = Some(options);
        self
    }

    /// The value converted to what its logical type promises the driver.
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::ParameterError`] when the value cannot be read as the
    /// declared type. The message names the key and the value kind, never the value.
    pub fn coerced_value(&self) -> Result<SqlValue, SqlBridgeError> {
        if self.value.is_null() {
            return Ok(SqlValue::Null);
        }
        match self.param_type {
            ParamType::Null => Ok(SqlValue::Null),
            ParamType::Bool => self.coerce_bool(),
            ParamType::Int => self.coerce_int(),
            ParamType::Str => Ok(coerce_text(&self.value)),
            ParamType::Lob => Ok(coerce_blob(&self.value)),
        }
    }

    fn coerce_bool(&self) -> Result<SqlValue, SqlBridgeError> {
        match &self.value {
            SqlValue::Bool(b) => Ok(SqlValue::Bool(*b)),
            SqlValue::Int(i) => Ok(SqlValue::Bool(*i != 0)),
            SqlValue::Float(f) => Ok(SqlValue::Bool(*f != 0.0)),
            SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(SqlValue::Bool(true)),
                "0" | "false" | "no" | "off" | "" => Ok(SqlValue::Bool(false)),
                _ => Err(self.mismatch()),
            },
            _ => Err(self.mismatch()),
        }
    }

    fn coerce_int(&self) -> Result<SqlValue, SqlBridgeError> {
        match &self.value {
            SqlValue::Int(i) => Ok(SqlValue::Int(*i)),
            SqlValue::Bool(b) => Ok(SqlValue::Int(i64::from(*b))),
            #[allow(clippy::cast_possible_truncation)]
            SqlValue::Float(f) if f.is_finite() => Ok(SqlValue::Int(f.trunc() as i64)),
            SqlValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(SqlValue::Int)
                .map_err(|_| self.mismatch()),
            _ => Err(self.mismatch()),
        }
    }

    fn mismatch(&self) -> SqlBridgeError {
        SqlBridgeError::ParameterError(format!(
            "{} holds a {} value that cannot be bound as {}",
            self.key,
            self.value.kind(),
            self.param_type
        ))
    }
}

fn coerce_text(value: &SqlValue) -> SqlValue {
    match value {
        SqlValue::Text(s) => SqlValue::Text(s.clone()),
        SqlValue::Int(i) => SqlValue::Text(i.to_string()),
        SqlValue::Float(f) => SqlValue::Text(f.to_string()),
        SqlValue::Bool(b) => SqlValue::Text(if *b { "1" } else { "0" }.to_string()),
        SqlValue::Timestamp(ts) => SqlValue::Text(ts.format(DATE_FORMAT).to_string()),
        SqlValue::Blob(bytes) => SqlValue::Blob(bytes.clone()),
        SqlValue::Null => SqlValue::Null,
    }
}

fn coerce_blob(value: &SqlValue) -> SqlValue {
    match coerce_text(value) {
        SqlValue::Text(s) => SqlValue::Blob(s.into_bytes()),
        other => other,
    }
}

/// Parameters bound to a query, kept in insertion order.
///
/// Rebinding a key overwrites the value in its original slot so rebinding before a
/// re-execution never reorders the set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParams {
    params: Vec<Parameter>,
}

impl BoundParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the parameter under `key`.
    pub fn bind(&mut self, key: impl Into<ParamKey>, value: impl Into<SqlValue>, param_type: ParamType) {
        self.bind_param(Parameter::new(key, value, param_type));
    }

    /// Store or overwrite a fully specified parameter.
    pub fn bind_param(&mut self, param: Parameter) {
        if let Some(existing) = self.params.iter_mut().find(|p| p.key == param.key) {
            *existing = param;
        } else {
            self.params.push(param);
        }
    }

    /// Bind several values sharing one logical type.
    pub fn bind_array<K, V, I>(&mut self, values: I, param_type: ParamType)
    where
        K: Into<ParamKey>,
        V: Into<SqlValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in values {
            self.bind(key, value, param_type);
        }
    }

    /// Remove the parameter under `key`, returning it if present.
    pub fn unbind(&mut self, key: impl Into<ParamKey>) -> Option<Parameter> {
        let key = key.into();
        let idx = self.params.iter().position(|p| p.key == key)?;
        Some(self.params.remove(idx))
    }

    pub fn unbind_many<K: Into<ParamKey>>(&mut self, keys: impl IntoIterator<Item = K>) {
        for key in keys {
            self.unbind(key);
        }
    }

    #[must_use]
    pub fn get(&self, key: &ParamKey) -> Option<&Parameter> {
        self.params.iter().find(|p| &p.key == key)
    }

    /// The full set in insertion order.
    #[must_use]
    pub fn get_bound(&self) -> &[Parameter] {
        &self.params
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_keeps_insertion_slot() {
        let mut bound = BoundParams::new();
        bound.bind(":a", 1, ParamType::Int);
        bound.bind("b", "x", ParamType::Str);
        bound.bind("a", 2, ParamType::Int);
        let keys: Vec<_> = bound.get_bound().iter().map(|p| p.key.to_string()).collect();
        assert_eq!(keys, vec![":a", ":b"]);
        assert_eq!(bound.get(&ParamKey::named("a")).unwrap().value, SqlValue::Int(2));
    }

    #[test]
    fn unbind_removes() {
        let mut bound = BoundParams::new();
        bound.bind_array([("a", 1), ("b", 2), ("c", 3)], ParamType::Int);
        assert!(bound.unbind(":b").is_some());
        assert!(bound.unbind("missing").is_none());
        bound.unbind_many(["a"]);
        assert_eq!(bound.len(), 1);
        assert_eq!(bound.get_bound()[0].key, ParamKey::named("c"));
    }

    #[test]
    fn coercion_follows_logical_type() {
        let p = Parameter::new("n", "42", ParamType::Int);
        assert_eq!(p.coerced_value().unwrap(), SqlValue::Int(42));

        let p = Parameter::new("flag", 0, ParamType::Bool);
        assert_eq!(p.coerced_value().unwrap(), SqlValue::Bool(false));

        let p = Parameter::new("s", 7, ParamType::Str);
        assert_eq!(p.coerced_value().unwrap(), SqlValue::Text("7".into()));

        let p = Parameter::new("b", "raw", ParamType::Lob);
        assert_eq!(p.coerced_value().unwrap(), SqlValue::Blob(b"raw".to_vec()));

        let p = Parameter::new("z", "anything", ParamType::Null);
        assert_eq!(p.coerced_value().unwrap(), SqlValue::Null);
    }

    #[test]
    fn coercion_error_hides_value() {
        let p = Parameter::new("age", "secret-token", ParamType::Int);
        let err = p.coerced_value().unwrap_err().to_string();
        assert!(err.contains(":age"));
        assert!(!err.contains("secret-token"));
    }
}
