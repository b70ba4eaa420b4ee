//! Drives native binding calls from a [`BoundParams`] set.

use crate::error::SqlBridgeError;
use crate::native::{
    NamedNativeStatement, NamedNativeType, NativeError, PositionalNativeStatement, type_code,
};
use crate::params::{BoundParams, ParamKey, Parameter};
use crate::scanner::PlaceholderMap;
use crate::types::{ParamType, SqlValue};

/// Translate a logical type for a named-capable driver.
#[must_use]
pub fn named_native_type(param_type: ParamType) -> NamedNativeType {
    match param_type {
        ParamType::Bool => NamedNativeType::Bool,
        ParamType::Int => NamedNativeType::Int,
        ParamType::Lob => NamedNativeType::Blob,
        ParamType::Null | ParamType::Str => NamedNativeType::Str,
    }
}

/// Translate a logical type to a positional-only driver's type code.
///
/// Large objects travel as strings; a blob code would require streaming the value
/// in chunks before execution.
#[must_use]
pub fn positional_type_code(param_type: ParamType) -> char {
    match param_type {
        ParamType::Bool | ParamType::Int => type_code::INT,
        ParamType::Null | ParamType::Str | ParamType::Lob => type_code::STR,
    }
}

/// Values and type codes for one `bind_all` call, in position order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionalBinding {
    pub types: String,
    pub values: Vec<SqlValue>,
}

impl PositionalBinding {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bind `params` on a named-capable statement.
///
/// Every name found by the placeholder scan must be bound before anything reaches
/// the driver.
///
/// # Errors
/// Returns [`SqlBridgeError::PrepareOrBindFailure`] for a missing parameter or a
/// value the driver rejects, and [`SqlBridgeError::ParameterError`] for a value
/// that does not fit its logical type.
pub fn bind_named(
    stmt: &mut dyn NamedNativeStatement,
    params: &BoundParams,
    placeholders: &PlaceholderMap,
    sql: &str,
) -> Result<(), SqlBridgeError> {
    for name in placeholders.names() {
        if params.get(&ParamKey::named(name)).is_none() {
            return Err(missing(&format!(":{name}"), sql));
        }
    }

    stmt.clear_bindings();
    for param in params.get_bound() {
        let value = param.coerced_value()?;
        let max_length = (param.max_length > 0).then_some(param.max_length);
        stmt.bind(&param.key, value, named_native_type(param.param_type), max_length)
            .map_err(|e| SqlBridgeError::prepare(e, sql))?;
    }
    Ok(())
}

/// Lay `params` out by position for a positional-only driver.
///
/// Named keys are translated through the mapping; a name used at several positions
/// fills every one of them with the same value. With an empty mapping the
/// parameters are taken in call order with a uniform string type.
///
/// # Errors
/// Returns [`SqlBridgeError::PrepareOrBindFailure`] when a position has no
/// parameter or a name does not occur in the statement.
pub fn positional_binding(
    params: &BoundParams,
    placeholders: &PlaceholderMap,
    sql: &str,
) -> Result<PositionalBinding, SqlBridgeError> {
    if placeholders.is_empty() {
        return call_order_binding(params.get_bound());
    }

    let mut slots: Vec<Option<(char, SqlValue)>> = vec![None; placeholders.len()];
    for param in params.get_bound() {
        let value = param.coerced_value()?;
        let code = positional_type_code(param.param_type);
        match &param.key {
            ParamKey::Named(name) => {
                let mut found = false;
                for position in placeholders.positions_of(name) {
                    slots[position] = Some((code, value.clone()));
                    found = true;
                }
                if !found {
                    return Err(SqlBridgeError::PrepareOrBindFailure {
                        message: format!("parameter {} does not occur in the statement", param.key),
                        code: 0,
                        sql: sql.to_string(),
                    });
                }
            }
            ParamKey::Index(idx) => match slots.get_mut(*idx) {
                Some(slot) => *slot = Some((code, value)),
                None => {
                    return Err(SqlBridgeError::PrepareOrBindFailure {
                        message: format!(
                            "position {idx} is out of range for {} markers",
                            placeholders.len()
                        ),
                        code: 0,
                        sql: sql.to_string(),
                    });
                }
            },
        }
    }

    let mut binding = PositionalBinding {
        types: String::with_capacity(slots.len()),
        values: Vec::with_capacity(slots.len()),
    };
    for (position, slot) in slots.into_iter().enumerate() {
        let Some((code, value)) = slot else {
            let name = placeholders
                .occurrences()
                .iter()
                .find(|occ| occ.position == position)
                .map_or_else(|| format!("#{position}"), |occ| format!(":{}", occ.name));
            return Err(missing(&name, sql));
        };
        binding.types.push(code);
        binding.values.push(value);
    }
    Ok(binding)
}

fn call_order_binding(params: &[Parameter]) -> Result<PositionalBinding, SqlBridgeError> {
    let mut ordered: Vec<&Parameter> = params.iter().collect();
    if ordered.iter().all(|p| matches!(p.key, ParamKey::Index(_))) {
        ordered.sort_by_key(|p| match p.key {
            ParamKey::Index(idx) => idx,
            ParamKey::Named(_) => usize::MAX,
        });
    }

    let mut binding = PositionalBinding::default();
    for param in ordered {
        let as_text = Parameter {
            param_type: ParamType::Str,
            ..param.clone()
        };
        binding.types.push(type_code::STR);
        binding.values.push(as_text.coerced_value()?);
    }
    Ok(binding)
}

/// Bind `params` on a positional-only statement with a single `bind_all` call.
///
/// The call is skipped only when the statement has no markers at all, so values
/// from a previous execution are never reused.
///
/// # Errors
/// See [`positional_binding`]; a rejected `bind_all` becomes
/// [`SqlBridgeError::PrepareOrBindFailure`] carrying the driver's text and code.
pub fn bind_positional(
    stmt: &mut dyn PositionalNativeStatement,
    params: &BoundParams,
    placeholders: &PlaceholderMap,
    sql: &str,
) -> Result<(), SqlBridgeError> {
    let binding = positional_binding(params, placeholders, sql)?;
    if binding.is_empty() && stmt.param_count() == 0 {
        return Ok(());
    }
    stmt.bind_all(&binding.types, &binding.values)
        .map_err(|e| SqlBridgeError::prepare(e, sql))
}

fn missing(name: &str, sql: &str) -> SqlBridgeError {
    SqlBridgeError::prepare(NativeError::new(format!("no value bound for {name}"), 0), sql)
}
