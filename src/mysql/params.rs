use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use mysql_async::Value;

use crate::native::{NativeError, type_code};
use crate::types::SqlValue;

/// Convert a bound value for the wire, following its positional type code.
///
/// An `i` code turns numeric text into an integer; anything else keeps the value's own kind.
///
/// # Errors
/// Returns a [`NativeError`] when an `i` value is text that is not an integer.
pub fn to_mysql_value(value: &SqlValue, code: char) -> Result<Value, NativeError> {
    let converted = match (value, code) {
        (SqlValue::Null, _) => Value::NULL,
        (SqlValue::Bool(b), _) => Value::Int(i64::from(*b)),
        (SqlValue::Int(i), _) => Value::Int(*i),
        (SqlValue::Float(f), _) => Value::Double(*f),
        (SqlValue::Text(s), type_code::INT) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| NativeError::new(format!("cannot bind '{s}' as an integer"), 0))?,
        (SqlValue::Text(s), _) => Value::Bytes(s.as_bytes().to_vec()),
        (SqlValue::Blob(bytes), _) => Value::Bytes(bytes.clone()),
        (SqlValue::Timestamp(dt), _) => timestamp_value(dt),
    };
    Ok(converted)
}

fn timestamp_value(dt: &NaiveDateTime) -> Value {
    // DATETIME years fit in u16; the narrowing only drops chrono's out-of-range extremes
    Value::Date(
        u16::try_from(dt.year()).unwrap_or(0),
        u8::try_from(dt.month()).unwrap_or(0),
        u8::try_from(dt.day()).unwrap_or(0),
        u8::try_from(dt.hour()).unwrap_or(0),
        u8::try_from(dt.minute()).unwrap_or(0),
        u8::try_from(dt.second()).unwrap_or(0),
        dt.nanosecond() / 1_000,
    )
}

/// Convert a value read from a result row back to a [`SqlValue`].
///
/// Byte strings that are valid UTF-8 read as text. `TIME` values read as `[-][d ]hh:mm:ss[.ffffff]` text,
/// and zero dates as `NULL`.
#[must_use]
pub fn from_mysql_value(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text),
            Err(err) => SqlValue::Blob(err.into_bytes()),
        },
        Value::Int(i) => SqlValue::Int(i),
        Value::UInt(u) => i64::try_from(u).map_or_else(|_| SqlValue::Text(u.to_string()), SqlValue::Int),
        Value::Float(f) => SqlValue::Float(f64::from(f)),
        Value::Double(d) => SqlValue::Float(d),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|d| {
                    d.and_hms_micro_opt(
                        u32::from(hour),
                        u32::from(minute),
                        u32::from(second),
                        micro,
                    )
                })
                .map_or(SqlValue::Null, SqlValue::Timestamp)
        }
        Value::Time(negative, days, hours, minutes, seconds, micro) => {
            let sign = if negative { "-" } else { "" };
            let day_part = if days > 0 { format!("{days} ") } else { String::new() };
            let fraction = if micro > 0 { format!(".{micro:06}") } else { String::new() };
            SqlValue::Text(format!(
                "{sign}{day_part}{hours:02}:{minutes:02}:{seconds:02}{fraction}"
            ))
        }
    }
}
