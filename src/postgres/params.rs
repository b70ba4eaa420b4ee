use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::{DATE_FORMAT, SqlValue};

type BoxedError = Box<dyn Error + Sync + Send>;

const DATETIME_FORMATS: [&str; 4] = [
    DATE_FORMAT,
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

fn mismatch(value: &SqlValue, ty: &Type) -> BoxedError {
    format!("cannot send {} value as {}", value.kind(), ty.name()).into()
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Space- or `T`-separated timestamps, with optional fraction; a bare date is midnight.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_timestamptz(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.and_utc()))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_datetime(text).map(|dt| dt.time()))
}

// Positional binding sends integers and strings; the server's declared
// parameter type decides the wire encoding. Anything that cannot be encoded in
// that type's binary format is refused before it reaches the server.
impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxedError> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                _ if is_text(ty) => i.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                _ if is_text(ty) => f.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    SqlValue::Int(i64::from(*b)).to_sql(ty, out)
                }
                _ if is_text(ty) => b.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Text(s) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    SqlValue::Int(s.trim().parse::<i64>()?).to_sql(ty, out)
                }
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (s.trim().parse::<f64>()? as f32).to_sql(ty, out),
                Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
                Type::BOOL => parse_bool(s)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                Type::TIMESTAMP => parse_datetime(s)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                Type::TIMESTAMPTZ => parse_timestamptz(s)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                Type::DATE => parse_date(s)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                Type::TIME => parse_time(s)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                Type::BYTEA => s.as_bytes().to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                _ if is_text(ty) => s.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Blob(bytes) => match *ty {
                Type::BYTEA => bytes.to_sql(ty, out),
                _ if is_text(ty) => String::from_utf8(bytes.clone())
                    .map_err(|_| mismatch(self, ty))?
                    .to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            SqlValue::Timestamp(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                Type::TIME => dt.time().to_sql(ty, out),
                _ if is_text(ty) => dt.format(DATE_FORMAT).to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_text(ty)
            || matches!(
                *ty,
                Type::INT2
                    | Type::INT4
                    | Type::INT8
                    | Type::FLOAT4
                    | Type::FLOAT8
                    | Type::BOOL
                    | Type::TIMESTAMP
                    | Type::TIMESTAMPTZ
                    | Type::DATE
                    | Type::TIME
                    | Type::JSON
                    | Type::JSONB
                    | Type::BYTEA
            )
    }

    to_sql_checked!();
}
