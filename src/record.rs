//! Row to record conversion.
//!
//! A [`Record`] keeps the result's column order. Values are decoded by
//! PostgreSQL type, looking through domains to their base type. `NUMERIC`
//! becomes a JSON number, `BYTEA` its `\x` hex text, and a type without a
//! native decoder its text form when the wire value is printable text (enums,
//! `citext`-like extension types). SQL `NULL`, non-finite floats and values
//! with no usable form become an explicit JSON `null`, so no record ever
//! carries a NaN sentinel.

use std::{error::Error, fmt::Write};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde_json::{Number, Value};
use tokio_postgres::{
    Row,
    types::{FromSql, Kind, Type}
};
use tracing::warn;

/// One observation, column name to value, in column order
pub type Record = IndexMap<String, Value>;

type DecodeError = Box<dyn Error + Sync + Send>;

/// Decoder family for a PostgreSQL column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Bytea,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    Unsupported
}

impl ValueKind {
    pub fn of(ty: &Type) -> Self {
        if let Kind::Enum(_) = ty.kind() {
            return Self::Text;
        }
        match ty {
            t if *t == Type::BOOL => Self::Bool,
            t if *t == Type::INT2 => Self::Int2,
            t if *t == Type::INT4 => Self::Int4,
            t if *t == Type::INT8 => Self::Int8,
            t if *t == Type::FLOAT4 => Self::Float4,
            t if *t == Type::FLOAT8 => Self::Float8,
            t if *t == Type::NUMERIC => Self::Numeric,
            t if *t == Type::TEXT
                || *t == Type::VARCHAR
                || *t == Type::BPCHAR
                || *t == Type::NAME
                || *t == Type::XML
                || *t == Type::UNKNOWN =>
            {
                Self::Text
            }
            t if *t == Type::BYTEA => Self::Bytea,
            t if *t == Type::DATE => Self::Date,
            t if *t == Type::TIME => Self::Time,
            t if *t == Type::TIMESTAMP => Self::Timestamp,
            t if *t == Type::TIMESTAMPTZ => Self::TimestampTz,
            t if *t == Type::JSON || *t == Type::JSONB => Self::Json,
            _ => Self::Unsupported
        }
    }
}

/// Float to JSON, non-finite values become `null`
pub fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// ISO-8601 rendering used for timestamp columns
pub fn timestamp_value(value: NaiveDateTime) -> Value {
    Value::String(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Decode one non-null wire value of type `ty` into JSON
pub fn decode_value(ty: &Type, raw: &[u8]) -> Result<Value, DecodeError> {
    if let Kind::Domain(base) = ty.kind() {
        return decode_value(base, raw);
    }
    let value = match ValueKind::of(ty) {
        ValueKind::Bool => Value::Bool(bool::from_sql(ty, raw)?),
        ValueKind::Int2 => Value::from(i16::from_sql(ty, raw)?),
        ValueKind::Int4 => Value::from(i32::from_sql(ty, raw)?),
        ValueKind::Int8 => Value::from(i64::from_sql(ty, raw)?),
        ValueKind::Float4 => float_value(f64::from(f32::from_sql(ty, raw)?)),
        ValueKind::Float8 => float_value(f64::from_sql(ty, raw)?),
        ValueKind::Numeric => numeric_value(raw)?,
        ValueKind::Text => Value::String(String::from_sql(&Type::TEXT, raw)?),
        ValueKind::Bytea => Value::String(hex_text(raw)),
        ValueKind::Date => {
            Value::String(NaiveDate::from_sql(ty, raw)?.format("%Y-%m-%d").to_string())
        }
        ValueKind::Time => Value::String(NaiveTime::from_sql(ty, raw)?.to_string()),
        ValueKind::Timestamp => timestamp_value(NaiveDateTime::from_sql(ty, raw)?),
        ValueKind::TimestampTz => Value::String(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
        ValueKind::Json => Value::from_sql(ty, raw)?,
        ValueKind::Unsupported => text_form(ty, raw)?
    };
    Ok(value)
}

// NUMERIC NaN has no Decimal form; its wire sign word is 0xC000.
fn numeric_value(raw: &[u8]) -> Result<Value, DecodeError> {
    if raw.get(4..6) == Some(&[0xC0, 0x00]) {
        return Ok(Value::Null);
    }
    let decimal = Decimal::from_sql(&Type::NUMERIC, raw)?;
    Ok(decimal.to_f64().map_or(Value::Null, float_value))
}

fn hex_text(raw: &[u8]) -> String {
    raw.iter().fold(String::from("\\x"), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

fn text_form(ty: &Type, raw: &[u8]) -> Result<Value, DecodeError> {
    match std::str::from_utf8(raw) {
        Ok(text) if !text.chars().any(|c| c.is_control() && !c.is_whitespace()) => {
            Ok(Value::String(text.to_string()))
        }
        _ => Err(format!("no text form for type {}", ty).into())
    }
}

/// Any column value as JSON; accepts every type so decoding never fails on
/// the type check
struct JsonCell(Value);

impl<'a> FromSql<'a> for JsonCell {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        decode_value(ty, raw).map(JsonCell)
    }

    fn from_sql_null(_: &Type) -> Result<Self, DecodeError> {
        Ok(JsonCell(Value::Null))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Convert one row into a record
pub fn row_to_record(row: &Row) -> Record {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = match row.try_get::<_, JsonCell>(idx) {
                Ok(JsonCell(value)) => value,
                Err(e) => {
                    warn!(column = column.name(), ty = %column.type_(), error = %e, "failed to decode column, emitting null");
                    Value::Null
                }
            };
            (column.name().to_string(), value)
        })
        .collect()
}

/// Convert all rows, preserving order
pub fn rows_to_records(rows: &[Row]) -> Vec<Record> {
    rows.iter().map(row_to_record).collect()
}

/// Column names of a result set; empty when there are no rows
pub fn result_columns(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        })
        .unwrap_or_default()
}
