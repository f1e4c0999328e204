//! Typed cell values

use crate::error::EtlError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use eyre::Result;
use std::fmt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A single cell of a [`Snapshot`](super::Snapshot)
///
/// `Decimal` keeps exact numeric text as it came from the database so a
/// `numeric(10,2)` never goes through a lossy float.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages and schema inference
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Text form bound as a SQL parameter; `None` binds NULL
    pub fn to_sql_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Interpret as a timestamp, parsing text if needed
    pub fn to_timestamp(&self, column: &str) -> Result<Option<NaiveDateTime>> {
        match self {
            Value::Null => Ok(None),
            Value::Timestamp(ts) => Ok(Some(*ts)),
            Value::Date(date) => Ok(date.and_hms_opt(0, 0, 0)),
            Value::Text(text) => parse_timestamp(text)
                .map(Some)
                .ok_or_else(|| invalid(column, text, "timestamp")),
            other => Err(invalid(column, &other.to_string(), "timestamp")),
        }
    }

    /// Interpret as a calendar date, truncating timestamps
    pub fn to_date(&self, column: &str) -> Result<Option<NaiveDate>> {
        match self {
            Value::Null => Ok(None),
            Value::Date(date) => Ok(Some(*date)),
            Value::Timestamp(ts) => Ok(Some(ts.date())),
            Value::Text(text) => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .ok()
                .or_else(|| parse_timestamp(text).map(|ts| ts.date()))
                .map(Some)
                .ok_or_else(|| invalid(column, text, "date")),
            other => Err(invalid(column, &other.to_string(), "date")),
        }
    }

    /// Interpret as a float, accepting integers and exact decimals
    pub fn to_f64(&self, column: &str) -> Result<Option<f64>> {
        match self {
            Value::Null => Ok(None),
            Value::Float(v) => Ok(Some(*v)),
            Value::Int(v) => Ok(Some(*v as f64)),
            Value::Decimal(text) | Value::Text(text) => text
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| invalid(column, text, "number")),
            other => Err(invalid(column, &other.to_string(), "number")),
        }
    }

    /// Text used to match rows in a join; NULL never matches
    pub(crate) fn join_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(format!("{}", *v as i64)),
            other => Some(other.to_string()),
        }
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS[.fff]`, also accepting a `T` separator
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

fn invalid(column: &str, value: &str, expected: &str) -> eyre::Report {
    EtlError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            // Debug keeps the ".0" on integral floats so they read back as floats
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Decimal(v) | Value::Text(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{}", v.format(DATE_FORMAT)),
            Value::Time(v) => write!(f, "{}", v.format(TIME_FORMAT)),
            Value::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
