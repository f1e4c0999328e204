//! Delimited text encoding for extracted snapshots
//!
//! Header row first, no index column, `\n` line endings. NULL is written as an
//! empty field and empty fields read back as NULL. A column is only given a
//! numeric type when every field re-encodes to the exact same text.

use crate::snapshot::{DATE_FORMAT, Snapshot, TIME_FORMAT, Value, parse_timestamp};
use chrono::{NaiveDate, NaiveTime};
use eyre::{Context, Result};

/// Serialize a snapshot as UTF-8 CSV
pub fn to_delimited_text(snapshot: &Snapshot) -> Result<Vec<u8>> {
    if snapshot.columns().is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(snapshot.columns())
        .context("Failed to write CSV header")?;

    for row in snapshot.rows() {
        writer
            .write_record(row.iter().map(|value| value.to_string()))
            .context("Failed to write CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| eyre::eyre!("Failed to flush CSV writer: {}", e.error()))
}

/// Parse CSV written by [`to_delimited_text`], inferring one type per column
pub fn from_delimited_text(bytes: &[u8]) -> Result<Snapshot> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut raw: Vec<Vec<String>> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
        raw.push(record.iter().map(str::to_string).collect());
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|i| ColumnKind::infer(raw.iter().map(|row| row[i].as_str())))
        .collect();

    let rows = raw
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&kinds)
                .map(|(field, kind)| kind.parse(field))
                .collect()
        })
        .collect();

    Snapshot::from_rows(columns, rows)
}

/// Inferred column type, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Decimal,
    Bool,
    Timestamp,
    Date,
    Time,
    Text,
}

impl ColumnKind {
    const CANDIDATES: [ColumnKind; 7] = [
        ColumnKind::Int,
        ColumnKind::Float,
        ColumnKind::Decimal,
        ColumnKind::Bool,
        ColumnKind::Timestamp,
        ColumnKind::Date,
        ColumnKind::Time,
    ];

    fn infer<'a>(fields: impl Iterator<Item = &'a str> + Clone) -> ColumnKind {
        Self::CANDIDATES
            .into_iter()
            .find(|kind| {
                fields
                    .clone()
                    .filter(|f| !f.is_empty())
                    .all(|f| kind.accepts(f))
            })
            .unwrap_or(ColumnKind::Text)
    }

    fn accepts(&self, field: &str) -> bool {
        match self {
            ColumnKind::Int => is_plain_integer(field) && field.parse::<i64>().is_ok(),
            ColumnKind::Float => field
                .parse::<f64>()
                .is_ok_and(|v| Value::Float(v).to_string() == field),
            ColumnKind::Decimal => is_plain_decimal(field),
            ColumnKind::Bool => field == "true" || field == "false",
            ColumnKind::Timestamp => parse_timestamp(field).is_some(),
            ColumnKind::Date => NaiveDate::parse_from_str(field, DATE_FORMAT).is_ok(),
            ColumnKind::Time => NaiveTime::parse_from_str(field, TIME_FORMAT).is_ok(),
            ColumnKind::Text => true,
        }
    }

    fn parse(&self, field: String) -> Value {
        if field.is_empty() {
            return Value::Null;
        }
        let parsed = match self {
            ColumnKind::Int => field.parse().ok().map(Value::Int),
            ColumnKind::Float => field.parse().ok().map(Value::Float),
            ColumnKind::Decimal => return Value::Decimal(field),
            ColumnKind::Bool => Some(Value::Bool(field == "true")),
            ColumnKind::Timestamp => parse_timestamp(&field).map(Value::Timestamp),
            ColumnKind::Date => NaiveDate::parse_from_str(&field, DATE_FORMAT)
                .ok()
                .map(Value::Date),
            ColumnKind::Time => NaiveTime::parse_from_str(&field, TIME_FORMAT)
                .ok()
                .map(Value::Time),
            ColumnKind::Text => None,
        };
        parsed.unwrap_or(Value::Text(field))
    }
}

/// Digits with an optional sign and no leading zeros, so codes like `007` stay text
fn is_plain_integer(field: &str) -> bool {
    let digits = field.strip_prefix('-').unwrap_or(field);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

/// An `i64` integer or fixed-point notation such as `4.00`; no exponent
fn is_plain_decimal(field: &str) -> bool {
    match field.split_once('.') {
        None => is_plain_integer(field) && field.parse::<i64>().is_ok(),
        Some((whole, fraction)) => {
            is_plain_integer(whole)
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit())
        }
    }
}
