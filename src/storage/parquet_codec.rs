//! Parquet encoding for star-schema tables
//!
//! Each snapshot column becomes one nullable Arrow field whose type is taken
//! from the values it holds. Integers mixed with floats widen to Float64;
//! columns that are entirely NULL or mix unrelated kinds are written as text.

use crate::error::EtlError;
use crate::snapshot::{Snapshot, Value};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray, Time64MicrosecondArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Timelike};
use eyre::{Context, Result, eyre};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;
use std::io::Cursor;
use std::sync::Arc;

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_created_by(format!("warehouse-etl version {}", env!("CARGO_PKG_VERSION")))
        .build()
}

fn epoch() -> NaiveDate {
    DateTime::UNIX_EPOCH.date_naive()
}

/// Arrow type for a column, decided from its non-null values
fn column_type(values: &[&Value]) -> DataType {
    let mut kind: Option<DataType> = None;

    for value in values.iter().filter(|v| !v.is_null()) {
        let next = match value {
            Value::Int(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Bool(_) => DataType::Boolean,
            Value::Date(_) => DataType::Date32,
            Value::Time(_) => DataType::Time64(TimeUnit::Microsecond),
            Value::Timestamp(_) => DataType::Timestamp(TimeUnit::Microsecond, None),
            _ => return DataType::Utf8,
        };
        kind = match kind {
            None => Some(next),
            Some(current) if current == next => Some(current),
            Some(DataType::Int64) if next == DataType::Float64 => Some(DataType::Float64),
            Some(DataType::Float64) if next == DataType::Int64 => Some(DataType::Float64),
            Some(_) => return DataType::Utf8,
        };
    }

    kind.unwrap_or(DataType::Utf8)
}

fn build_array(data_type: &DataType, values: &[&Value]) -> ArrayRef {
    match data_type {
        DataType::Int64 => Arc::new(Int64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Float(f) => Some(*f),
                    Value::Int(i) => Some(*i as f64),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Boolean => Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Date32 => Arc::new(Date32Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some(d.signed_duration_since(epoch()).num_days() as i32),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Time64(_) => Arc::new(Time64MicrosecondArray::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Time(t) => Some(
                        t.num_seconds_from_midnight() as i64 * 1_000_000
                            + (t.nanosecond() / 1_000) as i64,
                    ),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Timestamp(_, _) => Arc::new(TimestampMicrosecondArray::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Timestamp(ts) => Some(ts.and_utc().timestamp_micros()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            values.iter().map(|v| v.to_sql_text()).collect::<Vec<_>>(),
        )),
    }
}

/// Encode a snapshot as a single-row-group Parquet file
pub fn to_parquet(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut fields = Vec::with_capacity(snapshot.columns().len());
    let mut arrays = Vec::with_capacity(snapshot.columns().len());

    for (idx, name) in snapshot.columns().iter().enumerate() {
        let values: Vec<&Value> = snapshot.rows().iter().map(|row| &row[idx]).collect();
        let data_type = column_type(&values);
        arrays.push(build_array(&data_type, &values));
        fields.push(Field::new(name, data_type, true));
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(snapshot.len()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)
        .context("Failed to build record batch")?;

    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(writer_properties()))
        .context("Failed to initialise Parquet writer")?;
    writer.write(&batch).context("Failed to write Parquet batch")?;
    writer.close().context("Failed to finish Parquet file")?;

    Ok(cursor.into_inner())
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| eyre!("Column '{}' has an unexpected array type", column))
}

fn read_column(array: &ArrayRef, column: &str) -> Result<Vec<Value>> {
    let len = array.len();
    let mut out = Vec::with_capacity(len);

    macro_rules! collect {
        ($ty:ty, |$arr:ident, $i:ident| $convert:expr) => {{
            let $arr = downcast::<$ty>(array, column)?;
            for $i in 0..len {
                out.push(if $arr.is_null($i) {
                    Value::Null
                } else {
                    $convert
                });
            }
        }};
    }

    match array.data_type() {
        DataType::Int64 => collect!(Int64Array, |a, i| Value::Int(a.value(i))),
        DataType::Int32 => collect!(Int32Array, |a, i| Value::Int(a.value(i) as i64)),
        DataType::Float64 => collect!(Float64Array, |a, i| Value::Float(a.value(i))),
        DataType::Float32 => collect!(Float32Array, |a, i| Value::Float(a.value(i) as f64)),
        DataType::Boolean => collect!(BooleanArray, |a, i| Value::Bool(a.value(i))),
        DataType::Utf8 => collect!(StringArray, |a, i| Value::Text(a.value(i).to_string())),
        DataType::Date32 => collect!(Date32Array, |a, i| a
            .value_as_date(i)
            .map(Value::Date)
            .unwrap_or(Value::Null)),
        DataType::Time64(TimeUnit::Microsecond) => {
            collect!(Time64MicrosecondArray, |a, i| a
                .value_as_time(i)
                .map(Value::Time)
                .unwrap_or(Value::Null))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            collect!(TimestampMicrosecondArray, |a, i| a
                .value_as_datetime(i)
                .map(Value::Timestamp)
                .unwrap_or(Value::Null))
        }
        other => {
            return Err(EtlError::UnsupportedType {
                column: column.to_string(),
                type_name: other.to_string(),
            }
            .into());
        }
    }

    Ok(out)
}

/// Decode a Parquet file written by [`to_parquet`]
pub fn from_parquet(bytes: Vec<u8>) -> Result<Snapshot> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))
        .context("Failed to open Parquet file")?;

    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let reader = builder.build().context("Failed to build Parquet reader")?;
    let mut snapshot = Snapshot::new(columns.clone());

    for batch in reader {
        let batch = batch.context("Failed to read Parquet batch")?;
        let decoded = batch
            .columns()
            .iter()
            .zip(&columns)
            .map(|(array, name)| read_column(array, name))
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            snapshot.push_row(decoded.iter().map(|col| col[row].clone()).collect())?;
        }
    }

    Ok(snapshot)
}
