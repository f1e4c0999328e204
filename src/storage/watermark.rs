//! Per-table extraction watermarks

use super::keys::{KEY_TIMESTAMP_FORMAT, watermark_key};
use super::object_store::ObjectStore;
use chrono::{NaiveDateTime, Timelike, Utc};
use eyre::{Context, Result};
use std::fmt;
use std::str::FromStr;

/// Boundary between rows already extracted and rows still to extract
///
/// Stored as `YYYY-MM-DD HH:MM:SS`, second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(NaiveDateTime);

impl Watermark {
    /// Current UTC wall-clock time, truncated to whole seconds
    pub fn now() -> Self {
        Self::from(Utc::now().naive_utc())
    }

    pub fn as_datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for Watermark {
    fn from(at: NaiveDateTime) -> Self {
        Self(at.with_nanosecond(0).unwrap_or(at))
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_TIMESTAMP_FORMAT))
    }
}

impl FromStr for Watermark {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s.trim(), KEY_TIMESTAMP_FORMAT).map(Watermark)
    }
}

/// Watermarks kept as one small object per table in a bucket
pub struct WatermarkStore<S> {
    store: S,
    bucket: String,
}

impl<S: ObjectStore> WatermarkStore<S> {
    pub fn new(store: S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Last stored watermark, or `None` before the table's first extraction
    pub async fn get_watermark(&self, table: &str) -> Result<Option<Watermark>> {
        let key = watermark_key(table);
        let Some(body) = self
            .store
            .get(&self.bucket, &key)
            .await
            .with_context(|| format!("Failed to read watermark {} from {}", key, self.bucket))?
        else {
            log::info!("No watermark for table {}, extracting all rows", table);
            return Ok(None);
        };

        let text = String::from_utf8(body)
            .with_context(|| format!("Watermark {} is not valid UTF-8", key))?;
        let watermark = text
            .parse::<Watermark>()
            .with_context(|| format!("Watermark {} holds an invalid timestamp '{}'", key, text))?;

        log::debug!("Watermark for {} is {}", table, watermark);
        Ok(Some(watermark))
    }

    /// Overwrite the table's watermark
    pub async fn put_watermark(&self, table: &str, watermark: Watermark) -> Result<()> {
        let key = watermark_key(table);
        self.store
            .put(&self.bucket, &key, watermark.to_string().into_bytes())
            .await
            .with_context(|| format!("Failed to write watermark {} to {}", key, self.bucket))?;

        log::info!("Watermark for {} advanced to {}", table, watermark);
        Ok(())
    }
}
