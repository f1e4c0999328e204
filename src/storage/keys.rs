//! Object key layout shared by every bucket
//!
//! Data objects live at `{table}/{YYYY}/{MM}/{DD}/{YYYY-MM-DD HH:MM:SS}.{ext}`,
//! so the table is always the first path segment. Watermarks live at
//! `time_stamp_{table}.txt` in their own bucket.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

/// Second-precision timestamp used in keys and watermark bodies
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static OBJECT_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<table>[^/]+)/\d{4}/\d{2}/\d{2}/(?P<ts>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\.(?P<ext>[A-Za-z0-9]+)$",
    )
    .ok()
});

/// Key for a table's data written at `at`
pub fn object_key(table: &str, at: NaiveDateTime, extension: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        table,
        at.format("%Y/%m/%d"),
        at.format(KEY_TIMESTAMP_FORMAT),
        extension
    )
}

/// Key holding a table's watermark
pub fn watermark_key(table: &str) -> String {
    format!("time_stamp_{}.txt", table)
}

/// Logical table a data key belongs to
pub fn table_of_key(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}

/// The parts of a well-formed data key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub table: String,
    pub written_at: NaiveDateTime,
    pub extension: String,
}

impl ObjectKey {
    /// Parse a key written by [`object_key`]; other layouts return `None`
    pub fn parse(key: &str) -> Option<Self> {
        let caps = OBJECT_KEY.as_ref()?.captures(key)?;
        let written_at = NaiveDateTime::parse_from_str(&caps["ts"], KEY_TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            table: caps["table"].to_string(),
            written_at,
            extension: caps["ext"].to_string(),
        })
    }
}
