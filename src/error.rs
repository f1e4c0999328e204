//! Typed failures carried inside `eyre::Report`
//!
//! Stage functions return `eyre::Result` and attach context as errors bubble
//! up. When a caller needs to tell failure classes apart (a handler choosing a
//! status code, a test asserting on the cause), the root cause is one of the
//! [`EtlError`] variants and can be recovered with [`find_etl_error`].

use eyre::Report;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EtlError {
    #[error("Missing required configuration variable {key}")]
    MissingConfig { key: String },

    #[error("Invalid value '{value}' for configuration variable {key}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("Bucket '{bucket}' is empty")]
    EmptySource { bucket: String },

    #[error("Missing required snapshots: {}", .tables.join(", "))]
    MissingSnapshots { tables: Vec<String> },

    #[error("Column '{column}' not found")]
    MissingColumn { column: String },

    #[error("Column '{column}' is not part of table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid value '{value}' in column '{column}': expected {expected}")]
    InvalidValue {
        column: String,
        value: String,
        expected: String,
    },

    #[error("Column '{column}' has unsupported type {type_name}")]
    UnsupportedType { column: String, type_name: String },
}

/// Find the first [`EtlError`] in the report's cause chain.
pub fn find_etl_error(report: &Report) -> Option<&EtlError> {
    report
        .chain()
        .find_map(|cause| cause.downcast_ref::<EtlError>())
}
