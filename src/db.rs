//! Relational database seam
//!
//! Ingest reads from a source database and load writes to the warehouse, both
//! through these traits. The Postgres implementation lives in
//! [`crate::client::postgres`]; tests use in-memory fakes.

use crate::snapshot::Snapshot;
use chrono::NaiveDateTime;
use eyre::Result;
use std::future::Future;

/// A value bound to a `$n` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(Option<String>),
    Int(i64),
    Timestamp(NaiveDateTime),
}

impl From<&crate::snapshot::Value> for SqlParam {
    fn from(value: &crate::snapshot::Value) -> Self {
        SqlParam::Text(value.to_sql_text())
    }
}

/// An open session
///
/// Transactions are driven with plain `BEGIN`/`COMMIT`/`ROLLBACK` through
/// [`Connection::batch_execute`].
pub trait Connection: Send + Sync {
    /// Run a query and collect the full result
    fn query(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Run a statement, returning the number of affected rows
    fn execute(&self, sql: &str, params: &[SqlParam]) -> impl Future<Output = Result<u64>> + Send;

    /// Run one or more statements without parameters
    fn batch_execute(&self, sql: &str) -> impl Future<Output = Result<()>> + Send;

    /// Release the session
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens connections to one database
pub trait Connector: Send + Sync {
    type Connection: Connection;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}
