//! Incremental extraction from the operational database

mod fetch;
mod ingestor;

pub use fetch::{fetch_query, fetch_rows};
pub use ingestor::{FailedTable, IngestReport, Ingestor, TableReport};
