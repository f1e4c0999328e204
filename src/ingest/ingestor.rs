//! Ingest stage: operational tables to timestamped CSV snapshots

use super::fetch::fetch_rows;
use crate::db::{Connection, Connector};
use crate::schema::SourceTable;
use crate::storage::{ObjectStore, Watermark, WatermarkStore, object_key, to_delimited_text};
use eyre::{Context, Result};
use serde::Serialize;

/// Outcome of one successful table extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub rows: usize,
    pub key: String,
    pub watermark: String,
}

/// Per-table outcomes of an ingest run
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub ingested: Vec<TableReport>,
    pub failed: Vec<FailedTable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTable {
    pub table: String,
    pub error: String,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Extracts changed rows from the source database into the ingest bucket
///
/// Each table gets its own connection, released whatever the outcome, and
/// its watermark only moves once the snapshot object is stored.
pub struct Ingestor<S, C> {
    connector: C,
    store: S,
    bucket: String,
    watermarks: WatermarkStore<S>,
}

impl<S, C> Ingestor<S, C>
where
    S: ObjectStore + Clone,
    C: Connector,
{
    /// # Arguments
    /// * `connector` - opens sessions to the source database
    /// * `store` - object store holding both buckets
    /// * `bucket` - bucket receiving CSV snapshots
    /// * `timestamp_bucket` - bucket holding watermarks
    pub fn new(
        connector: C,
        store: S,
        bucket: impl Into<String>,
        timestamp_bucket: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            watermarks: WatermarkStore::new(store.clone(), timestamp_bucket),
            store,
            bucket: bucket.into(),
        }
    }

    pub fn watermarks(&self) -> &WatermarkStore<S> {
        &self.watermarks
    }

    /// Extract one table, store its snapshot and advance its watermark
    ///
    /// # Errors
    /// Unknown table names fail before connecting. Any later failure is
    /// logged with the table name and returned after the connection has been
    /// released; the watermark is left where it was.
    pub async fn extract_table(&self, table_name: &str) -> Result<TableReport> {
        let table = table_name
            .parse::<SourceTable>()
            .inspect_err(|e| log::error!("{}", e))?;
        let started_at = Watermark::now();

        let connection = self
            .connector
            .connect()
            .await
            .with_context(|| format!("Failed to connect to the source database for {}", table))
            .inspect_err(|e| log::error!("{:#}", e))?;

        let result = self.extract_with(&connection, table, started_at).await;

        if let Err(e) = connection.close().await {
            log::warn!("Failed to close connection after {}: {:#}", table, e);
        }

        result
            .with_context(|| format!("Failed to ingest table {}", table))
            .inspect_err(|e| log::error!("{:#}", e))
    }

    async fn extract_with(
        &self,
        connection: &C::Connection,
        table: SourceTable,
        started_at: Watermark,
    ) -> Result<TableReport> {
        let previous = self.watermarks.get_watermark(table.as_str()).await?;
        let snapshot = fetch_rows(connection, table.as_str(), previous.as_ref()).await?;
        let body = to_delimited_text(&snapshot)?;

        let key = object_key(table.as_str(), started_at.as_datetime(), "csv");
        self.store
            .put(&self.bucket, &key, body)
            .await
            .with_context(|| format!("Failed to upload {} to bucket {}", key, self.bucket))?;
        log::info!("Uploaded {} row(s) of {} to {}", snapshot.len(), table, key);

        self.watermarks
            .put_watermark(table.as_str(), started_at)
            .await?;

        Ok(TableReport {
            table: table.to_string(),
            rows: snapshot.len(),
            key,
            watermark: started_at.to_string(),
        })
    }

    /// Extract each table in turn; one table failing does not stop the rest
    pub async fn ingest_all(&self, tables: &[SourceTable]) -> IngestReport {
        let mut report = IngestReport::default();

        for table in tables {
            match self.extract_table(table.as_str()).await {
                Ok(done) => report.ingested.push(done),
                Err(e) => report.failed.push(FailedTable {
                    table: table.to_string(),
                    error: format!("{:#}", e),
                }),
            }
        }

        log::info!(
            "Ingested {} table(s), {} failed",
            report.ingested.len(),
            report.failed.len()
        );
        report
    }
}
