//! Incremental row fetch from the operational database

use crate::db::{Connection, SqlParam};
use crate::schema::SourceTable;
use crate::snapshot::Snapshot;
use crate::storage::Watermark;
use eyre::{Context, Result};
use pg_escape::quote_identifier;

/// Query text and parameters for one table
pub fn fetch_query(table: SourceTable, watermark: Option<&Watermark>) -> (String, Vec<SqlParam>) {
    let select = format!("SELECT * FROM {}", quote_identifier(table.as_str()));
    match watermark {
        None => (select, Vec::new()),
        Some(watermark) => (
            format!("{} WHERE last_updated > $1", select),
            vec![SqlParam::Timestamp(watermark.as_datetime())],
        ),
    }
}

/// Rows of `table_name` changed after `watermark`, or every row without one
///
/// # Errors
/// Fails with [`EtlError::InvalidTableName`](crate::error::EtlError) before any
/// query is sent when the name is not one of the source tables, and with the
/// database error, logged with the table name, when the query fails.
pub async fn fetch_rows<C: Connection>(
    connection: &C,
    table_name: &str,
    watermark: Option<&Watermark>,
) -> Result<Snapshot> {
    let table = table_name
        .parse::<SourceTable>()
        .inspect_err(|e| log::error!("{}", e))?;
    let (sql, params) = fetch_query(table, watermark);

    match watermark {
        Some(w) => log::debug!("Fetching {} rows updated after {}", table, w),
        None => log::debug!("Fetching all {} rows", table),
    }

    let snapshot = connection
        .query(&sql, &params)
        .await
        .with_context(|| format!("Failed to fetch rows from {}", table))
        .inspect_err(|e| log::error!("{:#}", e))?;

    log::info!("Fetched {} row(s) from {}", snapshot.len(), table);
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EtlError, find_etl_error};
    use std::sync::Mutex;

    /// Records every query and answers with a fixed result
    #[derive(Default)]
    struct RecordingConnection {
        queries: Mutex<Vec<(String, Vec<SqlParam>)>>,
        fail: bool,
    }

    impl Connection for RecordingConnection {
        async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Snapshot> {
            self.queries
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            if self.fail {
                eyre::bail!("connection reset by peer");
            }
            Snapshot::from_rows(["staff_id"], vec![vec![1.into()]])
        }

        async fn execute(&self, _sql: &str, _params: &[SqlParam]) -> Result<u64> {
            Ok(0)
        }

        async fn batch_execute(&self, _sql: &str) -> Result<()> {
            Ok(())
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_without_watermark_selects_everything() {
        let connection = RecordingConnection::default();
        let rows = fetch_rows(&connection, "staff", None).await.unwrap();

        assert_eq!(rows.len(), 1);
        let queries = connection.queries.lock().unwrap();
        assert_eq!(
            queries[0],
            (format!("SELECT * FROM {}", quote_identifier("staff")), vec![])
        );
    }

    #[tokio::test]
    async fn test_watermark_is_bound_not_interpolated() {
        let connection = RecordingConnection::default();
        let watermark: Watermark = "2024-11-20 12:05:00".parse().unwrap();

        fetch_rows(&connection, "sales_order", Some(&watermark))
            .await
            .unwrap();

        let queries = connection.queries.lock().unwrap();
        assert_eq!(
            queries[0].0,
            format!(
                "SELECT * FROM {} WHERE last_updated > $1",
                quote_identifier("sales_order")
            )
        );
        assert_eq!(
            queries[0].1,
            vec![SqlParam::Timestamp(watermark.as_datetime())]
        );
    }

    #[tokio::test]
    async fn test_unknown_table_sends_no_query() {
        let connection = RecordingConnection::default();
        let err = fetch_rows(&connection, "staff; DROP TABLE staff", None)
            .await
            .unwrap_err();

        assert!(matches!(
            find_etl_error(&err),
            Some(EtlError::InvalidTableName(_))
        ));
        assert!(connection.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_names_table() {
        let connection = RecordingConnection {
            fail: true,
            ..Default::default()
        };
        let err = fetch_rows(&connection, "payment", None).await.unwrap_err();
        assert!(err.to_string().contains("payment"));
    }
}
