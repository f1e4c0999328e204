//! CLI handler functions
//!
//! One handler per stage. Each loads and validates its configuration from the
//! environment, builds the real S3 and Postgres collaborators, runs the stage
//! and reports a [`HandlerResponse`]. The `*_with` variants take the
//! collaborators explicitly and are what the handlers delegate to.

use crate::{
    client::{PgConnector, S3Store},
    config::{IngestConfig, LoadConfig, TransformConfig, warehouse_db_from_env},
    db::{Connection, Connector},
    ingest::Ingestor,
    load::{load_pipeline, reset_warehouse},
    schema::SourceTable,
    storage::ObjectStore,
    transform::transform_pipeline,
};
use eyre::{Context, Result};
use serde::Serialize;

pub const STATUS_OK: u16 = 200;
pub const STATUS_ERROR: u16 = 500;

/// Outcome of one handler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_OK,
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_ERROR,
            body: body.into(),
        }
    }

    fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(body) => Self::ok(body),
            Err(e) => Self::error(format!("{:#}", e)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

/// Parse `--table` arguments; no names means every source table
pub fn parse_tables(names: &[String]) -> Result<Vec<SourceTable>> {
    if names.is_empty() {
        return Ok(SourceTable::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| name.parse::<SourceTable>().map_err(eyre::Report::from))
        .collect()
}

/// Ingest the given tables with explicit collaborators
pub async fn ingest_with<S, C>(
    store: S,
    connector: C,
    config: &IngestConfig,
    tables: &[SourceTable],
) -> HandlerResponse
where
    S: ObjectStore + Clone,
    C: Connector,
{
    let ingestor = Ingestor::new(
        connector,
        store,
        &config.ingest_bucket,
        &config.timestamp_bucket,
    );
    let report = ingestor.ingest_all(tables).await;
    let success = report.is_success();

    let body = match serde_json::to_string(&report) {
        Ok(body) => body,
        Err(e) => return HandlerResponse::error(format!("Failed to encode ingest report: {}", e)),
    };

    match success {
        true => HandlerResponse::ok(body),
        false => HandlerResponse::error(body),
    }
}

/// Ingest handler: every table, or those named
pub async fn ingest(table_names: &[String]) -> HandlerResponse {
    let setup = parse_tables(table_names)
        .and_then(|tables| Ok((tables, IngestConfig::from_env()?)));
    let (tables, config) = match setup {
        Ok(setup) => setup,
        Err(e) => return HandlerResponse::error(format!("{:#}", e)),
    };

    let store = S3Store::from_region(&config.region).await;
    let connector = PgConnector::new(config.source_db.clone());
    ingest_with(store, connector, &config, &tables).await
}

/// Run the transform stage with an explicit store
pub async fn transform_with<S>(store: S, config: &TransformConfig) -> HandlerResponse
where
    S: ObjectStore + Clone,
{
    let result = transform_pipeline(store, config)
        .run()
        .await
        .map(|count| format!("Transformed {} star-schema table(s)", count));
    HandlerResponse::from_result(result)
}

/// Transform handler
pub async fn transform() -> HandlerResponse {
    let config = match TransformConfig::from_env() {
        Ok(config) => config,
        Err(e) => return HandlerResponse::error(format!("{:#}", e)),
    };
    let store = S3Store::from_region(&config.region).await;
    transform_with(store, &config).await
}

/// Run the load stage with explicit collaborators
pub async fn load_with<S, C>(store: S, connector: C, config: &LoadConfig) -> HandlerResponse
where
    S: ObjectStore,
    C: Connector,
{
    let result = load_pipeline(store, connector, config)
        .run()
        .await
        .map(|count| format!("Loaded {} table(s) into the warehouse", count));
    HandlerResponse::from_result(result)
}

/// Load handler
pub async fn load() -> HandlerResponse {
    let config = match LoadConfig::from_env() {
        Ok(config) => config,
        Err(e) => return HandlerResponse::error(format!("{:#}", e)),
    };
    let store = S3Store::from_region(&config.region).await;
    let connector = PgConnector::new(config.warehouse_db.clone());
    load_with(store, connector, &config).await
}

/// Clear the warehouse with an explicit connector
pub async fn reset_with<C: Connector>(connector: C) -> HandlerResponse {
    let result = async {
        let connection = connector
            .connect()
            .await
            .context("Failed to connect to the warehouse")?;
        let result = reset_warehouse(&connection).await;
        if let Err(e) = connection.close().await {
            log::warn!("Failed to close warehouse connection: {:#}", e);
        }
        result.map(|deleted| format!("Deleted {} row(s) from the warehouse", deleted))
    }
    .await;
    HandlerResponse::from_result(result)
}

/// Reset handler
pub async fn reset() -> HandlerResponse {
    match warehouse_db_from_env() {
        Ok(db) => reset_with(PgConnector::new(db)).await,
        Err(e) => HandlerResponse::error(format!("{:#}", e)),
    }
}

/// Ingest, transform and load in turn, stopping at the first failure
pub async fn run(table_names: &[String]) -> HandlerResponse {
    let ingested = ingest(table_names).await;
    if !ingested.is_success() {
        return ingested;
    }
    let transformed = transform().await;
    if !transformed.is_success() {
        return transformed;
    }
    load().await
}
