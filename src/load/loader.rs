//! Load stage: latest Parquet star tables into the warehouse

use super::warehouse::{create_table_if_absent, insert_rows};
use crate::config::LoadConfig;
use crate::db::{Connection, Connector};
use crate::error::EtlError;
use crate::etl::{Extractor, IdentityTransformer, Loader, Pipeline};
use crate::schema::StarTable;
use crate::snapshot::Snapshot;
use crate::storage::{EmptyBucketPolicy, ObjectKey, ObjectStore, from_parquet, latest_objects};
use eyre::{Context, Result};

/// Reads the latest Parquet file of every star table in the processed bucket
///
/// Yields the tables in [`StarTable::LOAD_ORDER`]. All seven must be present;
/// otherwise nothing is yielded and the missing tables are reported.
pub struct StarTablesExtractor<S> {
    store: S,
    bucket: String,
    policy: EmptyBucketPolicy,
}

impl<S: ObjectStore> StarTablesExtractor<S> {
    pub fn new(store: S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            policy: EmptyBucketPolicy::default(),
        }
    }

    pub fn with_empty_bucket_policy(mut self, policy: EmptyBucketPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn read_table(&self, table: StarTable, key: &str) -> Result<Snapshot> {
        let body = self
            .store
            .get(&self.bucket, key)
            .await
            .with_context(|| format!("Failed to read {} from bucket {}", key, self.bucket))?
            .ok_or_else(|| eyre::eyre!("Object {} vanished from bucket {}", key, self.bucket))?;

        from_parquet(body).with_context(|| format!("Failed to decode {} from {}", table, key))
    }
}

impl<S: ObjectStore> Extractor for StarTablesExtractor<S> {
    type Item = (StarTable, Snapshot);

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let latest = latest_objects(&self.store, &self.bucket, self.policy).await?;
        if latest.is_empty() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::with_capacity(StarTable::LOAD_ORDER.len());
        let mut missing = Vec::new();
        for table in StarTable::LOAD_ORDER {
            match latest.get(table.as_str()) {
                Some(key) if ObjectKey::parse(key).is_some_and(|k| k.extension == "parquet") => {
                    keys.push((table, key.clone()));
                }
                _ => missing.push(table.to_string()),
            }
        }

        if !missing.is_empty() {
            log::error!(
                "Bucket {} is missing star tables: {}",
                self.bucket,
                missing.join(", ")
            );
            return Err(EtlError::MissingSnapshots { tables: missing }.into());
        }

        let mut tables = Vec::with_capacity(keys.len());
        for (table, key) in keys {
            let snapshot = self
                .read_table(table, &key)
                .await
                .inspect_err(|e| log::error!("{:#}", e))?;
            log::debug!("Read {} row(s) of {} from {}", snapshot.len(), table, key);
            tables.push((table, snapshot));
        }
        Ok(tables)
    }
}

/// Writes star tables to the warehouse over one connection
///
/// Tables are written dimensions first so the fact table's references exist.
/// The connection is closed whether or not the load succeeds.
pub struct WarehouseLoader<C> {
    connector: C,
}

impl<C: Connector> WarehouseLoader<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    async fn load_with(
        &self,
        connection: &C::Connection,
        mut items: Vec<(StarTable, Snapshot)>,
    ) -> Result<usize> {
        items.sort_by_key(|(table, _)| {
            StarTable::LOAD_ORDER
                .iter()
                .position(|t| t == table)
                .unwrap_or(usize::MAX)
        });

        for (table, snapshot) in &items {
            create_table_if_absent(connection, table.as_str(), table.column_defs()).await?;
            insert_rows(connection, *table, snapshot).await?;
        }
        Ok(items.len())
    }
}

impl<C: Connector> Loader for WarehouseLoader<C> {
    type Item = (StarTable, Snapshot);

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        let connection = self
            .connector
            .connect()
            .await
            .context("Failed to connect to the warehouse")
            .inspect_err(|e| log::error!("{:#}", e))?;

        let result = self.load_with(&connection, items).await;

        if let Err(e) = connection.close().await {
            log::warn!("Failed to close warehouse connection: {:#}", e);
        }

        let count = result.context("Failed to load the warehouse")?;
        log::info!("Loaded {} table(s) into the warehouse", count);
        Ok(count)
    }
}

/// The load stage wired from its configuration
pub fn load_pipeline<S: ObjectStore, C: Connector>(
    store: S,
    connector: C,
    config: &LoadConfig,
) -> Pipeline<StarTablesExtractor<S>, IdentityTransformer<(StarTable, Snapshot)>, WarehouseLoader<C>>
{
    Pipeline::new(
        StarTablesExtractor::new(store, &config.processed_bucket)
            .with_empty_bucket_policy(config.empty_bucket_policy),
        IdentityTransformer::new(),
        WarehouseLoader::new(connector),
    )
    .with_name("load")
}
