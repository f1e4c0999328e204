//! Transform stage: ingested CSV snapshots in, Parquet star tables out

use super::dim_date::DateRange;
use super::star_schema::build_star_schema;
use crate::config::TransformConfig;
use crate::etl::{Extractor, Loader, Pipeline, Transformer};
use crate::schema::{SourceTable, StarTable};
use crate::snapshot::Snapshot;
use crate::storage::{
    EmptyBucketPolicy, ObjectKey, ObjectStore, from_delimited_text, latest_objects, object_key,
    to_parquet,
};
use chrono::Utc;
use eyre::{Context, Result};
use std::collections::BTreeMap;

/// One batch of operational snapshots, keyed by source table
pub type SourceBatch = BTreeMap<SourceTable, Snapshot>;

/// One complete star schema, keyed by warehouse table
pub type StarBatch = BTreeMap<StarTable, Snapshot>;

/// Reads the latest CSV snapshot of every source table in the ingest bucket
///
/// Yields a single [`SourceBatch`], or nothing when the bucket is empty and
/// the policy allows it. Keys that are not CSV snapshots of a known table are
/// skipped with a warning.
pub struct IngestedSnapshotsExtractor<S> {
    store: S,
    bucket: String,
    policy: EmptyBucketPolicy,
}

impl<S: ObjectStore> IngestedSnapshotsExtractor<S> {
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

    async fn read_snapshot(&self, key: &str) -> Result<Snapshot> {
        let body = self
            .store
            .get(&self.bucket, key)
            .await
            .with_context(|| format!("Failed to read {} from bucket {}", key, self.bucket))?
            .ok_or_else(|| eyre::eyre!("Object {} vanished from bucket {}", key, self.bucket))?;

        from_delimited_text(&body).with_context(|| format!("Failed to parse CSV object {}", key))
    }
}

impl<S: ObjectStore> Extractor for IngestedSnapshotsExtractor<S> {
    type Item = SourceBatch;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let latest = latest_objects(&self.store, &self.bucket, self.policy).await?;
        if latest.is_empty() {
            return Ok(Vec::new());
        }

        let mut batch = SourceBatch::new();
        for (table, key) in latest {
            let Ok(source) = table.parse::<SourceTable>() else {
                log::warn!("Skipping {}: {} is not a source table", key, table);
                continue;
            };
            if ObjectKey::parse(&key).is_none_or(|parsed| parsed.extension != "csv") {
                log::warn!("Skipping {}: not a CSV snapshot", key);
                continue;
            }

            let snapshot = self
                .read_snapshot(&key)
                .await
                .inspect_err(|e| log::error!("{:#}", e))?;
            log::debug!("Read {} row(s) of {} from {}", snapshot.len(), source, key);
            batch.insert(source, snapshot);
        }

        log::info!(
            "Read latest snapshots of {} table(s) from bucket {}",
            batch.len(),
            self.bucket
        );
        Ok(vec![batch])
    }
}

/// Applies every star-schema rule to a [`SourceBatch`]
#[derive(Debug, Clone, Default)]
pub struct StarSchemaTransformer {
    dim_dates: DateRange,
}

impl StarSchemaTransformer {
    pub fn new(dim_dates: DateRange) -> Self {
        Self { dim_dates }
    }
}

impl Transformer for StarSchemaTransformer {
    type Input = SourceBatch;
    type Output = StarBatch;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        build_star_schema(&input, &self.dim_dates)
    }
}

/// Writes each star table as one Parquet object in the processed bucket
///
/// All tables of a run share one timestamp, so their keys sort together.
/// Returns the number of files written.
pub struct ParquetUploader<S> {
    store: S,
    bucket: String,
}

impl<S: ObjectStore> ParquetUploader<S> {
    pub fn new(store: S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    async fn upload(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let body = to_parquet(snapshot)?;
        self.store
            .put(&self.bucket, key, body)
            .await
            .with_context(|| format!("Failed to upload {} to bucket {}", key, self.bucket))
    }
}

impl<S: ObjectStore> Loader for ParquetUploader<S> {
    type Item = StarBatch;

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        let written_at = Utc::now().naive_utc();
        let mut count = 0;

        for batch in &items {
            for (table, snapshot) in batch {
                let key = object_key(table.as_str(), written_at, "parquet");
                self.upload(&key, snapshot)
                    .await
                    .with_context(|| format!("Failed to write {}", table))
                    .inspect_err(|e| log::error!("{:#}", e))?;
                log::debug!("Wrote {} row(s) of {} to {}", snapshot.len(), table, key);
                count += 1;
            }
        }

        log::info!("Wrote {} Parquet file(s) to bucket {}", count, self.bucket);
        Ok(count)
    }
}

/// The transform stage wired from its configuration
pub fn transform_pipeline<S: ObjectStore + Clone>(
    store: S,
    config: &TransformConfig,
) -> Pipeline<IngestedSnapshotsExtractor<S>, StarSchemaTransformer, ParquetUploader<S>> {
    Pipeline::new(
        IngestedSnapshotsExtractor::new(store.clone(), &config.ingest_bucket)
            .with_empty_bucket_policy(config.empty_bucket_policy),
        StarSchemaTransformer::new(config.dim_dates),
        ParquetUploader::new(store, &config.processed_bucket),
    )
    .with_name("transform")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, from_parquet, to_delimited_text};
    use chrono::{TimeZone, Utc};

    fn csv(columns: &[&str], rows: Vec<Vec<crate::snapshot::Value>>) -> Vec<u8> {
        to_delimited_text(&Snapshot::from_rows(columns.iter().copied(), rows).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_extractor_reads_latest_csv_only() {
        let store = MemoryStore::new();
        let old = Utc.with_ymd_and_hms(2024, 11, 20, 12, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 11, 20, 12, 5, 0).unwrap();
        store.insert(
            "ingested",
            "staff/2024/11/20/2024-11-20 12:00:00.csv",
            csv(&["staff_id"], vec![vec![1.into()]]),
            old,
        );
        store.insert(
            "ingested",
            "staff/2024/11/20/2024-11-20 12:05:00.csv",
            csv(&["staff_id"], vec![vec![1.into()], vec![2.into()]]),
            new,
        );
        store.insert("ingested", "notes/readme.txt", b"hello".to_vec(), new);
        store.insert(
            "ingested",
            "design/2024/11/20/2024-11-20 12:05:00.json",
            b"{}".to_vec(),
            new,
        );

        let extractor = IngestedSnapshotsExtractor::new(store, "ingested");
        let batches = extractor.extract().await.unwrap();

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][&SourceTable::Staff].len(), 2);
    }

    #[tokio::test]
    async fn test_empty_bucket_policy() {
        let extractor = IngestedSnapshotsExtractor::new(MemoryStore::new(), "ingested");
        assert!(extractor.extract().await.is_err());

        let extractor = IngestedSnapshotsExtractor::new(MemoryStore::new(), "ingested")
            .with_empty_bucket_policy(EmptyBucketPolicy::Empty);
        assert!(extractor.extract().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uploader_shares_one_timestamp() {
        let store = MemoryStore::new();
        let uploader = ParquetUploader::new(store.clone(), "processed");

        let mut batch = StarBatch::new();
        batch.insert(
            StarTable::DimDesign,
            Snapshot::from_rows(
                StarTable::DimDesign.columns(),
                vec![vec![1.into(), "Wooden".into(), "/usr".into(), "wooden.json".into()]],
            )
            .unwrap(),
        );
        batch.insert(
            StarTable::DimCurrency,
            Snapshot::new(StarTable::DimCurrency.columns()),
        );

        assert_eq!(uploader.load(vec![batch]).await.unwrap(), 2);

        let keys = store.keys("processed");
        assert_eq!(keys.len(), 2);
        let stamps: Vec<_> = keys
            .iter()
            .map(|k| ObjectKey::parse(k).unwrap().written_at)
            .collect();
        assert_eq!(stamps[0], stamps[1]);

        let design_key = keys.iter().find(|k| k.starts_with("dim_design/")).unwrap();
        let body = store.get("processed", design_key).await.unwrap().unwrap();
        let design = from_parquet(body).unwrap();
        assert_eq!(design.rows()[0][1], crate::snapshot::Value::from("Wooden"));
    }
}
