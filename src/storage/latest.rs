//! Pick the most recently written object for each table

use super::keys::table_of_key;
use super::object_store::{ObjectMeta, ObjectStore, list_all};
use crate::error::EtlError;
use eyre::{Context, Result};
use std::collections::BTreeMap;

/// What to do when the bucket being read holds no objects at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyBucketPolicy {
    /// Fail with [`EtlError::EmptySource`]
    #[default]
    Error,
    /// Return an empty selection
    Empty,
}

impl std::str::FromStr for EmptyBucketPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(EmptyBucketPolicy::Error),
            "empty" => Ok(EmptyBucketPolicy::Empty),
            other => Err(format!("expected 'error' or 'empty', got '{}'", other)),
        }
    }
}

/// Latest key per table from a complete listing
///
/// Groups keys by their first path segment and keeps the one with the greatest
/// modification time. Equal times resolve to the lexically greatest key, which
/// for this key layout is also the latest extraction timestamp.
pub fn latest_object_per_table(listing: &[ObjectMeta]) -> BTreeMap<String, String> {
    let mut latest: BTreeMap<String, &ObjectMeta> = BTreeMap::new();

    for object in listing {
        let table = table_of_key(&object.key);
        if table.is_empty() {
            continue;
        }
        match latest.get(table) {
            Some(current)
                if (current.last_modified, current.key.as_str())
                    >= (object.last_modified, object.key.as_str()) => {}
            _ => {
                latest.insert(table.to_string(), object);
            }
        }
    }

    latest
        .into_iter()
        .map(|(table, object)| (table, object.key.clone()))
        .collect()
}

/// Drain the bucket listing, then select the latest key per table
pub async fn latest_objects<S: ObjectStore>(
    store: &S,
    bucket: &str,
    policy: EmptyBucketPolicy,
) -> Result<BTreeMap<String, String>> {
    let listing = list_all(store, bucket)
        .await
        .with_context(|| format!("Failed to list objects in bucket {}", bucket))
        .inspect_err(|e| log::error!("Error getting files from bucket {}: {:#}", bucket, e))?;

    if listing.is_empty() {
        match policy {
            EmptyBucketPolicy::Error => {
                log::error!("Bucket {} is empty", bucket);
                return Err(EtlError::EmptySource {
                    bucket: bucket.to_string(),
                }
                .into());
            }
            EmptyBucketPolicy::Empty => {
                log::warn!("Bucket {} is empty, nothing to select", bucket);
                return Ok(BTreeMap::new());
            }
        }
    }

    let latest = latest_object_per_table(&listing);
    log::info!(
        "Selected latest files for {} table(s) from bucket {}",
        latest.len(),
        bucket
    );
    Ok(latest)
}
