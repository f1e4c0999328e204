//! In-process object store
//!
//! Used by tests and by dry runs. Listings are paginated like S3 so callers
//! exercise the continuation-token path.

use super::object_store::{ListPage, ObjectMeta, ObjectStore};
use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
    failing_buckets: HashSet<String>,
    last_write: Option<DateTime<Utc>>,
}

/// Cloneable handle to a shared in-memory store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Store whose listings return at most `page_size` keys per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            page_size: page_size.max(1),
        }
    }

    /// Insert an object with an explicit modification time
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>, last_modified: DateTime<Utc>) {
        self.lock().buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                body,
                last_modified,
            },
        );
    }

    /// Make every later `put` into `bucket` fail
    pub fn fail_puts_to(&self, bucket: &str) {
        self.lock().failing_buckets.insert(bucket.to_string());
    }

    /// Keys currently in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every operation leaves the maps consistent, so a panic elsewhere while
    /// the lock was held does not invalidate them
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObjectStore for MemoryStore {
    async fn list_page(&self, bucket: &str, token: Option<String>) -> Result<ListPage> {
        let inner = self.lock();
        let Some(objects) = inner.buckets.get(bucket) else {
            return Ok(ListPage::default());
        };

        let remaining = objects.iter().filter(|(key, _)| match &token {
            Some(after) => key.as_str() > after.as_str(),
            None => true,
        });

        let page: Vec<ObjectMeta> = remaining
            .take(self.page_size + 1)
            .map(|(key, object)| ObjectMeta {
                key: key.clone(),
                last_modified: object.last_modified,
            })
            .collect();

        if page.len() > self.page_size {
            let objects: Vec<ObjectMeta> = page.into_iter().take(self.page_size).collect();
            let next_token = objects.last().map(|o| o.key.clone());
            Ok(ListPage {
                objects,
                next_token,
            })
        } else {
            Ok(ListPage {
                objects: page,
                next_token: None,
            })
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.lock();
        Ok(inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.body.clone()))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing_buckets.contains(bucket) {
            eyre::bail!("Access denied writing {} to bucket {}", key, bucket);
        }

        // Writes are strictly ordered even when the clock has not moved
        let now = Utc::now();
        let last_modified = match inner.last_write {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        inner.last_write = Some(last_modified);

        inner.buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                body,
                last_modified,
            },
        );
        Ok(())
    }
}
