//! Object storage seam

use chrono::{DateTime, Utc};
use eyre::Result;
use std::future::Future;

/// A listed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectMeta>,
    /// Present when the listing was truncated and more pages follow
    pub next_token: Option<String>,
}

/// Bucket/key object storage
///
/// `get` distinguishes a missing key (`Ok(None)`) from a failed read (`Err`).
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of keys, starting after `token` if given
    fn list_page(
        &self,
        bucket: &str,
        token: Option<String>,
    ) -> impl Future<Output = Result<ListPage>> + Send;

    fn get(&self, bucket: &str, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

/// List every object in a bucket, following continuation tokens to the end
pub async fn list_all<S: ObjectStore>(store: &S, bucket: &str) -> Result<Vec<ObjectMeta>> {
    let mut objects = Vec::new();
    let mut token = None;
    let mut pages = 0usize;

    loop {
        let page = store.list_page(bucket, token).await?;
        pages += 1;
        objects.extend(page.objects);

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    log::debug!(
        "Listed {} object(s) from bucket {} in {} page(s)",
        objects.len(),
        bucket,
        pages
    );
    Ok(objects)
}
