//! S3-backed object store

use crate::storage::{ListPage, ObjectMeta, ObjectStore};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use eyre::{Result, eyre};

/// [`ObjectStore`] over an AWS S3 client
#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain in `region`
    pub async fn from_region(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;
        Self::new(Client::new(&config))
    }
}

fn to_chrono(at: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.secs(), at.subsec_nanos())
}

/// Convert one listing response, refusing anything that would shorten it
fn list_page_of(bucket: &str, output: &ListObjectsV2Output) -> Result<ListPage> {
    let objects = output
        .contents()
        .iter()
        .map(|object| {
            let key = object
                .key()
                .ok_or_else(|| eyre!("Listing of bucket {} returned an object without a key", bucket))?;
            let last_modified = object.last_modified().and_then(to_chrono).ok_or_else(|| {
                eyre!("Listing of bucket {} has no modification time for {}", bucket, key)
            })?;
            Ok(ObjectMeta {
                key: key.to_string(),
                last_modified,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let next_token = match output.is_truncated() {
        Some(true) => Some(
            output
                .next_continuation_token()
                .ok_or_else(|| {
                    eyre!("Listing of bucket {} is truncated without a continuation token", bucket)
                })?
                .to_string(),
        ),
        _ => None,
    };

    Ok(ListPage {
        objects,
        next_token,
    })
}

impl ObjectStore for S3Store {
    async fn list_page(&self, bucket: &str, token: Option<String>) -> Result<ListPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(token)
            .send()
            .await
            .map_err(|e| {
                eyre!(
                    "Failed to list bucket {}: {}",
                    bucket,
                    DisplayErrorContext(&e)
                )
            })?;

        list_page_of(bucket, &output)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let response = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(response) => response,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                log::debug!("Key {} not found in bucket {}", key, bucket);
                return Ok(None);
            }
            Err(e) => {
                return Err(eyre!(
                    "Failed to get {} from bucket {}: {}",
                    key,
                    bucket,
                    DisplayErrorContext(&e)
                ));
            }
        };

        let body = response.body.collect().await.map_err(|e| {
            eyre!(
                "Failed to read body of {} from bucket {}: {}",
                key,
                bucket,
                e
            )
        })?;

        Ok(Some(body.into_bytes().to_vec()))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                eyre!(
                    "Failed to put {} to bucket {}: {}",
                    key,
                    bucket,
                    DisplayErrorContext(&e)
                )
            })?;

        log::debug!("Wrote {} to bucket {}", key, bucket);
        Ok(())
    }
}
