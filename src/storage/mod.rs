//! Object storage operations
//!
//! This module handles everything that touches buckets:
//! - The `ObjectStore` seam and an in-memory implementation
//! - Object key layout and latest-file selection
//! - Per-table watermarks
//! - CSV and Parquet codecs for snapshots

mod csv_codec;
mod keys;
mod latest;
mod memory;
mod object_store;
mod parquet_codec;
mod watermark;

pub use csv_codec::{from_delimited_text, to_delimited_text};
pub use keys::{KEY_TIMESTAMP_FORMAT, ObjectKey, object_key, table_of_key, watermark_key};
pub use latest::{EmptyBucketPolicy, latest_object_per_table, latest_objects};
pub use memory::MemoryStore;
pub use object_store::{ListPage, ObjectMeta, ObjectStore, list_all};
pub use parquet_codec::{from_parquet, to_parquet};
pub use watermark::{Watermark, WatermarkStore};
