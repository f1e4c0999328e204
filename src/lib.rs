//! Warehouse ETL
//!
//! Incremental ingest from the operational database, star-schema transform
//! and warehouse load, each stage running over object storage buckets

pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod etl;
pub mod ingest;
pub mod load;
pub mod schema;
pub mod snapshot;
pub mod storage;
pub mod transform;

// Re-exports for convenience
pub use client::{PgConnector, S3Store};
pub use error::{EtlError, find_etl_error};
pub use etl::{Extractor, IdentityTransformer, Loader, Pipeline, Transformer};
pub use schema::{SourceTable, StarTable};
pub use snapshot::{Snapshot, Value};
pub use storage::{MemoryStore, ObjectStore, Watermark, WatermarkStore};
