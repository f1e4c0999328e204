//! Concrete collaborators for the storage and database seams
//!
//! [`S3Store`] implements [`ObjectStore`](crate::storage::ObjectStore) on
//! aws-sdk-s3, and [`PgConnector`] implements
//! [`Connector`](crate::db::Connector) on tokio-postgres.

mod postgres;
mod s3;

pub use postgres::{PgConnection, PgConnector};
pub use s3::S3Store;
