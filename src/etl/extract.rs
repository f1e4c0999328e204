//! Extractor trait for pulling items out of a source

use eyre::Result;

/// Extractor trait for extracting data from a source
///
/// Implementors define how to extract items from sources like:
/// - The operational database
/// - Snapshot files in an object store bucket
///
/// # Example
/// ```no_run
/// use warehouse_etl::etl::Extractor;
/// use warehouse_etl::snapshot::Snapshot;
/// use eyre::Result;
///
/// struct FixedExtractor {
///     snapshots: Vec<Snapshot>,
/// }
///
/// impl Extractor for FixedExtractor {
///     type Item = Snapshot;
///
///     async fn extract(&self) -> Result<Vec<Self::Item>> {
///         Ok(self.snapshots.clone())
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// The type of items extracted
    type Item: Send;

    /// Extract items from the source
    ///
    /// # Errors
    /// Returns an error if extraction fails (network, I/O, decoding, etc.)
    fn extract(&self) -> impl std::future::Future<Output = Result<Vec<Self::Item>>> + Send;
}
