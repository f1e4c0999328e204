//! Loader trait for writing items to a destination

use eyre::Result;

/// Loader trait for loading data to a destination
///
/// Implementors define how to load items to destinations:
/// - An object store bucket
/// - The warehouse database
///
/// # Example
/// ```no_run
/// use warehouse_etl::etl::Loader;
/// use warehouse_etl::snapshot::Snapshot;
/// use eyre::Result;
///
/// struct RowCounter;
///
/// impl Loader for RowCounter {
///     type Item = Snapshot;
///
///     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
///         Ok(items.iter().map(Snapshot::len).sum())
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// The type of items to load
    type Item: Send;

    /// Load items to the destination
    ///
    /// Returns the number of items successfully loaded
    ///
    /// # Errors
    /// Returns an error if loading fails (network, database, encoding, etc.)
    fn load(&self, items: Vec<Self::Item>) -> impl std::future::Future<Output = Result<usize>> + Send;
}
