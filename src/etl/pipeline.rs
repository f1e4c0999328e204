//! Pipeline orchestration for one ETL stage

use super::{Extractor, Loader, Transformer};
use eyre::Result;

/// Runs Extract, Transform and Load for one stage of the warehouse ETL
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `T`: Transformer type (must transform from E::Item)
/// - `L`: Loader type (must load T::Output)
///
/// # Example
/// ```no_run
/// use warehouse_etl::etl::{IdentityTransformer, Pipeline};
/// # use warehouse_etl::etl::{Extractor, Loader};
/// # use warehouse_etl::snapshot::Snapshot;
/// # use eyre::Result;
/// # struct SnapshotSource;
/// # impl Extractor for SnapshotSource {
/// #     type Item = Snapshot;
/// #     async fn extract(&self) -> Result<Vec<Self::Item>> { Ok(vec![]) }
/// # }
/// # struct SnapshotSink;
/// # impl Loader for SnapshotSink {
/// #     type Item = Snapshot;
/// #     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> { Ok(items.len()) }
/// # }
///
/// # async fn example() -> Result<()> {
/// let pipeline = Pipeline::new(SnapshotSource, IdentityTransformer::new(), SnapshotSink)
///     .with_name("load");
///
/// let count = pipeline.run().await?;
/// println!("Loaded {} snapshots", count);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, T, L> {
    name: &'static str,
    extractor: E,
    transformer: T,
    loader: L,
}

impl<E, T, L> Pipeline<E, T, L>
where
    E: Extractor,
    T: Transformer<Input = E::Item>,
    L: Loader<Item = T::Output>,
{
    /// Create a new pipeline
    pub fn new(extractor: E, transformer: T, loader: L) -> Self {
        Self {
            name: "ETL",
            extractor,
            transformer,
            loader,
        }
    }

    /// Name used in log lines
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Run the complete stage
    ///
    /// Steps:
    /// 1. Extract items from source
    /// 2. Transform the whole batch
    /// 3. Load items to destination
    ///
    /// Nothing is loaded unless every item transformed. Returns the number of
    /// items the loader reports.
    ///
    /// # Errors
    /// Returns an error if any step fails
    pub async fn run(&self) -> Result<usize> {
        log::info!("Starting {} pipeline", self.name);

        log::debug!("Extracting from source...");
        let items = self.extractor.extract().await?;
        log::info!("Extracted {} item(s)", items.len());

        if items.is_empty() {
            log::warn!("No items extracted, {} pipeline complete", self.name);
            return Ok(0);
        }

        log::debug!("Transforming items...");
        let transformed = self.transformer.transform_many(items)?;
        log::info!("Transformed {} item(s)", transformed.len());

        log::debug!("Loading to destination...");
        let count = self.loader.load(transformed).await?;
        log::info!("Loaded {} item(s), {} pipeline complete", count, self.name);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Snapshot, Value};
    use eyre::Result;
    use std::sync::{Arc, Mutex};

    struct SnapshotSource(Vec<Snapshot>);

    impl Extractor for SnapshotSource {
        type Item = Snapshot;
        async fn extract(&self) -> Result<Vec<Self::Item>> {
            Ok(self.0.clone())
        }
    }

    struct KeepIds;

    impl Transformer for KeepIds {
        type Input = Snapshot;
        type Output = Snapshot;
        fn transform(&self, input: Self::Input) -> Result<Self::Output> {
            input.select(&["id"])
        }
    }

    #[derive(Default)]
    struct RecordingSink(Arc<Mutex<Vec<Snapshot>>>);

    impl Loader for RecordingSink {
        type Item = Snapshot;
        async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
            let count = items.len();
            self.0.lock().unwrap().extend(items);
            Ok(count)
        }
    }

    fn snapshot(columns: &[&str], id: i64) -> Snapshot {
        let row = columns.iter().map(|_| Value::Int(id)).collect();
        Snapshot::from_rows(columns.iter().copied(), vec![row]).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline() {
        let pipeline = Pipeline::new(
            SnapshotSource(vec![snapshot(&["id", "name"], 1), snapshot(&["name", "id"], 2)]),
            KeepIds,
            RecordingSink::default(),
        )
        .with_name("test");

        let count = pipeline.run().await.unwrap();
        assert_eq!(count, 2);

        let loaded = pipeline.loader().0.lock().unwrap();
        assert_eq!(loaded[0].columns(), &["id"]);
        assert_eq!(loaded[1].rows()[0], vec![Value::Int(2)]);
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let pipeline = Pipeline::new(SnapshotSource(vec![]), KeepIds, RecordingSink::default());

        let count = pipeline.run().await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_transform_failure_loads_nothing() {
        let pipeline = Pipeline::new(
            SnapshotSource(vec![snapshot(&["id"], 1), snapshot(&["name"], 2)]),
            KeepIds,
            RecordingSink::default(),
        );

        assert!(pipeline.run().await.is_err());
        assert!(pipeline.loader().0.lock().unwrap().is_empty());
    }
}
