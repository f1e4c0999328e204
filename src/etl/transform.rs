//! Transformer trait for data transformation

use eyre::Result;

/// Transformer trait for transforming data items
///
/// Implementors define how to transform items:
/// - Projection (keeping a subset of columns)
/// - Reshaping (joining operational tables into dimensions)
/// - Derivation (computing new columns)
///
/// # Example
/// ```no_run
/// use warehouse_etl::etl::Transformer;
/// use warehouse_etl::snapshot::Snapshot;
/// use eyre::Result;
///
/// struct ColumnPicker {
///     columns: Vec<&'static str>,
/// }
///
/// impl Transformer for ColumnPicker {
///     type Input = Snapshot;
///     type Output = Snapshot;
///
///     fn transform(&self, input: Self::Input) -> Result<Self::Output> {
///         input.select(&self.columns)
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Input item type
    type Input: Send;

    /// Output item type after transformation
    type Output: Send;

    /// Transform a single item
    ///
    /// # Errors
    /// Returns an error if transformation fails (validation, conversion, etc.)
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;

    /// Transform multiple items (default batch implementation)
    ///
    /// Override this for optimized batch processing
    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        inputs.into_iter().map(|i| self.transform(i)).collect()
    }
}

/// Identity transformer that passes items through unchanged
///
/// Use this when you need a transformer but don't want to modify the data.
/// The generic parameter T must be specified when creating the transformer.
pub struct IdentityTransformer<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for IdentityTransformer<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> IdentityTransformer<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Send + Sync> Transformer for IdentityTransformer<T> {
    type Input = T;
    type Output = T;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(input)
    }
}
