//! Core ETL (Extract, Transform, Load) abstractions
//!
//! The transform and load stages are each a [`Pipeline`]: an extractor reads
//! snapshots from a bucket, a transformer reshapes them, and a loader writes
//! them to the next bucket or to the warehouse.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::Pipeline;
pub use transform::{IdentityTransformer, Transformer};
