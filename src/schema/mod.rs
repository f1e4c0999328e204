//! Closed sets of table names on both sides of the pipeline

mod source;
mod star;

pub use source::SourceTable;
pub use star::{ColumnDef, StarTable};
