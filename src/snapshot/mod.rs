//! Tabular data passed between pipeline stages

mod table;
mod value;

pub use table::Snapshot;
pub use value::{DATE_FORMAT, TIME_FORMAT, TIMESTAMP_FORMAT, Value, parse_timestamp};
