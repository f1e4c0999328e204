//! Warehouse load
//!
//! The sink writer statements and the load stage that drives them.

mod loader;
mod warehouse;

pub use loader::{StarTablesExtractor, WarehouseLoader, load_pipeline};
pub use warehouse::{create_table_if_absent, create_table_sql, insert_rows, reset_warehouse};
