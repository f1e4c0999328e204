//! Star-schema transform
//!
//! One module per warehouse table, each a pure function from operational
//! snapshots to the table's exact column list, plus the stage adapters that
//! read ingested CSV and write Parquet.

mod dim_counterparty;
mod dim_currency;
mod dim_date;
mod dim_design;
mod dim_location;
mod dim_staff;
mod fact_sales_order;
mod stage;
mod star_schema;

pub use dim_counterparty::transform_dim_counterparty;
pub use dim_currency::{currency_name, transform_dim_currency};
pub use dim_date::{DateRange, transform_dim_date};
pub use dim_design::transform_dim_design;
pub use dim_location::transform_dim_location;
pub use dim_staff::transform_dim_staff;
pub use fact_sales_order::transform_fact_sales_order;
pub use stage::{
    IngestedSnapshotsExtractor, ParquetUploader, SourceBatch, StarBatch, StarSchemaTransformer,
    transform_pipeline,
};
pub use star_schema::build_star_schema;
