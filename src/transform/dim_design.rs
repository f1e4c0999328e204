use crate::schema::StarTable;
use crate::snapshot::Snapshot;
use eyre::Result;

pub fn transform_dim_design(design: &Snapshot) -> Result<Snapshot> {
    design.select(&StarTable::DimDesign.columns())
}
