use crate::schema::StarTable;
use crate::snapshot::Snapshot;
use eyre::Result;

/// `address` keyed by `location_id`
pub fn transform_dim_location(address: &Snapshot) -> Result<Snapshot> {
    address
        .clone()
        .rename(&[("address_id", "location_id")])
        .select(&StarTable::DimLocation.columns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Value;

    #[test]
    fn test_address_becomes_location() {
        let address = Snapshot::from_rows(
            [
                "address_id",
                "address_line_1",
                "address_line_2",
                "district",
                "city",
                "postal_code",
                "country",
                "phone",
                "created_at",
                "last_updated",
            ],
            vec![vec![
                1.into(),
                "6826 Herzog Via".into(),
                Value::Null,
                "Avon".into(),
                "New Patienceburgh".into(),
                "28441".into(),
                "Turkey".into(),
                "1803 637401".into(),
                "2022-11-03 14:20:49.962".into(),
                "2022-11-03 14:20:49.962".into(),
            ]],
        )
        .unwrap();

        let dim_location = transform_dim_location(&address).unwrap();
        assert_eq!(dim_location.columns(), StarTable::DimLocation.columns());
        assert_eq!(dim_location.rows()[0][0], Value::Int(1));
        assert_eq!(dim_location.rows()[0][2], Value::Null);
        assert_eq!(dim_location.rows()[0][7], Value::from("1803 637401"));
    }

    #[test]
    fn test_missing_address_column_fails() {
        let address = Snapshot::new(["address_id", "city"]);
        assert!(transform_dim_location(&address).is_err());
    }
}
