//! Counterparty dimension

use crate::schema::StarTable;
use crate::snapshot::Snapshot;
use eyre::Result;

const LEGAL_ADDRESS_FIELDS: [(&str, &str); 7] = [
    ("address_line_1", "counterparty_legal_address_line_1"),
    ("address_line_2", "counterparty_legal_address_line_2"),
    ("district", "counterparty_legal_district"),
    ("city", "counterparty_legal_city"),
    ("postal_code", "counterparty_legal_postal_code"),
    ("country", "counterparty_legal_country"),
    ("phone", "counterparty_legal_phone_number"),
];

/// Left join `counterparty` to `address` on `counterparty_id = address_id`
///
/// Address fields take the `counterparty_legal_` prefix. A counterparty
/// without a matching address keeps its row with NULL address fields.
pub fn transform_dim_counterparty(counterparty: &Snapshot, address: &Snapshot) -> Result<Snapshot> {
    // Only the address fields are taken from the right side, so the audit
    // columns both tables carry never collide
    let mut right_columns = vec!["address_id"];
    right_columns.extend(LEGAL_ADDRESS_FIELDS.iter().map(|(from, _)| *from));
    let address = address.select(&right_columns)?;

    counterparty
        .left_join(&address, "counterparty_id", "address_id")?
        .rename(&LEGAL_ADDRESS_FIELDS)
        .select(&StarTable::DimCounterparty.columns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Value;

    fn address() -> Snapshot {
        Snapshot::from_rows(
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
                "605 Haskell Trafficway".into(),
                "Axel Freeway".into(),
                Value::Null,
                "East Bobbie".into(),
                "88253-4257".into(),
                "Heard Island and McDonald Islands".into(),
                "9687 937447".into(),
                "2022-11-03 14:20:49.962".into(),
                "2022-11-03 14:20:49.962".into(),
            ]],
        )
        .unwrap()
    }

    fn counterparty() -> Snapshot {
        Snapshot::from_rows(
            [
                "counterparty_id",
                "counterparty_legal_name",
                "legal_address_id",
                "commercial_contact",
                "delivery_contact",
                "created_at",
                "last_updated",
            ],
            vec![
                vec![
                    1.into(),
                    "Fahey and Sons".into(),
                    15.into(),
                    "Micheal Toy".into(),
                    "Mrs. Lucy Runolfsdottir".into(),
                    "2022-11-03 14:20:51.563".into(),
                    "2022-11-03 14:20:51.563".into(),
                ],
                vec![
                    2.into(),
                    "Leannon, Predovic and Morar".into(),
                    28.into(),
                    "Melba Sanford".into(),
                    "Jean Hane III".into(),
                    "2022-11-03 14:20:51.563".into(),
                    "2022-11-03 14:20:51.563".into(),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_legal_address_prefix() {
        let dim = transform_dim_counterparty(&counterparty(), &address()).unwrap();
        assert_eq!(dim.columns(), StarTable::DimCounterparty.columns());
        assert_eq!(dim.len(), 2);
        assert_eq!(
            dim.rows()[0],
            vec![
                Value::Int(1),
                Value::from("Fahey and Sons"),
                Value::from("605 Haskell Trafficway"),
                Value::from("Axel Freeway"),
                Value::Null,
                Value::from("East Bobbie"),
                Value::from("88253-4257"),
                Value::from("Heard Island and McDonald Islands"),
                Value::from("9687 937447"),
            ]
        );
    }

    #[test]
    fn test_unmatched_counterparty_keeps_row() {
        let dim = transform_dim_counterparty(&counterparty(), &address()).unwrap();
        let row = &dim.rows()[1];
        assert_eq!(row[1], Value::from("Leannon, Predovic and Morar"));
        assert!(row[2..].iter().all(Value::is_null));
    }
}
