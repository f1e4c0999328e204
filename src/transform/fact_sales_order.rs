//! Sales fact table

use crate::schema::StarTable;
use crate::snapshot::{Snapshot, Value};
use eyre::{Result, WrapErr};

/// Identifier columns copied from `sales_order` as they are, keyed by output name
const PASSTHROUGH: [(&str, &str); 7] = [
    ("sales_order_id", "sales_order_id"),
    ("staff_id", "sales_staff_id"),
    ("counterparty_id", "counterparty_id"),
    ("units_sold", "units_sold"),
    ("currency_id", "currency_id"),
    ("design_id", "design_id"),
    ("agreed_delivery_location_id", "agreed_delivery_location_id"),
];

/// Two decimal places, halves to even as pandas `round(2)` does
fn round_price(price: f64) -> f64 {
    (price * 100.0).round_ties_even() / 100.0
}

/// Split a timestamp column into its date and time parts
fn split_timestamp(value: &Value, column: &str) -> Result<(Value, Value)> {
    Ok(match value.to_timestamp(column)? {
        Some(ts) => (Value::Date(ts.date()), Value::Time(ts.time())),
        None => (Value::Null, Value::Null),
    })
}

/// Build `fact_sales_order` from `sales_order`
///
/// Rows keep their source order and are numbered from 1 in `sales_record_id`.
pub fn transform_fact_sales_order(sales_order: &Snapshot) -> Result<Snapshot> {
    let created_at = sales_order.column_index("created_at")?;
    let last_updated = sales_order.column_index("last_updated")?;
    let unit_price = sales_order.column_index("unit_price")?;
    let payment_date = sales_order.column_index("agreed_payment_date")?;
    let delivery_date = sales_order.column_index("agreed_delivery_date")?;
    let passthrough = PASSTHROUGH
        .iter()
        .map(|(from, to)| Ok((*to, sales_order.column_index(from)?)))
        .collect::<Result<Vec<_>>>()?;

    let columns = StarTable::FactSalesOrder.columns();
    let mut fact = Snapshot::new(columns.iter().copied());

    for (n, row) in sales_order.rows().iter().enumerate() {
        let record = || format!("Failed to transform sales_order row {}", n + 1);

        let (created_date, created_time) =
            split_timestamp(&row[created_at], "created_at").wrap_err_with(record)?;
        let (updated_date, updated_time) =
            split_timestamp(&row[last_updated], "last_updated").wrap_err_with(record)?;
        let price = row[unit_price]
            .to_f64("unit_price")
            .wrap_err_with(record)?
            .map(round_price);
        let payment = row[payment_date]
            .to_date("agreed_payment_date")
            .wrap_err_with(record)?;
        let delivery = row[delivery_date]
            .to_date("agreed_delivery_date")
            .wrap_err_with(record)?;

        let mut out = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = match *column {
                "sales_record_id" => Value::Int(n as i64 + 1),
                "created_date" => created_date.clone(),
                "created_time" => created_time.clone(),
                "last_updated_date" => updated_date.clone(),
                "last_updated_time" => updated_time.clone(),
                "unit_price" => price.into(),
                "agreed_payment_date" => payment.into(),
                "agreed_delivery_date" => delivery.into(),
                other => passthrough
                    .iter()
                    .find(|(to, _)| *to == other)
                    .map(|(_, idx)| row[*idx].clone())
                    .unwrap_or(Value::Null),
            };
            out.push(value);
        }
        fact.push_row(out)?;
    }

    Ok(fact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn sales_order() -> Snapshot {
        Snapshot::from_rows(
            [
                "sales_order_id",
                "created_at",
                "last_updated",
                "design_id",
                "staff_id",
                "counterparty_id",
                "units_sold",
                "unit_price",
                "currency_id",
                "agreed_delivery_date",
                "agreed_payment_date",
                "agreed_delivery_location_id",
            ],
            vec![
                vec![
                    2.into(),
                    "2022-11-03 14:20:52.186".into(),
                    "2022-11-03 14:20:52.186".into(),
                    3.into(),
                    19.into(),
                    8.into(),
                    42972.into(),
                    Value::Decimal("3.946".to_string()),
                    2.into(),
                    "2022-11-07".into(),
                    "2022-11-08".into(),
                    8.into(),
                ],
                vec![
                    3.into(),
                    "2022-11-03 14:20:52.188".into(),
                    "2022-11-04 09:00:00".into(),
                    4.into(),
                    10.into(),
                    4.into(),
                    65839.into(),
                    Value::Float(2.91),
                    3.into(),
                    Value::Null,
                    "2022-11-07".into(),
                    19.into(),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fact_columns_and_record_ids() {
        let fact = transform_fact_sales_order(&sales_order()).unwrap();
        assert_eq!(fact.columns(), StarTable::FactSalesOrder.columns());
        let ids: Vec<_> = fact.column("sales_record_id").unwrap().cloned().collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2)]);
        let staff: Vec<_> = fact.column("sales_staff_id").unwrap().cloned().collect();
        assert_eq!(staff, vec![Value::Int(19), Value::Int(10)]);
    }

    #[test]
    fn test_timestamps_split_and_dates_parsed() {
        let fact = transform_fact_sales_order(&sales_order()).unwrap();
        let first = &fact.rows()[0];
        let at = |name: &str| fact.column_index(name).unwrap();

        assert_eq!(
            first[at("created_date")],
            Value::Date(NaiveDate::from_ymd_opt(2022, 11, 3).unwrap())
        );
        assert_eq!(
            first[at("created_time")],
            Value::Time(NaiveTime::from_hms_milli_opt(14, 20, 52, 186).unwrap())
        );
        assert_eq!(
            fact.rows()[1][at("last_updated_date")],
            Value::Date(NaiveDate::from_ymd_opt(2022, 11, 4).unwrap())
        );
        assert_eq!(
            first[at("agreed_payment_date")],
            Value::Date(NaiveDate::from_ymd_opt(2022, 11, 8).unwrap())
        );
        assert_eq!(fact.rows()[1][at("agreed_delivery_date")], Value::Null);
    }

    #[test]
    fn test_unit_price_rounded() {
        let fact = transform_fact_sales_order(&sales_order()).unwrap();
        let prices: Vec<_> = fact.column("unit_price").unwrap().cloned().collect();
        assert_eq!(prices, vec![Value::Float(3.95), Value::Float(2.91)]);
    }

    #[test]
    fn test_price_halves_round_to_even() {
        assert_eq!(round_price(0.125), 0.12);
        assert_eq!(round_price(0.375), 0.38);
        assert_eq!(round_price(-0.125), -0.12);
        assert_eq!(round_price(2.5), 2.5);
    }

    #[test]
    fn test_bad_timestamp_names_row() {
        let mut orders = Snapshot::new(sales_order().columns().to_vec());
        let mut row = sales_order().rows()[0].clone();
        row[1] = "not a time".into();
        orders.push_row(row).unwrap();

        let err = transform_fact_sales_order(&orders).unwrap_err();
        assert!(format!("{:?}", err).contains("sales_order row 1"));
    }
}
