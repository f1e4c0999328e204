//! Assemble every star-schema table from one set of operational snapshots

use super::dim_counterparty::transform_dim_counterparty;
use super::dim_currency::transform_dim_currency;
use super::dim_date::{DateRange, transform_dim_date};
use super::dim_design::transform_dim_design;
use super::dim_location::transform_dim_location;
use super::dim_staff::transform_dim_staff;
use super::fact_sales_order::transform_fact_sales_order;
use crate::error::EtlError;
use crate::schema::{SourceTable, StarTable};
use crate::snapshot::Snapshot;
use eyre::{Result, WrapErr};
use std::collections::BTreeMap;

/// Build all seven star tables, or none
///
/// Every input in [`SourceTable::STAR_SCHEMA_INPUTS`] must be present; missing
/// inputs are reported together before any table is built. Extra inputs are
/// ignored.
pub fn build_star_schema(
    sources: &BTreeMap<SourceTable, Snapshot>,
    dim_dates: &DateRange,
) -> Result<BTreeMap<StarTable, Snapshot>> {
    let missing: Vec<String> = SourceTable::STAR_SCHEMA_INPUTS
        .iter()
        .filter(|table| !sources.contains_key(*table))
        .map(|table| table.to_string())
        .collect();

    if !missing.is_empty() {
        log::error!(
            "Cannot build star schema, missing snapshots: {}",
            missing.join(", ")
        );
        return Err(EtlError::MissingSnapshots { tables: missing }.into());
    }

    let mut star = BTreeMap::new();
    for table in StarTable::ALL {
        let snapshot = build_table(table, sources, dim_dates)
            .wrap_err_with(|| format!("Failed to build {}", table))
            .inspect_err(|e| log::error!("{:#}", e))?;
        log::debug!("Built {} with {} row(s)", table, snapshot.len());
        star.insert(table, snapshot);
    }

    log::info!("Built {} star-schema tables", star.len());
    Ok(star)
}

fn source(sources: &BTreeMap<SourceTable, Snapshot>, table: SourceTable) -> Result<&Snapshot> {
    sources.get(&table).ok_or_else(|| {
        EtlError::MissingSnapshots {
            tables: vec![table.to_string()],
        }
        .into()
    })
}

fn build_table(
    table: StarTable,
    sources: &BTreeMap<SourceTable, Snapshot>,
    dim_dates: &DateRange,
) -> Result<Snapshot> {
    match table {
        StarTable::FactSalesOrder => {
            transform_fact_sales_order(source(sources, SourceTable::SalesOrder)?)
        }
        StarTable::DimStaff => transform_dim_staff(
            source(sources, SourceTable::Staff)?,
            source(sources, SourceTable::Department)?,
        ),
        StarTable::DimLocation => transform_dim_location(source(sources, SourceTable::Address)?),
        StarTable::DimDesign => transform_dim_design(source(sources, SourceTable::Design)?),
        StarTable::DimDate => transform_dim_date(dim_dates),
        StarTable::DimCurrency => transform_dim_currency(source(sources, SourceTable::Currency)?),
        StarTable::DimCounterparty => transform_dim_counterparty(
            source(sources, SourceTable::Counterparty)?,
            source(sources, SourceTable::Address)?,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_etl_error;
    use crate::snapshot::Value;
    use chrono::NaiveDate;

    fn one_row(columns: &[&str]) -> Snapshot {
        let row = columns
            .iter()
            .map(|c| match *c {
                "created_at" | "last_updated" => Value::from("2022-11-03 14:20:52.186"),
                "agreed_delivery_date" | "agreed_payment_date" => Value::from("2022-11-07"),
                "currency_code" => Value::from("GBP"),
                "unit_price" => Value::Float(3.94),
                name if name.ends_with("_id") => Value::Int(1),
                name => Value::from(name),
            })
            .collect();
        Snapshot::from_rows(columns.iter().copied(), vec![row]).unwrap()
    }

    fn sources() -> BTreeMap<SourceTable, Snapshot> {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceTable::SalesOrder,
            one_row(&[
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
            ]),
        );
        sources.insert(
            SourceTable::Staff,
            one_row(&["staff_id", "first_name", "last_name", "department_id", "email_address"]),
        );
        sources.insert(
            SourceTable::Department,
            one_row(&["department_id", "department_name", "location", "manager"]),
        );
        sources.insert(
            SourceTable::Address,
            one_row(&[
                "address_id",
                "address_line_1",
                "address_line_2",
                "district",
                "city",
                "postal_code",
                "country",
                "phone",
            ]),
        );
        sources.insert(
            SourceTable::Design,
            one_row(&["design_id", "design_name", "file_location", "file_name"]),
        );
        sources.insert(
            SourceTable::Currency,
            one_row(&["currency_id", "currency_code"]),
        );
        sources.insert(
            SourceTable::Counterparty,
            one_row(&["counterparty_id", "counterparty_legal_name", "legal_address_id"]),
        );
        sources
    }

    fn short_range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2022, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 11, 30).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_builds_every_table() {
        let star = build_star_schema(&sources(), &short_range()).unwrap();
        assert_eq!(star.len(), 7);
        for (table, snapshot) in &star {
            assert_eq!(snapshot.columns(), table.columns(), "{}", table);
        }
        assert_eq!(star[&StarTable::DimDate].len(), 30);
        assert_eq!(
            star[&StarTable::DimCurrency].rows()[0][2],
            Value::from("British Pound")
        );
    }

    #[test]
    fn test_missing_input_fails_before_building() {
        let mut sources = sources();
        sources.remove(&SourceTable::Department);
        sources.remove(&SourceTable::Currency);

        let err = build_star_schema(&sources, &short_range()).unwrap_err();
        assert_eq!(
            find_etl_error(&err),
            Some(&EtlError::MissingSnapshots {
                tables: vec!["department".to_string(), "currency".to_string()]
            })
        );
    }

    #[test]
    fn test_extra_inputs_are_ignored() {
        let mut sources = sources();
        sources.insert(SourceTable::Payment, Snapshot::new(["payment_id"]));
        assert!(build_star_schema(&sources, &short_range()).is_ok());
    }

    #[test]
    fn test_bad_input_names_star_table() {
        let mut sources = sources();
        sources.insert(SourceTable::Design, Snapshot::new(["design_id"]));
        let err = build_star_schema(&sources, &short_range()).unwrap_err();
        assert!(err.to_string().contains("dim_design"));
    }
}
