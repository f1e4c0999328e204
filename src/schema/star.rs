//! The warehouse tables produced by the star-schema transform

use crate::error::EtlError;
use std::fmt;
use std::str::FromStr;

/// Warehouse definition of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// Filled in by the warehouse itself, never inserted
    pub generated: bool,
}

impl ColumnDef {
    /// Type a bound value is cast to, without constraints
    pub fn value_type(&self) -> &'static str {
        self.sql_type
            .split(" PRIMARY KEY")
            .next()
            .unwrap_or(self.sql_type)
    }

    pub fn is_primary_key(&self) -> bool {
        self.sql_type.ends_with(" PRIMARY KEY")
    }
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        generated: false,
    }
}

const FACT_SALES_ORDER: &[ColumnDef] = &[
    ColumnDef {
        name: "sales_record_id",
        sql_type: "SERIAL PRIMARY KEY",
        generated: true,
    },
    col("sales_order_id", "INT"),
    col("created_date", "DATE"),
    col("created_time", "TIME"),
    col("last_updated_date", "DATE"),
    col("last_updated_time", "TIME"),
    col("sales_staff_id", "INT"),
    col("counterparty_id", "INT"),
    col("units_sold", "INT"),
    col("unit_price", "NUMERIC(10,2)"),
    col("currency_id", "INT"),
    col("design_id", "INT"),
    col("agreed_payment_date", "DATE"),
    col("agreed_delivery_date", "DATE"),
    col("agreed_delivery_location_id", "INT"),
];

const DIM_STAFF: &[ColumnDef] = &[
    col("staff_id", "INT PRIMARY KEY"),
    col("first_name", "VARCHAR"),
    col("last_name", "VARCHAR"),
    col("department_name", "VARCHAR"),
    col("location", "VARCHAR"),
    col("email_address", "VARCHAR"),
];

const DIM_LOCATION: &[ColumnDef] = &[
    col("location_id", "INT PRIMARY KEY"),
    col("address_line_1", "VARCHAR"),
    col("address_line_2", "VARCHAR"),
    col("district", "VARCHAR"),
    col("city", "VARCHAR"),
    col("postal_code", "VARCHAR"),
    col("country", "VARCHAR"),
    col("phone", "VARCHAR"),
];

const DIM_DESIGN: &[ColumnDef] = &[
    col("design_id", "INT PRIMARY KEY"),
    col("design_name", "VARCHAR"),
    col("file_location", "VARCHAR"),
    col("file_name", "VARCHAR"),
];

const DIM_DATE: &[ColumnDef] = &[
    col("date_id", "DATE PRIMARY KEY"),
    col("year", "INT"),
    col("month", "INT"),
    col("day", "INT"),
    col("day_of_week", "INT"),
    col("day_name", "VARCHAR"),
    col("month_name", "VARCHAR"),
    col("quarter", "INT"),
];

const DIM_CURRENCY: &[ColumnDef] = &[
    col("currency_id", "INT PRIMARY KEY"),
    col("currency_code", "VARCHAR"),
    col("currency_name", "VARCHAR"),
];

const DIM_COUNTERPARTY: &[ColumnDef] = &[
    col("counterparty_id", "INT PRIMARY KEY"),
    col("counterparty_legal_name", "VARCHAR"),
    col("counterparty_legal_address_line_1", "VARCHAR"),
    col("counterparty_legal_address_line_2", "VARCHAR"),
    col("counterparty_legal_district", "VARCHAR"),
    col("counterparty_legal_city", "VARCHAR"),
    col("counterparty_legal_postal_code", "VARCHAR"),
    col("counterparty_legal_country", "VARCHAR"),
    col("counterparty_legal_phone_number", "VARCHAR"),
];

/// One of the seven star-schema tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StarTable {
    FactSalesOrder,
    DimStaff,
    DimLocation,
    DimDesign,
    DimDate,
    DimCurrency,
    DimCounterparty,
}

impl StarTable {
    pub const ALL: [StarTable; 7] = [
        StarTable::FactSalesOrder,
        StarTable::DimStaff,
        StarTable::DimLocation,
        StarTable::DimDesign,
        StarTable::DimDate,
        StarTable::DimCurrency,
        StarTable::DimCounterparty,
    ];

    /// Order tables are written to the warehouse: dimensions before the fact
    pub const LOAD_ORDER: [StarTable; 7] = [
        StarTable::DimDate,
        StarTable::DimCurrency,
        StarTable::DimDesign,
        StarTable::DimLocation,
        StarTable::DimStaff,
        StarTable::DimCounterparty,
        StarTable::FactSalesOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StarTable::FactSalesOrder => "fact_sales_order",
            StarTable::DimStaff => "dim_staff",
            StarTable::DimLocation => "dim_location",
            StarTable::DimDesign => "dim_design",
            StarTable::DimDate => "dim_date",
            StarTable::DimCurrency => "dim_currency",
            StarTable::DimCounterparty => "dim_counterparty",
        }
    }

    pub fn column_defs(&self) -> &'static [ColumnDef] {
        match self {
            StarTable::FactSalesOrder => FACT_SALES_ORDER,
            StarTable::DimStaff => DIM_STAFF,
            StarTable::DimLocation => DIM_LOCATION,
            StarTable::DimDesign => DIM_DESIGN,
            StarTable::DimDate => DIM_DATE,
            StarTable::DimCurrency => DIM_CURRENCY,
            StarTable::DimCounterparty => DIM_COUNTERPARTY,
        }
    }

    /// Output column names in order
    pub fn columns(&self) -> Vec<&'static str> {
        self.column_defs().iter().map(|c| c.name).collect()
    }

    pub fn column_def(&self, name: &str) -> Option<&'static ColumnDef> {
        self.column_defs().iter().find(|c| c.name == name)
    }

    /// Natural key a re-load replaces rows on
    ///
    /// `None` when the only key is generated by the warehouse, in which case
    /// every load appends.
    pub fn primary_key(&self) -> Option<&'static ColumnDef> {
        self.column_defs()
            .iter()
            .find(|c| c.is_primary_key() && !c.generated)
    }

    /// Whether the table is seeded once and never appended to
    pub fn is_static(&self) -> bool {
        matches!(self, StarTable::DimDate)
    }
}

impl fmt::Display for StarTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StarTable {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StarTable::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| EtlError::InvalidTableName(s.to_string()))
    }
}
