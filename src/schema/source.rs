//! The operational tables the ingest stage is allowed to read

use crate::error::EtlError;
use std::fmt;
use std::str::FromStr;

/// One of the eleven tables of the operational database
///
/// Table names are only ever interpolated into SQL after parsing into this
/// type, so an unknown name can never reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceTable {
    Counterparty,
    Currency,
    Department,
    Design,
    Staff,
    SalesOrder,
    Address,
    Payment,
    PurchaseOrder,
    PaymentType,
    Transaction,
}

impl SourceTable {
    pub const ALL: [SourceTable; 11] = [
        SourceTable::Counterparty,
        SourceTable::Currency,
        SourceTable::Department,
        SourceTable::Design,
        SourceTable::Staff,
        SourceTable::SalesOrder,
        SourceTable::Address,
        SourceTable::Payment,
        SourceTable::PurchaseOrder,
        SourceTable::PaymentType,
        SourceTable::Transaction,
    ];

    /// Inputs the star-schema transform cannot run without
    pub const STAR_SCHEMA_INPUTS: [SourceTable; 7] = [
        SourceTable::SalesOrder,
        SourceTable::Staff,
        SourceTable::Department,
        SourceTable::Address,
        SourceTable::Design,
        SourceTable::Currency,
        SourceTable::Counterparty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::Counterparty => "counterparty",
            SourceTable::Currency => "currency",
            SourceTable::Department => "department",
            SourceTable::Design => "design",
            SourceTable::Staff => "staff",
            SourceTable::SalesOrder => "sales_order",
            SourceTable::Address => "address",
            SourceTable::Payment => "payment",
            SourceTable::PurchaseOrder => "purchase_order",
            SourceTable::PaymentType => "payment_type",
            SourceTable::Transaction => "transaction",
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTable {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceTable::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| EtlError::InvalidTableName(s.to_string()))
    }
}
