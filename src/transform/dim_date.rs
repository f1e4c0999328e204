use crate::schema::StarTable;
use crate::snapshot::{Snapshot, Value};
use chrono::{Datelike, NaiveDate};
use eyre::Result;

const DEFAULT_START: NaiveDate = match NaiveDate::from_ymd_opt(2020, 1, 1) {
    Some(date) => date,
    None => panic!("invalid default dim_date start"),
};

const DEFAULT_END: NaiveDate = match NaiveDate::from_ymd_opt(2025, 12, 31) {
    Some(date) => date,
    None => panic!("invalid default dim_date end"),
};

/// Inclusive calendar range covered by `dim_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            end: DEFAULT_END,
        }
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if end < start {
            return Err(format!("end date {} is before start date {}", end, start));
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|day| *day <= self.end)
    }
}

/// One row per calendar day; computed, never extracted
pub fn transform_dim_date(range: &DateRange) -> Result<Snapshot> {
    let mut dim_date = Snapshot::new(StarTable::DimDate.columns());

    for day in range.days() {
        dim_date.push_row(vec![
            Value::Date(day),
            day.year().into(),
            day.month().into(),
            day.day().into(),
            day.weekday().number_from_monday().into(),
            Value::Text(day.format("%A").to_string()),
            Value::Text(day.format("%B").to_string()),
            ((day.month0() / 3) + 1).into(),
        ])?;
    }

    log::debug!(
        "Generated {} dim_date rows from {} to {}",
        dim_date.len(),
        range.start,
        range.end
    );
    Ok(dim_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_range_row_count() {
        let dim_date = transform_dim_date(&DateRange::default()).unwrap();
        // 2020 and 2024 are leap years
        assert_eq!(dim_date.len(), 366 * 2 + 365 * 4);
        assert_eq!(dim_date.columns(), StarTable::DimDate.columns());
    }

    #[test]
    fn test_row_attributes() {
        let range = DateRange::new(date(2024, 11, 17), date(2024, 11, 18)).unwrap();
        let dim_date = transform_dim_date(&range).unwrap();

        // 2024-11-17 is a Sunday
        assert_eq!(
            dim_date.rows()[0],
            vec![
                Value::Date(date(2024, 11, 17)),
                Value::Int(2024),
                Value::Int(11),
                Value::Int(17),
                Value::Int(7),
                Value::from("Sunday"),
                Value::from("November"),
                Value::Int(4),
            ]
        );
        assert_eq!(dim_date.rows()[1][4], Value::Int(1));
        assert_eq!(dim_date.rows()[1][5], Value::from("Monday"));
    }

    #[test]
    fn test_range_validation() {
        assert!(DateRange::new(date(2025, 1, 1), date(2024, 1, 1)).is_err());
        let single = DateRange::new(date(2024, 2, 29), date(2024, 2, 29)).unwrap();
        assert_eq!(single.days().count(), 1);
    }
}
