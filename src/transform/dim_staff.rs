//! Staff dimension

use crate::schema::StarTable;
use crate::snapshot::Snapshot;
use eyre::Result;

/// Left join `staff` to `department` on `department_id`
///
/// Staff whose department is missing keep their row with NULL department
/// fields.
///
/// # Example
/// ```
/// use warehouse_etl::snapshot::{Snapshot, Value};
/// use warehouse_etl::transform::transform_dim_staff;
///
/// let staff = Snapshot::from_rows(
///     ["staff_id", "first_name", "last_name", "department_id", "email_address"],
///     vec![vec![1.into(), "Jeremie".into(), "Franey".into(), 2.into(), "jeremie.franey@terrifictotes.com".into()]],
/// ).unwrap();
/// let department = Snapshot::from_rows(
///     ["department_id", "department_name", "location"],
///     vec![vec![2.into(), "Purchasing".into(), "Manchester".into()]],
/// ).unwrap();
///
/// let dim_staff = transform_dim_staff(&staff, &department).unwrap();
/// assert_eq!(dim_staff.rows()[0][3], Value::from("Purchasing"));
/// ```
pub fn transform_dim_staff(staff: &Snapshot, department: &Snapshot) -> Result<Snapshot> {
    staff
        .left_join(department, "department_id", "department_id")?
        .select(&StarTable::DimStaff.columns())
}
