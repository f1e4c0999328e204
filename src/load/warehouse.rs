//! Warehouse writes: DDL, batched inserts and the maintenance reset
//!
//! Every write runs inside an explicit transaction. A failure rolls the whole
//! call back, so a table never holds part of a batch.

use crate::db::{Connection, SqlParam};
use crate::error::EtlError;
use crate::schema::{ColumnDef, StarTable};
use crate::snapshot::Snapshot;
use eyre::{Context, Result};
use pg_escape::quote_identifier;
use std::future::Future;

async fn rollback<C: Connection>(connection: &C, what: &str) {
    if let Err(e) = connection.batch_execute("ROLLBACK").await {
        log::warn!("Rollback after failed {} also failed: {:#}", what, e);
    }
}

/// Run `work` between `BEGIN` and `COMMIT`, rolling back if it fails
async fn transaction<C, F, T>(connection: &C, what: &str, work: F) -> Result<T>
where
    C: Connection,
    F: Future<Output = Result<T>>,
{
    connection
        .batch_execute("BEGIN")
        .await
        .with_context(|| format!("Failed to start transaction for {}", what))?;

    match work.await {
        Ok(value) => {
            connection
                .batch_execute("COMMIT")
                .await
                .with_context(|| format!("Failed to commit {}", what))?;
            Ok(value)
        }
        Err(e) => {
            rollback(connection, what).await;
            Err(e)
        }
    }
}

/// `CREATE TABLE IF NOT EXISTS` statement for a column list
pub fn create_table_sql(table_name: &str, column_defs: &[ColumnDef]) -> String {
    let columns: Vec<String> = column_defs
        .iter()
        .map(|c| format!("{} {}", quote_identifier(c.name), c.sql_type))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table_name),
        columns.join(", ")
    )
}

/// Create the table unless it already exists
pub async fn create_table_if_absent<C: Connection>(
    connection: &C,
    table_name: &str,
    column_defs: &[ColumnDef],
) -> Result<()> {
    let sql = create_table_sql(table_name, column_defs);
    let what = format!("create table {}", table_name);

    transaction(connection, &what, connection.batch_execute(&sql))
        .await
        .with_context(|| format!("Failed to create table {}", table_name))
        .inspect_err(|e| log::error!("{:#}", e))?;

    log::info!("Table {} is ready", table_name);
    Ok(())
}

/// Parameterised upsert for the given columns of `table`
///
/// Tables with a natural key replace the existing row on conflict so a
/// re-load, or a re-extracted dimension row, overwrites instead of failing.
fn insert_sql(table: StarTable, columns: &[&ColumnDef]) -> String {
    let names: Vec<String> = columns
        .iter()
        .map(|c| quote_identifier(c.name).to_string())
        .collect();
    let values: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("CAST(${} AS {})", i + 1, c.value_type()))
        .collect();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table.as_str()),
        names.join(", "),
        values.join(", ")
    );

    let Some(key) = table.primary_key().filter(|key| columns.contains(key)) else {
        return sql;
    };
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| c.name != key.name)
        .map(|c| {
            let name = quote_identifier(c.name);
            format!("{} = EXCLUDED.{}", name, name)
        })
        .collect();
    sql.push_str(&format!(" ON CONFLICT ({}) DO ", quote_identifier(key.name)));
    match updates.is_empty() {
        true => sql.push_str("NOTHING"),
        false => sql.push_str(&format!("UPDATE SET {}", updates.join(", "))),
    }
    sql
}

async fn has_rows<C: Connection>(connection: &C, table: StarTable) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {} LIMIT 1", quote_identifier(table.as_str()));
    let found = connection
        .query(&sql, &[])
        .await
        .with_context(|| format!("Failed to check {} for existing rows", table))?;
    Ok(!found.is_empty())
}

/// Insert every row of `snapshot` into `table` in one transaction
///
/// Values are bound as parameters and cast to the declared column type by the
/// database. Rows whose key already exists are replaced; the fact table, keyed
/// by a generated id, is appended to. Columns the warehouse generates are not
/// written. A static table that already holds rows is left untouched.
///
/// Returns the number of rows inserted.
///
/// # Errors
/// Fails with [`EtlError::UnknownColumn`] before writing anything when the
/// snapshot has a column the table does not declare. A failing row rolls back
/// the whole batch.
pub async fn insert_rows<C: Connection>(
    connection: &C,
    table: StarTable,
    snapshot: &Snapshot,
) -> Result<u64> {
    let mut columns: Vec<(usize, &ColumnDef)> = Vec::new();
    for (idx, name) in snapshot.columns().iter().enumerate() {
        let def = table.column_def(name).ok_or_else(|| EtlError::UnknownColumn {
            table: table.to_string(),
            column: name.clone(),
        })?;
        if !def.generated {
            columns.push((idx, def));
        }
    }

    if table.is_static() && has_rows(connection, table).await? {
        log::info!("{} already populated, skipping insert", table);
        return Ok(0);
    }

    if snapshot.is_empty() || columns.is_empty() {
        log::info!("No rows to insert into {}", table);
        return Ok(0);
    }

    let defs: Vec<&ColumnDef> = columns.iter().map(|(_, def)| *def).collect();
    let sql = insert_sql(table, &defs);
    let what = format!("insert into {}", table);

    let inserted = transaction(connection, &what, async {
        let mut inserted = 0;
        for (n, row) in snapshot.rows().iter().enumerate() {
            let params: Vec<SqlParam> = columns.iter().map(|(idx, _)| (&row[*idx]).into()).collect();
            inserted += connection
                .execute(&sql, &params)
                .await
                .with_context(|| format!("Failed to insert row {} into {}", n + 1, table))?;
        }
        Ok(inserted)
    })
    .await
    .inspect_err(|e| log::error!("{:#}", e))?;

    log::info!("Inserted {} row(s) into {}", inserted, table);
    Ok(inserted)
}

/// Delete every row from the warehouse except the static date dimension
///
/// The fact table is cleared before the dimensions it references. Returns the
/// number of rows deleted.
pub async fn reset_warehouse<C: Connection>(connection: &C) -> Result<u64> {
    let deleted = transaction(connection, "warehouse reset", async {
        let mut deleted = 0;
        for table in StarTable::LOAD_ORDER.iter().rev().filter(|t| !t.is_static()) {
            let sql = format!("DELETE FROM {}", quote_identifier(table.as_str()));
            let n = connection
                .execute(&sql, &[])
                .await
                .with_context(|| format!("Failed to clear {}", table))?;
            log::debug!("Deleted {} row(s) from {}", n, table);
            deleted += n;
        }
        Ok(deleted)
    })
    .await
    .inspect_err(|e| log::error!("{:#}", e))?;

    log::info!("Warehouse reset, {} row(s) deleted", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_etl_error;
    use crate::snapshot::Value;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Logs statements and fails the `fail_on`-th `execute`
    #[derive(Default)]
    struct ScriptedConnection {
        log: Mutex<Vec<String>>,
        params: Mutex<Vec<Vec<SqlParam>>>,
        existing_rows: bool,
        fail_on: Option<usize>,
    }

    impl ScriptedConnection {
        fn statements(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn executes(&self) -> usize {
            self.params.lock().unwrap().len()
        }
    }

    impl Connection for ScriptedConnection {
        async fn query(&self, sql: &str, _params: &[SqlParam]) -> Result<Snapshot> {
            self.log.lock().unwrap().push(sql.to_string());
            let mut found = Snapshot::new(["?column?"]);
            if self.existing_rows {
                found.push_row(vec![Value::Int(1)])?;
            }
            Ok(found)
        }

        async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
            self.log.lock().unwrap().push(sql.to_string());
            let mut seen = self.params.lock().unwrap();
            seen.push(params.to_vec());
            if self.fail_on == Some(seen.len()) {
                eyre::bail!("duplicate key value violates unique constraint");
            }
            Ok(1)
        }

        async fn batch_execute(&self, sql: &str) -> Result<()> {
            self.log.lock().unwrap().push(sql.to_string());
            Ok(())
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    fn design() -> Snapshot {
        Snapshot::from_rows(
            StarTable::DimDesign.columns(),
            vec![
                vec![1.into(), "Wooden".into(), "/usr".into(), "wooden.json".into()],
                vec![2.into(), "Bronze".into(), Value::Null, "bronze.json".into()],
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_table_commits() {
        let connection = ScriptedConnection::default();
        create_table_if_absent(&connection, "dim_design", StarTable::DimDesign.column_defs())
            .await
            .unwrap();

        let statements = connection.statements();
        assert_eq!(statements.first().map(String::as_str), Some("BEGIN"));
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS"));
        assert!(statements[1].contains("INT PRIMARY KEY"));
        assert_eq!(statements.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_insert_binds_every_value() {
        let connection = ScriptedConnection::default();
        let inserted = insert_rows(&connection, StarTable::DimDesign, &design())
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        let statements = connection.statements();
        assert_eq!(statements[0], "BEGIN");
        assert!(statements[1].contains("CAST($1 AS INT)"));
        assert!(!statements[1].contains("Wooden"));
        assert!(statements[1].contains("ON CONFLICT (design_id) DO UPDATE SET"));
        assert!(statements[1].contains("design_name = EXCLUDED.design_name"));
        assert!(!statements[1].contains("design_id = EXCLUDED"));
        assert_eq!(statements.last().map(String::as_str), Some("COMMIT"));

        let params = connection.params.lock().unwrap();
        assert_eq!(params[1][0], SqlParam::Text(Some("2".to_string())));
        assert_eq!(params[1][2], SqlParam::Text(None));
    }

    #[tokio::test]
    async fn test_failed_row_rolls_back_batch() {
        let connection = ScriptedConnection {
            fail_on: Some(2),
            ..Default::default()
        };
        let err = insert_rows(&connection, StarTable::DimDesign, &design())
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("row 2"));
        let statements = connection.statements();
        assert_eq!(statements.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!statements.iter().any(|s| s == "COMMIT"));
    }

    #[tokio::test]
    async fn test_populated_dim_date_is_skipped() {
        let connection = ScriptedConnection {
            existing_rows: true,
            ..Default::default()
        };
        let mut dim_date = Snapshot::new(StarTable::DimDate.columns());
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        dim_date
            .push_row(vec![
                day.into(),
                2024.into(),
                1.into(),
                1.into(),
                1.into(),
                "Monday".into(),
                "January".into(),
                1.into(),
            ])
            .unwrap();

        let inserted = insert_rows(&connection, StarTable::DimDate, &dim_date)
            .await
            .unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(connection.executes(), 0);
        assert_eq!(connection.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_generated_column_is_not_written() {
        let connection = ScriptedConnection::default();
        let mut row: Vec<Value> = vec![Value::Int(1)];
        row.extend(std::iter::repeat_n(Value::Null, 14));
        let fact =
            Snapshot::from_rows(StarTable::FactSalesOrder.columns(), vec![row]).unwrap();

        insert_rows(&connection, StarTable::FactSalesOrder, &fact)
            .await
            .unwrap();

        let insert = &connection.statements()[1];
        assert!(!insert.contains("sales_record_id"));
        assert!(!insert.contains("ON CONFLICT"));
        assert_eq!(connection.params.lock().unwrap()[0].len(), 14);
    }

    #[tokio::test]
    async fn test_unknown_column_writes_nothing() {
        let connection = ScriptedConnection::default();
        let snapshot = Snapshot::new(["design_id", "created_at"]);

        let err = insert_rows(&connection, StarTable::DimDesign, &snapshot)
            .await
            .unwrap_err();

        assert!(matches!(
            find_etl_error(&err),
            Some(EtlError::UnknownColumn { column, .. }) if column == "created_at"
        ));
        assert!(connection.statements().is_empty());
    }

    #[tokio::test]
    async fn test_reset_keeps_dim_date() {
        let connection = ScriptedConnection::default();
        let deleted = reset_warehouse(&connection).await.unwrap();

        assert_eq!(deleted, 6);
        let statements = connection.statements();
        assert!(statements[1].contains("fact_sales_order"));
        assert!(!statements.iter().any(|s| s.contains("dim_date")));
        assert_eq!(statements.last().map(String::as_str), Some("COMMIT"));
    }
}
