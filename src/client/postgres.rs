//! Postgres-backed [`Connector`] for the source database and the warehouse

use crate::config::DbConfig;
use crate::db::{Connection, Connector, SqlParam};
use crate::snapshot::{Snapshot, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use eyre::{Context, Result};
use pg_escape::quote_identifier;
use tokio::task::JoinHandle;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Column, NoTls, Row};

/// Opens plain-TCP sessions from a [`DbConfig`]
#[derive(Clone, Debug)]
pub struct PgConnector {
    config: DbConfig,
}

impl PgConnector {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }
}

impl Connector for PgConnector {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection> {
        let c = &self.config;
        let mut pg = tokio_postgres::Config::new();
        pg.host(&c.host)
            .port(c.port)
            .dbname(&c.database)
            .user(&c.user)
            .password(&c.password);

        let (client, connection) = pg.connect(NoTls).await.with_context(|| {
            format!(
                "Failed to connect to database {} at {}:{}",
                c.database, c.host, c.port
            )
        })?;

        let endpoint = format!("{}:{}", c.host, c.port);
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("Postgres connection error ({}): {}", endpoint, e);
            }
        });

        log::debug!("Connected to database {} at {}:{}", c.database, c.host, c.port);
        Ok(PgConnection { client, driver })
    }
}

/// Session whose background driver task is joined on [`Connection::close`]
pub struct PgConnection {
    client: Client,
    driver: JoinHandle<()>,
}

fn param_type(param: &SqlParam) -> Type {
    match param {
        SqlParam::Text(_) => Type::TEXT,
        SqlParam::Int(_) => Type::INT8,
        SqlParam::Timestamp(_) => Type::TIMESTAMP,
    }
}

fn as_tosql(param: &SqlParam) -> &(dyn ToSql + Sync) {
    match param {
        SqlParam::Text(v) => v,
        SqlParam::Int(v) => v,
        SqlParam::Timestamp(v) => v,
    }
}

impl PgConnection {
    async fn prepare(&self, sql: &str, params: &[SqlParam]) -> Result<tokio_postgres::Statement> {
        let types: Vec<Type> = params.iter().map(param_type).collect();
        self.client
            .prepare_typed(sql, &types)
            .await
            .with_context(|| format!("Failed to prepare statement: {}", sql))
    }
}

impl Connection for PgConnection {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Snapshot> {
        let mut statement = self.prepare(sql, params).await?;
        let type_names: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.type_().name().to_string())
            .collect();
        if type_names.iter().any(|t| needs_text_cast(t)) {
            let cast_sql = text_cast_sql(sql, statement.columns());
            statement = self.prepare(&cast_sql, params).await?;
        }

        let values: Vec<&(dyn ToSql + Sync)> = params.iter().map(as_tosql).collect();
        let rows = self
            .client
            .query(&statement, &values)
            .await
            .with_context(|| format!("Failed to run query: {}", sql))?;

        let columns = statement.columns();
        let mut snapshot = Snapshot::new(columns.iter().map(|c| c.name().to_string()));
        for row in &rows {
            snapshot.push_row(decode_row(row, columns, &type_names)?)?;
        }
        Ok(snapshot)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let statement = self.prepare(sql, params).await?;
        let values: Vec<&(dyn ToSql + Sync)> = params.iter().map(as_tosql).collect();
        self.client
            .execute(&statement, &values)
            .await
            .with_context(|| format!("Failed to execute statement: {}", sql))
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        self.client
            .batch_execute(sql)
            .await
            .with_context(|| format!("Failed to execute: {}", sql))
    }

    async fn close(self) -> Result<()> {
        // Dropping the client ends the connection future
        drop(self.client);
        self.driver
            .await
            .context("Postgres connection task failed")?;
        log::debug!("Database connection closed");
        Ok(())
    }
}

/// Whether values of a column type are read as their `::text` form
///
/// Everything without a native decoding here, `numeric` included, is cast in
/// SQL so the text Postgres prints is kept exactly.
fn needs_text_cast(type_name: &str) -> bool {
    !matches!(
        type_name,
        "bool"
            | "int2"
            | "int4"
            | "int8"
            | "float4"
            | "float8"
            | "text"
            | "varchar"
            | "bpchar"
            | "name"
            | "date"
            | "time"
            | "timestamp"
            | "timestamptz"
    )
}

/// Wrap `sql` so every column that needs it is selected as `::text`
fn text_cast_sql(sql: &str, columns: &[Column]) -> String {
    let projection: Vec<String> = columns
        .iter()
        .map(|c| {
            let ident = quote_identifier(c.name());
            match needs_text_cast(c.type_().name()) {
                true => format!("q.{ident}::text AS {ident}"),
                false => format!("q.{ident}"),
            }
        })
        .collect();
    format!("SELECT {} FROM ({}) AS q", projection.join(", "), sql)
}

fn decode_row(row: &Row, columns: &[Column], type_names: &[String]) -> Result<Vec<Value>> {
    columns
        .iter()
        .zip(type_names)
        .enumerate()
        .map(|(idx, (column, type_name))| decode_value(row, idx, column.name(), type_name))
        .collect()
}

/// Decode one cell; `type_name` is the column type before any text cast
fn decode_value(row: &Row, idx: usize, name: &str, type_name: &str) -> Result<Value> {
    let context = || format!("Failed to decode column '{}'", name);

    let value = match type_name {
        "bool" => row.try_get::<_, Option<bool>>(idx).with_context(context)?.into(),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .with_context(context)?
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int4" => row.try_get::<_, Option<i32>>(idx).with_context(context)?.into(),
        "int8" => row.try_get::<_, Option<i64>>(idx).with_context(context)?.into(),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .with_context(context)?
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),
        "float8" => row.try_get::<_, Option<f64>>(idx).with_context(context)?.into(),
        "date" => row.try_get::<_, Option<NaiveDate>>(idx).with_context(context)?.into(),
        "time" => row.try_get::<_, Option<NaiveTime>>(idx).with_context(context)?.into(),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .with_context(context)?
            .into(),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .with_context(context)?
            .map(|ts| Value::Timestamp(ts.naive_utc()))
            .unwrap_or(Value::Null),
        "numeric" => row
            .try_get::<_, Option<String>>(idx)
            .with_context(context)?
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        // Text-like columns and everything read through a text cast
        _ => row.try_get::<_, Option<String>>(idx).with_context(context)?.into(),
    };
    Ok(value)
}
