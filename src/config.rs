//! Stage configuration from environment variables
//!
//! Every stage loads and validates its whole configuration before touching the
//! network. Values are read through a lookup function so tests can supply a
//! map instead of mutating the process environment; `from_env` reads the real
//! environment, which `main` has already seeded from the dotenv file.

use crate::error::EtlError;
use crate::storage::EmptyBucketPolicy;
use crate::transform::DateRange;
use chrono::NaiveDate;
use eyre::Result;
use std::fmt;

pub const DEFAULT_REGION: &str = "eu-west-2";

/// Connection parameters for one Postgres database
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reads variables, treating empty values as unset
struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| {
            EtlError::MissingConfig {
                key: key.to_string(),
            }
            .into()
        })
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.parse::<T>().map_err(|e| {
                EtlError::InvalidConfig {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                }
                .into()
            }),
        }
    }

    fn db(&self, suffix: &str) -> Result<DbConfig> {
        let key = |name: &str| format!("{}{}", name, suffix);
        let port_key = key("DB_PORT");
        let port_text = self.required(&port_key)?;
        let port = port_text.parse::<u16>().map_err(|e| EtlError::InvalidConfig {
            key: port_key.clone(),
            value: port_text.clone(),
            reason: e.to_string(),
        })?;

        Ok(DbConfig {
            host: self.required(&key("DB_HOST"))?,
            port,
            database: self.required(&key("DB"))?,
            user: self.required(&key("DB_USER"))?,
            password: self.required(&key("DB_PASSWORD"))?,
        })
    }

    fn region(&self) -> String {
        self.optional("AWS_REGION")
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    fn date_range(&self) -> Result<DateRange> {
        let start = self.parsed::<NaiveDate>("DIM_DATE_START", DateRange::default().start)?;
        let end = self.parsed::<NaiveDate>("DIM_DATE_END", DateRange::default().end)?;
        DateRange::new(start, end).map_err(|reason| {
            EtlError::InvalidConfig {
                key: "DIM_DATE_END".to_string(),
                value: end.to_string(),
                reason,
            }
            .into()
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Settings for the ingest stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub source_db: DbConfig,
    pub ingest_bucket: String,
    pub timestamp_bucket: String,
    pub region: String,
}

impl IngestConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { lookup };
        Ok(Self {
            source_db: vars.db("")?,
            ingest_bucket: vars.required("INGESTED_DATA_BUCKET")?,
            timestamp_bucket: vars.required("TIMESTAMP_BUCKET")?,
            region: vars.region(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }
}

/// Settings for the transform stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    pub ingest_bucket: String,
    pub processed_bucket: String,
    pub region: String,
    pub dim_dates: DateRange,
    pub empty_bucket_policy: EmptyBucketPolicy,
}

impl TransformConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { lookup };
        Ok(Self {
            ingest_bucket: vars.required("INGESTED_DATA_BUCKET")?,
            processed_bucket: vars.required("PROCESSED_DATA_BUCKET")?,
            region: vars.region(),
            dim_dates: vars.date_range()?,
            empty_bucket_policy: vars.parsed("EMPTY_BUCKET_POLICY", EmptyBucketPolicy::default())?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }
}

/// Settings for the load stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    pub warehouse_db: DbConfig,
    pub processed_bucket: String,
    pub region: String,
    pub empty_bucket_policy: EmptyBucketPolicy,
}

impl LoadConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { lookup };
        Ok(Self {
            warehouse_db: vars.db("_DW")?,
            processed_bucket: vars.required("PROCESSED_DATA_BUCKET")?,
            region: vars.region(),
            empty_bucket_policy: vars.parsed("EMPTY_BUCKET_POLICY", EmptyBucketPolicy::default())?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }
}

/// Warehouse connection alone, for maintenance commands
pub fn warehouse_db_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<DbConfig> {
    Vars { lookup }.db("_DW")
}

pub fn warehouse_db_from_env() -> Result<DbConfig> {
    warehouse_db_from_lookup(env_lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_etl_error;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const SOURCE: &[(&str, &str)] = &[
        ("DB_HOST", "localhost"),
        ("DB_PORT", "5432"),
        ("DB", "totesys"),
        ("DB_USER", "etl"),
        ("DB_PASSWORD", "secret"),
        ("INGESTED_DATA_BUCKET", "ingested"),
        ("TIMESTAMP_BUCKET", "timestamps"),
    ];

    #[test]
    fn test_ingest_config() {
        let config = IngestConfig::from_lookup(vars(SOURCE)).unwrap();
        assert_eq!(config.source_db.port, 5432);
        assert_eq!(config.source_db.database, "totesys");
        assert_eq!(config.region, DEFAULT_REGION);
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_missing_and_empty_values() {
        let mut pairs = SOURCE.to_vec();
        pairs.retain(|(k, _)| *k != "DB_USER");
        let err = IngestConfig::from_lookup(vars(&pairs)).unwrap_err();
        assert_eq!(
            find_etl_error(&err),
            Some(&EtlError::MissingConfig {
                key: "DB_USER".to_string()
            })
        );

        pairs.push(("DB_USER", "  "));
        let err = IngestConfig::from_lookup(vars(&pairs)).unwrap_err();
        assert!(matches!(find_etl_error(&err), Some(EtlError::MissingConfig { .. })));
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = SOURCE.to_vec();
        pairs.retain(|(k, _)| *k != "DB_PORT");
        pairs.push(("DB_PORT", "postgres"));
        let err = IngestConfig::from_lookup(vars(&pairs)).unwrap_err();
        assert!(matches!(
            find_etl_error(&err),
            Some(EtlError::InvalidConfig { key, .. }) if key == "DB_PORT"
        ));
    }

    #[test]
    fn test_transform_config_defaults_and_overrides() {
        let base = [
            ("INGESTED_DATA_BUCKET", "ingested"),
            ("PROCESSED_DATA_BUCKET", "processed"),
        ];
        let config = TransformConfig::from_lookup(vars(&base)).unwrap();
        assert_eq!(config.dim_dates, DateRange::default());
        assert_eq!(config.empty_bucket_policy, EmptyBucketPolicy::Error);

        let mut pairs = base.to_vec();
        pairs.push(("DIM_DATE_END", "2125-12-31"));
        pairs.push(("EMPTY_BUCKET_POLICY", "empty"));
        let config = TransformConfig::from_lookup(vars(&pairs)).unwrap();
        assert_eq!(
            config.dim_dates.end,
            NaiveDate::from_ymd_opt(2125, 12, 31).unwrap()
        );
        assert_eq!(config.empty_bucket_policy, EmptyBucketPolicy::Empty);
    }

    #[test]
    fn test_reversed_date_range_is_invalid() {
        let pairs = [
            ("INGESTED_DATA_BUCKET", "ingested"),
            ("PROCESSED_DATA_BUCKET", "processed"),
            ("DIM_DATE_END", "2019-12-31"),
        ];
        let err = TransformConfig::from_lookup(vars(&pairs)).unwrap_err();
        assert!(matches!(
            find_etl_error(&err),
            Some(EtlError::InvalidConfig { key, .. }) if key == "DIM_DATE_END"
        ));
    }

    #[test]
    fn test_load_config_uses_warehouse_variables() {
        let pairs = [
            ("DB_HOST_DW", "warehouse.internal"),
            ("DB_PORT_DW", "5433"),
            ("DB_DW", "dw"),
            ("DB_USER_DW", "loader"),
            ("DB_PASSWORD_DW", "secret"),
            ("PROCESSED_DATA_BUCKET", "processed"),
            ("AWS_REGION", "us-east-1"),
        ];
        let config = LoadConfig::from_lookup(vars(&pairs)).unwrap();
        assert_eq!(config.warehouse_db.host, "warehouse.internal");
        assert_eq!(config.warehouse_db.port, 5433);
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    #[serial]
    fn test_from_env_after_dotenv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DB_HOST_DW=dotenv-host").unwrap();
        writeln!(file, "DB_PORT_DW=6543").unwrap();
        writeln!(file, "DB_DW=dw").unwrap();
        writeln!(file, "DB_USER_DW=loader").unwrap();
        writeln!(file, "DB_PASSWORD_DW=secret").unwrap();

        dotenvy::from_path_override(file.path()).unwrap();
        let db = warehouse_db_from_env().unwrap();
        assert_eq!(db.host, "dotenv-host");
        assert_eq!(db.port, 6543);
    }
}
