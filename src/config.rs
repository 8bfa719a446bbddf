//! Run configuration resolved once at process start.
//!
//! [`IngestConfig`] combines the parsed command line with the environment
//! (`CSV_PATH` and the `DB_*` connection variables). Environment access goes
//! through a lookup closure so resolution never reads ambient state directly.

use std::path::PathBuf;

use encoding_rs::Encoding;

use crate::{
    cli::{Backend, Cli, Separator},
    io_utils,
};

pub const ENV_CSV_PATH: &str = "CSV_PATH";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";

/// Source path used when neither `--csv` nor `CSV_PATH` is given.
pub const DEFAULT_CSV_PATH: &str = "data/books.csv";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("Invalid {name} value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// PostgreSQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl PostgresConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let port_raw = get(ENV_DB_PORT, "5432");
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                name: ENV_DB_PORT,
                value: port_raw.clone(),
            })?;
        Ok(Self {
            dbname: get(ENV_DB_NAME, "bookstore"),
            user: get(ENV_DB_USER, "postgres"),
            password: get(ENV_DB_PASSWORD, "postgres"),
            host: get(ENV_DB_HOST, "localhost"),
            port,
        })
    }

    /// Connection target with the password masked, for log output.
    pub fn describe(&self) -> String {
        format!(
            "postgresql://{}:****@{}:{}/{}",
            self.user, self.host, self.port, self.dbname
        )
    }
}

impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgres(PostgresConfig),
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub csv_path: PathBuf,
    pub separator: Separator,
    pub encoding_label: String,
    pub encoding: &'static Encoding,
    pub store: StoreConfig,
}

impl IngestConfig {
    pub fn from_env(cli: Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    pub fn resolve<F>(cli: Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let csv_path = cli
            .csv
            .or_else(|| {
                lookup(ENV_CSV_PATH)
                    .filter(|value| !value.trim().is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH));
        let encoding = io_utils::resolve_encoding(&cli.encoding)?;
        let store = match cli.backend {
            Backend::Postgres => StoreConfig::Postgres(PostgresConfig::from_lookup(&lookup)?),
            Backend::Sqlite => StoreConfig::Sqlite {
                path: cli.sqlite_path,
            },
        };
        Ok(Self {
            csv_path,
            separator: cli.sep,
            encoding_label: cli.encoding,
            encoding,
            store,
        })
    }
}
