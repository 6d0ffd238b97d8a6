use std::{collections::HashMap, fs::File, path::Path};

use regex::Regex;
use serde::Deserialize;

use crate::errors::{Error, Result};

const DEFAULT_FETCH_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";
const DEFAULT_FETCH_DATASET: &str = "yellow_tripdata";

/// Process-wide settings, read once at startup and handed to each stage.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub use_local: bool,
    #[serde(default)]
    pub azure_storage_connection_string: Option<String>,
    #[serde(default = "default_sql_dir")]
    pub sql_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WarehouseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub dataset: String,
    pub months: Vec<String>,
}

fn default_sql_dir() -> String {
    "sql".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            use_local: false,
            azure_storage_connection_string: None,
            sql_dir: default_sql_dir(),
            log_level: default_log_level(),
            warehouse: WarehouseConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        WarehouseConfig {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "nyc_taxi".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: DEFAULT_FETCH_BASE_URL.to_string(),
            dataset: DEFAULT_FETCH_DATASET.to_string(),
            months: Vec::new(),
        }
    }
}

impl Config {
    /// Builds the configuration from an environment snapshot.
    pub fn from_vars<I>(vars: I) -> Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).cloned();

        let mut config = Config::default();
        config.use_local = get("USE_LOCAL")
            .map(|value| value.to_lowercase() == "true")
            .unwrap_or(false);
        config.azure_storage_connection_string = get("AZURE_STORAGE_CONNECTION_STRING");
        if let Some(sql_dir) = get("SQL_DIR") {
            config.sql_dir = sql_dir;
        }
        if let Some(log_level) = get("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(host) = get("POSTGRES_HOST") {
            config.warehouse.host = host;
        }
        if let Some(port) = get("POSTGRES_PORT") {
            config.warehouse.port = port
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("POSTGRES_PORT is not a port number: {port:?}")))?;
        }
        if let Some(dbname) = get("POSTGRES_DB") {
            config.warehouse.dbname = dbname;
        }
        if let Some(user) = get("POSTGRES_USER") {
            config.warehouse.user = user;
        }
        if let Some(password) = get("POSTGRES_PASSWORD") {
            config.warehouse.password = password;
        }

        if let Some(base_url) = get("FETCH_BASE_URL") {
            config.fetch.base_url = base_url;
        }
        if let Some(dataset) = get("FETCH_DATASET") {
            config.fetch.dataset = dataset;
        }
        if let Some(months) = get("FETCH_MONTHS") {
            config.fetch.months = months
                .split(',')
                .map(str::trim)
                .filter(|month| !month.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Config> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let month_re = Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$")?;
        for month in &self.fetch.months {
            if !month_re.is_match(month) {
                return Err(Error::config(format!("fetch month must look like YYYY-MM: {month:?}")));
            }
        }
        Ok(())
    }

    /// Accepts a missing `.env` file; anything else wrong with it is a configuration error.
    pub fn check_dotenv<T>(result: dotenvy::Result<T>) -> Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.not_found() => Ok(()),
            Err(err) => Err(Error::config(format!("cannot load .env: {err}"))),
        }
    }

    pub fn has_cloud_credentials(&self) -> bool {
        self.azure_storage_connection_string.is_some()
    }
}

impl WarehouseConfig {
    /// libpq keyword/value connection string, usable by both the Postgres client and DuckDB's
    /// `ATTACH ... (TYPE POSTGRES)`.
    pub fn connection_string(&self) -> String {
        let port = self.port.to_string();
        [
            ("host", self.host.as_str()),
            ("port", port.as_str()),
            ("dbname", self.dbname.as_str()),
            ("user", self.user.as_str()),
            ("password", self.password.as_str()),
        ]
        .iter()
        .filter(|(key, value)| *key != "password" || !value.is_empty())
        .map(|(key, value)| format!("{key}={}", quote_conninfo_value(value)))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

fn quote_conninfo_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
