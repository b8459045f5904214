
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub tables: TableConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Driver name; inferred from the URL scheme when absent
    pub driver: Option<String>,
    /// Appended to MySQL connection URLs as `charset=<value>`
    pub character_encoding: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mysql://localhost:3306/minecraft".to_string(),
            username: "root".to_string(),
            password: String::new(),
            driver: None,
            character_encoding: None,
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    pub players: String,
    pub supplies: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            players: "authme".to_string(),
            supplies: "supplies".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDriver {
    MySql,
    Sqlite,
}

impl DatabaseDriver {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatabaseDriver {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DatabaseDriver::MySql => write!(f, "mysql"),
            DatabaseDriver::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Unsupported database driver: {0} (expected 'mysql', 'mariadb' or 'sqlite')")]
    UnsupportedDriver(String),
    #[error("Driver '{driver}' does not match database URL scheme '{scheme}'")]
    DriverMismatch { driver: String, scheme: String },
    #[error("Invalid max connections: {0} (must be between 1 and 100)")]
    InvalidMaxConnections(u32),
    #[error("Invalid acquire timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidAcquireTimeout(u64),
    #[error("Invalid health check interval: {0} (must be between 1 and 3600 seconds)")]
    InvalidHealthCheckInterval(u64),
    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),
    #[error("Invalid character encoding: '{0}'")]
    InvalidCharacterEncoding(String),
}

impl Config {
    /// Default configuration directory, `~/.mcp-gateway`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".mcp-gateway"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("mcp-gateway"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.health_check.validate()?;
        self.tables.validate()?;
        Ok(())
    }
}

impl DatabaseConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connect_url()?;

        if !(1..=100).contains(&self.max_connections) {
            return Err(ConfigError::InvalidMaxConnections(self.max_connections));
        }

        if !(1..=300).contains(&self.acquire_timeout_secs) {
            return Err(ConfigError::InvalidAcquireTimeout(self.acquire_timeout_secs));
        }

        self.mysql_charset()?;

        Ok(())
    }

    /// MySQL character set for `character_encoding`. Java style names such
    /// as `UTF-8` resolve to the MySQL equivalent.
    #[inline]
    pub fn mysql_charset(&self) -> Result<Option<&'static str>, ConfigError> {
        let Some(encoding) = &self.character_encoding else {
            return Ok(None);
        };

        let normalized: String = encoding
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let charset = match normalized.as_str() {
            "utf8" | "utf8mb4" => "utf8mb4",
            "utf8mb3" => "utf8mb3",
            "latin1" | "iso88591" | "cp1252" | "windows1252" => "latin1",
            "ascii" | "usascii" => "ascii",
            "gbk" => "gbk",
            "gb2312" => "gb2312",
            "gb18030" => "gb18030",
            "big5" => "big5",
            "sjis" | "shiftjis" => "sjis",
            "ujis" | "eucjp" => "ujis",
            "euckr" => "euckr",
            "binary" => "binary",
            _ => return Err(ConfigError::InvalidCharacterEncoding(encoding.clone())),
        };

        Ok(Some(charset))
    }

    /// Resolve the driver from the explicit `driver` option or the URL scheme.
    #[inline]
    pub fn resolve_driver(&self) -> Result<DatabaseDriver, ConfigError> {
        let scheme = self
            .url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
            .ok_or_else(|| ConfigError::InvalidDatabaseUrl(self.url.clone()))?;

        let from_scheme = DatabaseDriver::from_name(scheme);

        match self.driver.as_deref() {
            None => from_scheme.ok_or_else(|| ConfigError::UnsupportedDriver(scheme.to_string())),
            Some(name) => {
                let driver = DatabaseDriver::from_name(name)
                    .ok_or_else(|| ConfigError::UnsupportedDriver(name.to_string()))?;
                if from_scheme == Some(driver) {
                    Ok(driver)
                } else {
                    Err(ConfigError::DriverMismatch {
                        driver: name.to_string(),
                        scheme: scheme.to_string(),
                    })
                }
            }
        }
    }

    /// Build the URL handed to sqlx: credentials and charset are folded into
    /// MySQL URLs, SQLite URLs pass through untouched.
    #[inline]
    pub fn connect_url(&self) -> Result<String, ConfigError> {
        if self.resolve_driver()? == DatabaseDriver::Sqlite {
            return Ok(self.url.clone());
        }

        let mut url = Url::parse(&self.url)
            .map_err(|e| ConfigError::InvalidDatabaseUrl(format!("{}: {}", self.url, e)))?;

        if !self.username.is_empty() && url.username().is_empty() {
            url.set_username(&self.username)
                .map_err(|()| ConfigError::InvalidDatabaseUrl(self.url.clone()))?;
        }

        if !self.password.is_empty() && url.password().is_none() {
            url.set_password(Some(&self.password))
                .map_err(|()| ConfigError::InvalidDatabaseUrl(self.url.clone()))?;
        }

        if let Some(charset) = self.mysql_charset()? {
            url.query_pairs_mut().append_pair("charset", charset);
        }

        Ok(url.into())
    }

    /// Connect URL with the password replaced, safe for logs.
    #[inline]
    pub fn redacted_url(&self) -> String {
        match self.connect_url() {
            Ok(raw) => match Url::parse(&raw) {
                Ok(mut url) if url.password().is_some() => {
                    let _ = url.set_password(Some("********"));
                    url.into()
                }
                _ => raw,
            },
            Err(_) => self.url.clone(),
        }
    }

    #[inline]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl HealthCheckConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3600).contains(&self.interval_secs) {
            return Err(ConfigError::InvalidHealthCheckInterval(self.interval_secs));
        }
        Ok(())
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl TableConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in [&self.players, &self.supplies] {
            if !is_valid_table_name(name) {
                return Err(ConfigError::InvalidTableName(name.clone()));
            }
        }
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only `ident` or `schema.ident`
/// made of ASCII alphanumerics and underscores are accepted.
fn is_valid_table_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() <= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
