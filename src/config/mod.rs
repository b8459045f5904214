// Configuration management module
// TOML settings for the database connection, health check and table names

pub mod display;
pub mod settings;


pub use display::{init_config, show_config};
pub use settings::{
    Config, ConfigError, DatabaseConfig, DatabaseDriver, HealthCheckConfig, TableConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
