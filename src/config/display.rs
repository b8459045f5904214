use anyhow::{Context, Result, bail};
use console::style;
use std::path::Path;

use super::Config;

/// Print the effective configuration with the password masked.
#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Database Settings:").bold().yellow());
    eprintln!("  URL: {}", style(config.database.redacted_url()).cyan());
    match config.database.resolve_driver() {
        Ok(driver) => eprintln!("  Driver: {}", style(driver).cyan()),
        Err(e) => eprintln!("  Driver: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Username: {}", style(&config.database.username).cyan());
    let password = if config.database.password.is_empty() {
        "(empty)"
    } else {
        "********"
    };
    eprintln!("  Password: {}", style(password).cyan());
    eprintln!(
        "  Character Encoding: {}",
        style(
            config
                .database
                .character_encoding
                .as_deref()
                .unwrap_or("(driver default)")
        )
        .cyan()
    );
    eprintln!(
        "  Max Connections: {}",
        style(config.database.max_connections).cyan()
    );
    eprintln!(
        "  Acquire Timeout: {}s",
        style(config.database.acquire_timeout_secs).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Health Check:").bold().yellow());
    eprintln!(
        "  Interval: {}s",
        style(config.health_check.interval_secs).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Tables:").bold().yellow());
    eprintln!("  Players: {}", style(&config.tables.players).cyan());
    eprintln!("  Supplies: {}", style(&config.tables.supplies).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Write a default configuration file, refusing to overwrite an existing one.
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config = Config {
        base_dir: config_dir.to_path_buf(),
        ..Config::default()
    };

    let config_path = config.config_file_path();
    if config_path.exists() {
        bail!("Config file already exists: {}", config_path.display());
    }

    config.save().context("Failed to save configuration")?;
    eprintln!("{}", style("✓ Default configuration written").green());
    eprintln!(
        "Edit {} to point at your database.",
        style(config_path.display()).cyan()
    );

    Ok(())
}
