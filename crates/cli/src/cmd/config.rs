//! Configuration management command
//!
//! Provides CLI interface to view and edit system configuration.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Every settable key
const KEYS: &[&str] = &[
    "saver.save_interval_ms",
    "saver.backup_interval_ms",
    "saver.backup_enabled",
    "writer.max_attempts",
    "writer.retry_delay_ms",
    "backup.dir",
    "backup.retention_days",
];

fn get_value(config: &SystemConfig, key: &str) -> Result<String> {
    let value = match key {
        "saver.save_interval_ms" => config.saver.save_interval_ms.to_string(),
        "saver.backup_interval_ms" => config.saver.backup_interval_ms.to_string(),
        "saver.backup_enabled" => config.saver.backup_enabled.to_string(),
        "writer.max_attempts" => config.writer.max_attempts.to_string(),
        "writer.retry_delay_ms" => config.writer.retry_delay_ms.to_string(),
        "backup.dir" => config.backup_dir().display().to_string(),
        "backup.retention_days" => config.backup.retention_days.to_string(),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'plotsave config list' to see available keys.",
            key
        ),
    };
    Ok(value)
}

fn set_value(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    const INTEGER: &str = "Invalid value: must be a non-negative integer";
    const BOOL: &str = "Invalid value: must be 'true' or 'false'";

    match key {
        "saver.save_interval_ms" => config.saver.save_interval_ms = value.parse().context(INTEGER)?,
        "saver.backup_interval_ms" => {
            config.saver.backup_interval_ms = value.parse().context(INTEGER)?
        }
        "saver.backup_enabled" => config.saver.backup_enabled = value.parse().context(BOOL)?,
        "writer.max_attempts" => config.writer.max_attempts = value.parse().context(INTEGER)?,
        "writer.retry_delay_ms" => config.writer.retry_delay_ms = value.parse().context(INTEGER)?,
        "backup.dir" => config.backup.dir = (!value.is_empty()).then(|| value.into()),
        "backup.retention_days" => {
            config.backup.retention_days = value.parse().context(INTEGER)?
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'plotsave config list' to see available keys.",
            key
        ),
    }
    Ok(())
}

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "System Configuration".bold());
    println!("{}: {}", "Location".dimmed(), config_path.display().dimmed());

    let mut section = "";
    for &key in KEYS {
        let (group, name) = key.split_once('.').unwrap_or(("", key));
        if group != section {
            println!("\n{}", format!("[{}]", group).yellow());
            section = group;
        }
        println!("  {} = {}", name.cyan(), get_value(&config, key)?);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  save_interval_ms: 100-3,600,000");
    println!("  backup_interval_ms: 1,000-86,400,000");
    println!("  max_attempts: 1-100");
    println!("  retry_delay_ms: 0-60,000");
    println!("  retention_days: 0-3650 (0 = keep forever)");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    set_value(&mut config, key, value)?;

    // Validate before saving
    config.validate().context("Invalid configuration value")?;
    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: running watchers pick up changes after a restart".yellow()
    );
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}
