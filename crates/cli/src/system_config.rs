//! System-wide configuration
//!
//! Stored as TOML at `<config dir>/plotsave/config.toml`, or wherever
//! `PLOTSAVE_CONFIG` points. Missing keys fall back to defaults.

use saver::SaverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use writer::{WriterConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "PLOTSAVE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the config directory")]
    NoConfigDir,

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render config")]
    Render(#[from] toml::ser::Error),

    #[error("{key} must be within {range} (got {value})")]
    OutOfRange {
        key: &'static str,
        range: &'static str,
        value: u64,
    },
}

/// Complete system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub saver: SaverConfig,
    pub writer: WriterSection,
    pub backup: BackupSection,
}

/// Durable writer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSection {
    /// Attempts per save before giving up (default: 10)
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds (default: 500)
    pub retry_delay_ms: u64,
}

impl Default for WriterSection {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
        }
    }
}

/// Backup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSection {
    /// Backup root (default: `<data dir>/plotsave/backups`)
    pub dir: Option<PathBuf>,
    /// Days of backups to keep, 0 keeps everything (default: 30)
    pub retention_days: u32,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            dir: None,
            retention_days: 30,
        }
    }
}

impl SystemConfig {
    /// Check every value against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "saver.save_interval_ms",
            "100-3600000",
            self.saver.save_interval_ms,
            100,
            3_600_000,
        )?;
        check(
            "saver.backup_interval_ms",
            "1000-86400000",
            self.saver.backup_interval_ms,
            1_000,
            86_400_000,
        )?;
        check(
            "writer.max_attempts",
            "1-100",
            u64::from(self.writer.max_attempts),
            1,
            100,
        )?;
        check(
            "writer.retry_delay_ms",
            "0-60000",
            self.writer.retry_delay_ms,
            0,
            60_000,
        )?;
        check(
            "backup.retention_days",
            "0-3650",
            u64::from(self.backup.retention_days),
            0,
            3_650,
        )?;
        Ok(())
    }

    /// Backup root, falling back to the platform data directory
    pub fn backup_dir(&self) -> PathBuf {
        self.backup.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("plotsave")
                .join("backups")
        })
    }

    /// Writer settings with the backup directory guard in place
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            max_attempts: self.writer.max_attempts,
            retry_delay: Duration::from_millis(self.writer.retry_delay_ms),
            backup_dir: Some(self.backup_dir()),
        }
    }
}

fn check(
    key: &'static str,
    range: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { key, range, value })
    }
}

/// Location of the config file
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("plotsave").join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Load the config, using defaults when the file does not exist
pub fn load() -> Result<SystemConfig, ConfigError> {
    load_from(&config_file_path()?)
}

pub fn load_from(path: &Path) -> Result<SystemConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SystemConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: SystemConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Persist the config
pub fn save(config: &SystemConfig) -> Result<(), ConfigError> {
    save_to(&config_file_path()?, config)
}

pub fn save_to(path: &Path, config: &SystemConfig) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a default config file unless one exists
pub fn init_if_missing() -> Result<PathBuf, ConfigError> {
    let path = config_file_path()?;
    if !path.exists() {
        save_to(&path, &SystemConfig::default())?;
    }
    Ok(path)
}

/// Commented example configuration
pub fn example_config() -> String {
    r#"# Plotsave configuration

[saver]
# How often the open document is saved (milliseconds)
save_interval_ms = 10000
# How often a dated backup copy is taken (milliseconds)
backup_interval_ms = 60000
backup_enabled = true

[writer]
# Attempts per save before reporting failure
max_attempts = 10
# Fixed pause between attempts (milliseconds)
retry_delay_ms = 500

[backup]
# dir = "/home/me/plotsave-backups"
# Days of backups to keep (0 = forever)
retention_days = 30
"#
    .to_string()
}
