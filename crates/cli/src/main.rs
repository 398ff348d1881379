//! Plotsave CLI - plotsave command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod logging;
mod system_config;
mod util;

/// Plotsave - periodic autosave with verified, durable writes
#[derive(Parser)]
#[command(name = "plotsave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a document and durably write it to a target file
    Save {
        /// File to write
        target: PathBuf,
        /// JSON document to save
        #[arg(long)]
        from: PathBuf,
    },
    /// Check that a saved file parses and carries every required key
    Verify {
        /// File to check
        path: PathBuf,
    },
    /// Autosave a changing source document into a target file
    Watch {
        /// JSON document to mirror (re-read on every change)
        #[arg(long)]
        source: PathBuf,
        /// File the document is saved to
        #[arg(long)]
        target: PathBuf,
        /// Backup root (default: from config)
        #[arg(long)]
        backup_dir: Option<PathBuf>,
        /// Save interval in milliseconds (default: from config)
        #[arg(long)]
        save_interval_ms: Option<u64>,
        /// Backup interval in milliseconds (default: from config)
        #[arg(long)]
        backup_interval_ms: Option<u64>,
        /// Disable periodic backups
        #[arg(long)]
        no_backup: bool,
        /// Write logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Inspect or prune dated backups
    #[command(subcommand)]
    Backups(BackupCommands),
    /// View or edit the configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List backup days, newest first
    List {
        /// Backup root (default: from config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete backup days older than the retention window
    Prune {
        /// Backup root (default: from config)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Retention in days (default: from config)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one value
    Get {
        /// Key such as saver.save_interval_ms
        key: String,
    },
    /// Change one value
    Set { key: String, value: String },
    /// Show the config file location
    Path {
        /// Create the file with defaults if it does not exist
        #[arg(long)]
        create: bool,
    },
    /// Print a commented example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Watch { log_file, .. } => log_file.as_deref(),
        _ => None,
    };
    let _guard = logging::init(log_file)?;

    match cli.command {
        Commands::Save { target, from } => cmd::save::run(&target, &from).await,
        Commands::Verify { path } => cmd::verify::run(&path).await,
        Commands::Watch {
            source,
            target,
            backup_dir,
            save_interval_ms,
            backup_interval_ms,
            no_backup,
            log_file: _,
        } => {
            cmd::watch::run(cmd::watch::WatchArgs {
                source,
                target,
                backup_dir,
                save_interval_ms,
                backup_interval_ms,
                no_backup,
            })
            .await
        }
        Commands::Backups(backup_cmd) => match backup_cmd {
            BackupCommands::List { dir } => cmd::backups::run_list(dir).await,
            BackupCommands::Prune { dir, days } => cmd::backups::run_prune(dir, days).await,
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
