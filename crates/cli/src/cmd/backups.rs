//! Backup inspection and pruning

use crate::system_config;
use crate::util;
use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use writer::{BackupStore, TokioFs};

fn open_store(dir: Option<PathBuf>, days: Option<u32>) -> Result<BackupStore> {
    let config = system_config::load()?;
    let root = dir.unwrap_or_else(|| config.backup_dir());
    let retention = days.unwrap_or(config.backup.retention_days);
    Ok(BackupStore::new(Arc::new(TokioFs), root, retention))
}

/// List backup days, newest first
pub async fn run_list(dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(dir, None)?;
    let days = store.list().await.context("Failed to list backups")?;

    println!("{}", "Backups".bold());
    println!("{}: {}\n", "Location".dimmed(), store.root().display().dimmed());

    if days.is_empty() {
        println!("{}", "No backups yet".dimmed());
        return Ok(());
    }

    for day in &days {
        println!(
            "{} {} {}",
            day.date.to_string().yellow(),
            format!("{} files", day.files.len()).cyan(),
            util::format_size(util::dir_size(&day.dir)).dimmed()
        );
        for file in &day.files {
            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let age = std::fs::metadata(file)
                .and_then(|meta| meta.modified())
                .map(util::format_relative_time)
                .unwrap_or_default();
            println!("  {} {}", name, age.dimmed());
        }
    }

    Ok(())
}

/// Delete backup days older than the retention window
pub async fn run_prune(dir: Option<PathBuf>, days: Option<u32>) -> Result<()> {
    let store = open_store(dir, days)?;
    if store.retention_days() == 0 {
        println!("{}", "Retention is 0 (keep forever), nothing to prune".yellow());
        return Ok(());
    }

    let removed = store
        .prune(Local::now().date_naive())
        .await
        .context("Failed to prune backups")?;

    for dir in &removed {
        println!("  {} {}", "removed".red(), dir.display());
    }
    println!(
        "{} Pruned {} backup days older than {} days",
        "✓".green(),
        removed.len(),
        store.retention_days()
    );
    Ok(())
}
