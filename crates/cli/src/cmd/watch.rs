//! Foreground autosave loop
//!
//! Mirrors a JSON source file into memory and lets the saver persist it
//! to the target file and the backup store until Ctrl-C.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use plotsave_core::{Snapshot, SystemKeys};
use saver::{FnPersist, JobKind, Notifier, Saver, StateSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use writer::{BackupStore, DurableWriter, TokioFs};

/// How often the source file is re-read
const SOURCE_POLL: Duration = Duration::from_millis(250);

/// Overrides taken from the command line
pub struct WatchArgs {
    pub source: PathBuf,
    pub target: PathBuf,
    pub backup_dir: Option<PathBuf>,
    pub save_interval_ms: Option<u64>,
    pub backup_interval_ms: Option<u64>,
    pub no_backup: bool,
}

impl WatchArgs {
    fn apply(&self, config: &mut SystemConfig) {
        if let Some(dir) = &self.backup_dir {
            config.backup.dir = Some(dir.clone());
        }
        if let Some(ms) = self.save_interval_ms {
            config.saver.save_interval_ms = ms;
        }
        if let Some(ms) = self.backup_interval_ms {
            config.saver.backup_interval_ms = ms;
        }
        if self.no_backup {
            config.saver.backup_enabled = false;
        }
    }
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let mut config = system_config::load()?;
    args.apply(&mut config);
    config.validate().context("Invalid option")?;

    let mirror = SourceMirror::load(&args.source).await?;
    let refresher = mirror.spawn_refresh(SOURCE_POLL);

    let writer = DurableWriter::new(config.writer_config());
    let store = Arc::new(
        BackupStore::new(
            Arc::new(TokioFs),
            config.backup_dir(),
            config.backup.retention_days,
        )
        .with_writer_config(config.writer_config()),
    );
    match store.prune(Local::now().date_naive()).await {
        Ok(removed) if !removed.is_empty() => info!("Pruned {} old backup days", removed.len()),
        Ok(_) => {}
        Err(e) => warn!("Backup pruning failed: {}", e),
    }

    let system_keys = SystemKeys::default();
    let save = {
        let writer = writer.clone();
        let target = args.target.clone();
        let system_keys = system_keys.clone();
        FnPersist(move |snapshot: Snapshot| {
            let writer = writer.clone();
            let target = target.clone();
            let document = snapshot.persistable(&system_keys);
            async move {
                writer
                    .save_document(&target, &document)
                    .await
                    .with_context(|| format!("Failed to save {}", target.display()))
            }
        })
    };
    let backup = {
        let store = store.clone();
        let target = args.target.clone();
        let system_keys = system_keys.clone();
        FnPersist(move |snapshot: Snapshot| {
            let store = store.clone();
            let target = target.clone();
            let payload = snapshot.to_json_bytes(&system_keys);
            async move {
                store
                    .save_backup(&target, &payload?)
                    .await
                    .with_context(|| format!("Failed to back up {}", target.display()))?;
                Ok::<(), anyhow::Error>(())
            }
        })
    };

    let mut saver = Saver::new(
        mirror.clone(),
        Arc::new(save),
        Arc::new(backup),
        config.saver.clone(),
    )
    .with_notifier(Arc::new(TerminalNotifier))
    .with_system_keys(system_keys);
    saver.start();

    println!(
        "{} Watching {} → {}",
        "●".green(),
        args.source.display().cyan(),
        args.target.display().cyan()
    );
    println!("{}", "Press Ctrl-C to stop".dimmed());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    saver.stop();
    refresher.abort();

    // Let saves and backups that already started finish their attempts
    let drain = Duration::from_millis(config.writer.retry_delay_ms) * config.writer.max_attempts
        + Duration::from_secs(1);
    if tokio::time::timeout(drain, saver.drain()).await.is_err() {
        warn!("Gave up waiting for {} pending saves", saver.pending());
    }

    let status = saver.job_status(JobKind::Save);
    println!(
        "{} Stopped after {} saves ({} failed)",
        "●".yellow(),
        status.successes,
        status.failures
    );
    Ok(())
}

/// In-memory copy of the last well-formed contents of a JSON file
pub struct SourceMirror {
    path: PathBuf,
    latest: Mutex<Snapshot>,
    raw: Mutex<Vec<u8>>,
}

impl SourceMirror {
    /// Read the source once; it must exist and parse
    pub async fn load(path: &Path) -> Result<Arc<Self>> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_slice(&raw)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            latest: Mutex::new(Snapshot::new(value)),
            raw: Mutex::new(raw),
        }))
    }

    /// Re-read the source, returning whether a new snapshot was taken
    ///
    /// Unreadable or half-written contents keep the previous snapshot.
    pub async fn refresh(&self) -> bool {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Source {} unreadable: {}", self.path.display(), e);
                return false;
            }
        };
        if *self.raw.lock() == raw {
            return false;
        }

        match serde_json::from_slice(&raw) {
            Ok(value) => {
                *self.latest.lock() = Snapshot::new(value);
                *self.raw.lock() = raw;
                debug!("Source {} changed", self.path.display());
                true
            }
            Err(e) => {
                debug!("Source {} not parseable yet: {}", self.path.display(), e);
                false
            }
        }
    }

    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let mirror = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                mirror.refresh().await;
            }
        })
    }
}

impl StateSource for SourceMirror {
    fn snapshot(&self) -> Snapshot {
        self.latest.lock().clone()
    }
}

/// Prints save notices to the terminal
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn save_recovered(&self) {
        println!("{} Saving works again", "✓".green());
    }

    fn save_failed(&self, title: &str, body: &str) {
        eprintln!("{} {}", "✗".red(), title.red().bold());
        eprintln!("  {}", body);
    }
}
