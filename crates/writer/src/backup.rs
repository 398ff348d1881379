//! Dated backup copies and their retention
//!
//! Layout under the backup root:
//! ```text
//! backups/
//!   2024_03_18/
//!     (start-session)-novel.pltr   first backup of this process session
//!     novel.pltr                   overwritten by every later backup
//!   2024_03_19/
//!     ...
//! ```

use crate::durable::{DurableWriter, WriterConfig};
use crate::error::{Result, WriteError};
use crate::fs::FileSystem;
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Folder name format for one day of backups
pub const DAY_FORMAT: &str = "%Y_%m_%d";

/// File name prefix of a session's first backup
pub const SESSION_PREFIX: &str = "(start-session)-";

/// Backups taken on one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDay {
    pub date: NaiveDate,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Writes backup copies into per-day folders
///
/// Copies go through a [`DurableWriter`], so they are verified and
/// overlapping backups of the same file land in order.
pub struct BackupStore {
    fs: Arc<dyn FileSystem>,
    writer: DurableWriter,
    root: PathBuf,
    /// Days of backups to keep (0 = keep forever)
    retention_days: u32,
    /// File names that already got their start-of-session copy
    session_started: Mutex<HashSet<String>>,
}

impl BackupStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, retention_days: u32) -> Self {
        let writer = DurableWriter::with_fs(fs.clone(), WriterConfig::default());
        Self {
            fs,
            writer,
            root: root.into(),
            retention_days,
            session_started: Mutex::new(HashSet::new()),
        }
    }

    /// Tune the retry bound of backup writes
    ///
    /// The backup-directory guard is always off here, since backups are
    /// the one thing allowed inside it.
    pub fn with_writer_config(mut self, config: WriterConfig) -> Self {
        let config = WriterConfig {
            backup_dir: None,
            ..config
        };
        self.writer = DurableWriter::with_fs(self.fs.clone(), config);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Where a backup of `source` taken on `date` goes
    pub fn backup_path(&self, source: &Path, date: NaiveDate, session_start: bool) -> Result<PathBuf> {
        let name = file_name(source)?;
        let day_dir = self.day_dir(date);
        if session_start {
            Ok(day_dir.join(format!("{SESSION_PREFIX}{name}")))
        } else {
            Ok(day_dir.join(name))
        }
    }

    /// Back up `payload` as a copy of `source` in today's folder
    pub async fn save_backup(&self, source: &Path, payload: &[u8]) -> Result<PathBuf> {
        self.save_backup_on(source, payload, Local::now().date_naive())
            .await
    }

    /// Back up `payload` into the folder for `date`
    pub async fn save_backup_on(
        &self,
        source: &Path,
        payload: &[u8],
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let name = file_name(source)?;
        let session_start = !self.session_started.lock().contains(&name);
        let target = self.backup_path(source, date, session_start)?;

        let day_dir = self.day_dir(date);
        self.fs
            .create_dir_all(&day_dir)
            .await
            .map_err(|source| WriteError::Backup {
                path: day_dir.clone(),
                source,
            })?;
        self.writer.save(&target, payload).await?;

        // Only after success, so a failed first copy is retried as a session copy
        if session_start {
            self.session_started.lock().insert(name);
        }

        info!("Backed up {} to {}", source.display(), target.display());
        Ok(target)
    }

    /// All backup days, newest first
    pub async fn list(&self) -> Result<Vec<BackupDay>> {
        let entries = self.read_dir(&self.root).await?;

        let mut days = Vec::new();
        for dir in entries {
            let Some(date) = parse_day(&dir) else {
                debug!("Skipping non-backup entry {}", dir.display());
                continue;
            };
            let files = self.read_dir(&dir).await?;
            days.push(BackupDay { date, dir, files });
        }

        days.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(days)
    }

    /// Delete day folders that fell out of the retention window
    ///
    /// Returns the removed folders. Folders whose names are not dates are
    /// never touched.
    pub async fn prune(&self, today: NaiveDate) -> Result<Vec<PathBuf>> {
        if self.retention_days == 0 {
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for day in self.list().await? {
            let age = today.signed_duration_since(day.date).num_days();
            if age < i64::from(self.retention_days) {
                continue;
            }

            match self.fs.remove_dir_all(&day.dir).await {
                Ok(()) => {
                    info!("Pruned backups from {}", day.date);
                    removed.push(day.dir);
                }
                Err(e) => warn!("Failed to prune {}: {}", day.dir.display(), e),
            }
        }

        Ok(removed)
    }

    fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format(DAY_FORMAT).to_string())
    }

    async fn read_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.fs.read_dir(dir).await.map_err(|source| WriteError::Backup {
            path: dir.to_path_buf(),
            source,
        })
    }
}

fn file_name(source: &Path) -> Result<String> {
    source
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| WriteError::Backup {
            path: source.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
        })
}

fn parse_day(dir: &Path) -> Option<NaiveDate> {
    let name = dir.file_name()?.to_str()?;
    NaiveDate::parse_from_str(name, DAY_FORMAT).ok()
}
