//! Durable, verified document writes
//!
//! A save is only reported successful once the file has been read back
//! and its parsed contents equal the intended payload. The attempt loop
//! is an explicit state machine:
//!
//! ```text
//! Stat ──► Write ──► (Stat) ──► Verify ──► Done
//!   ▲                              │
//!   └──────── RetryWait ◄──────────┘   (bounded by max_attempts)
//! ```
//!
//! Writes to the same path are serialized through a per-path FIFO queue.

use crate::error::{Result, WriteError};
use crate::fs::{FileSystem, TokioFs};
use parking_lot::Mutex;
use plotsave_core::RequiredKeys;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, warn};

/// Default attempt bound per save call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Writer tuning
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Attempts before giving up (default: 10)
    pub max_attempts: u32,
    /// Fixed pause between attempts (default: 500ms)
    pub retry_delay: Duration,
    /// Saves targeting this directory are refused
    pub backup_dir: Option<PathBuf>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            backup_dir: None,
        }
    }
}

/// Verified file writer with per-path serialization
///
/// Cheap to clone; clones share the same path queue.
#[derive(Clone)]
pub struct DurableWriter {
    fs: Arc<dyn FileSystem>,
    config: WriterConfig,
    required: RequiredKeys,
    queue: Arc<PathQueue>,
}

impl DurableWriter {
    /// Create a writer on top of the real filesystem
    pub fn new(config: WriterConfig) -> Self {
        Self::with_fs(Arc::new(TokioFs), config)
    }

    /// Create a writer on top of any filesystem implementation
    pub fn with_fs(fs: Arc<dyn FileSystem>, config: WriterConfig) -> Self {
        Self {
            fs,
            config,
            required: RequiredKeys::default(),
            queue: Arc::new(PathQueue::default()),
        }
    }

    /// Override the keys `save_document` insists on
    pub fn with_required_keys(mut self, required: RequiredKeys) -> Self {
        self.required = required;
        self
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Number of paths with a queued or running save
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Validate, serialize and durably save a document
    ///
    /// Fails without touching the disk when the target is inside the
    /// backup directory or the document lacks required keys.
    pub async fn save_document(&self, path: &Path, document: &Value) -> Result<()> {
        self.check_target(path).await?;

        let missing = self.required.missing(document);
        if !missing.is_empty() {
            error!(
                "Refusing to save {}: missing keys {}",
                path.display(),
                missing.join(", ")
            );
            return Err(WriteError::MissingKeys(missing));
        }

        let payload = serde_json::to_vec(document).map_err(WriteError::Serialize)?;
        self.save(path, &payload).await
    }

    /// Durably save pre-serialized JSON bytes
    ///
    /// Waits behind any save already queued for the same path.
    pub async fn save(&self, path: &Path, payload: &[u8]) -> Result<()> {
        self.check_target(path).await?;
        let expected: Value = serde_json::from_slice(payload).map_err(WriteError::InvalidPayload)?;

        let slot = self.queue.enter(path);
        let _turn = slot.lock.lock().await;
        debug!("Acquired write queue for {}", path.display());

        CheckSave {
            fs: self.fs.as_ref(),
            path,
            payload,
            expected: &expected,
            max_attempts: self.config.max_attempts.max(1),
            retry_delay: self.config.retry_delay,
            attempt: 0,
            baseline: None,
            last_error: None,
        }
        .run()
        .await
    }

    async fn check_target(&self, path: &Path) -> Result<()> {
        let Some(backup_dir) = &self.config.backup_dir else {
            return Ok(());
        };

        if is_within(path, backup_dir).await {
            warn!(
                "Refusing to save {} inside backup directory {}",
                path.display(),
                backup_dir.display()
            );
            return Err(WriteError::InsideBackupDir {
                path: path.to_path_buf(),
                backup_dir: backup_dir.clone(),
            });
        }
        Ok(())
    }
}

/// Check whether `path` lives under `dir`, lexically or after resolving
/// symlinks and relative segments of paths that exist.
async fn is_within(path: &Path, dir: &Path) -> bool {
    if path.starts_with(dir) {
        return true;
    }

    let Ok(resolved_dir) = tokio::fs::canonicalize(dir).await else {
        return false;
    };
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return false;
    };

    match tokio::fs::canonicalize(parent).await {
        Ok(parent) => parent.starts_with(&resolved_dir),
        Err(_) => false,
    }
}

/// Per-path FIFO queue
///
/// Each path maps to a fair async mutex. The entry is removed once the
/// last request referencing it leaves, so the map never grows unbounded.
#[derive(Default)]
struct PathQueue {
    entries: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathQueue {
    fn enter(&self, path: &Path) -> QueueSlot<'_> {
        let lock = self
            .entries
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone();

        QueueSlot {
            queue: self,
            path: path.to_path_buf(),
            lock,
        }
    }

    fn leave(&self, path: &Path, lock: &Arc<AsyncMutex<()>>) {
        let mut entries = self.entries.lock();
        if let Some(current) = entries.get(path) {
            // Only the map and the departing slot still hold it
            if Arc::ptr_eq(current, lock) && Arc::strong_count(lock) == 2 {
                entries.remove(path);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// A request's place in a path queue, released on drop
struct QueueSlot<'a> {
    queue: &'a PathQueue,
    path: PathBuf,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.queue.leave(&self.path, &self.lock);
    }
}

/// State of the attempt loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Stat,
    Write,
    Verify,
    RetryWait(Resume),
    Done,
}

/// Where to pick up after a retry pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Stat,
    Write,
}

/// One save call's attempt loop
struct CheckSave<'a> {
    fs: &'a dyn FileSystem,
    path: &'a Path,
    payload: &'a [u8],
    expected: &'a Value,
    max_attempts: u32,
    retry_delay: Duration,
    attempt: u32,
    /// mtime observed right before our write onto an existing file
    baseline: Option<SystemTime>,
    last_error: Option<String>,
}

impl CheckSave<'_> {
    async fn run(mut self) -> Result<()> {
        let mut step = Step::Stat;

        loop {
            step = match step {
                Step::Stat => self.stat().await,
                Step::Write => self.write().await,
                Step::Verify => self.verify().await,
                Step::RetryWait(resume) => {
                    self.attempt += 1;
                    if self.attempt >= self.max_attempts {
                        return Err(self.exhausted());
                    }
                    tokio::time::sleep(self.retry_delay).await;
                    match resume {
                        Resume::Stat => Step::Stat,
                        Resume::Write => Step::Write,
                    }
                }
                Step::Done => {
                    debug!(
                        "Saved {} ({} bytes, attempt {})",
                        self.path.display(),
                        self.payload.len(),
                        self.attempt + 1
                    );
                    return Ok(());
                }
            };
        }
    }

    async fn stat(&mut self) -> Step {
        match self.fs.stat(self.path).await {
            Ok(None) => {
                self.baseline = None;
                Step::Write
            }
            Ok(Some(stat)) => match self.baseline {
                None => {
                    self.baseline = Some(stat.modified);
                    Step::Write
                }
                Some(baseline) => {
                    let forced = self.attempt + 1 >= self.max_attempts;
                    if stat.modified != baseline || forced {
                        Step::Verify
                    } else {
                        debug!("Write to {} has not landed yet", self.path.display());
                        Step::RetryWait(Resume::Stat)
                    }
                }
            },
            Err(e) => {
                warn!("Failed to stat {}: {}", self.path.display(), e);
                self.last_error = Some(e.to_string());
                Step::RetryWait(Resume::Stat)
            }
        }
    }

    async fn write(&mut self) -> Step {
        match self.fs.write(self.path, self.payload).await {
            Ok(()) if self.baseline.is_some() => Step::Stat,
            Ok(()) => Step::Verify,
            Err(e) => {
                warn!(
                    "Failed to write {} (attempt {}/{}): {}",
                    self.path.display(),
                    self.attempt + 1,
                    self.max_attempts,
                    e
                );
                self.last_error = Some(e.to_string());
                // The file may not have changed, so the old mtime proves nothing
                self.baseline = None;
                Step::RetryWait(Resume::Stat)
            }
        }
    }

    async fn verify(&mut self) -> Step {
        let bytes = match self.fs.read(self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read back {}: {}", self.path.display(), e);
                self.last_error = Some(e.to_string());
                self.baseline = None;
                return Step::RetryWait(Resume::Stat);
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(actual) if actual == *self.expected => Step::Done,
            Ok(_) => {
                warn!(
                    "Read-back of {} does not match what was written (attempt {}/{})",
                    self.path.display(),
                    self.attempt + 1,
                    self.max_attempts
                );
                self.last_error = Some("read-back mismatch".to_string());
                Step::RetryWait(Resume::Write)
            }
            Err(e) => {
                error!(
                    "Read-back of {} is not valid JSON, rewriting: {}",
                    self.path.display(),
                    e
                );
                self.last_error = Some(format!("unparseable read-back: {e}"));
                self.baseline = None;
                Step::RetryWait(Resume::Stat)
            }
        }
    }

    fn exhausted(&self) -> WriteError {
        error!(
            "Giving up on {} after {} attempts",
            self.path.display(),
            self.attempt
        );
        WriteError::Exhausted {
            path: self.path.to_path_buf(),
            attempts: self.attempt,
            last_error: self.last_error.clone(),
        }
    }
}

impl std::fmt::Debug for DurableWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableWriter")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
