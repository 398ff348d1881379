//! In-memory filesystem with fault injection
//!
//! Used by tests across the workspace to drive the writer through
//! mismatching read-backs, corrupt files and failing writes without
//! touching the disk.

use crate::fs::{FileStat, FileSystem};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One recorded filesystem call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Stat(PathBuf),
    Write(PathBuf, Vec<u8>),
    Read(PathBuf),
}

#[derive(Debug, Clone)]
struct MemFile {
    data: Vec<u8>,
    modified: SystemTime,
}

/// Filesystem double that keeps files in a map
///
/// Every write advances a logical clock by one second so that mtime
/// comparisons always observe a change unless `freeze_mtime` is set.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, MemFile>>,
    dirs: Mutex<BTreeMap<PathBuf, ()>>,
    ops: Mutex<Vec<FsOp>>,
    clock: AtomicU64,
    writes: AtomicUsize,
    mismatched_reads: AtomicUsize,
    garbage_reads: AtomicUsize,
    failing_writes: AtomicUsize,
    always_mismatch: AtomicBool,
    freeze_mtime: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording an operation
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        let modified = self.tick();
        self.files.lock().insert(
            path.into(),
            MemFile {
                data: data.into(),
                modified,
            },
        );
    }

    /// Current contents of a file
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).map(|f| f.data.clone())
    }

    /// Number of `write` calls so far (including failed ones)
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every recorded call in order
    pub fn ops(&self) -> Vec<FsOp> {
        self.ops.lock().clone()
    }

    /// The next `n` reads return a valid document that differs from the file
    pub fn mismatch_next_reads(&self, n: usize) {
        self.mismatched_reads.store(n, Ordering::SeqCst);
    }

    /// The next `n` reads return bytes that are not JSON
    pub fn garbage_next_reads(&self, n: usize) {
        self.garbage_reads.store(n, Ordering::SeqCst);
    }

    /// The next `n` writes fail with an I/O error and leave the file alone
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Every read returns a mismatching document
    pub fn always_mismatch(&self, on: bool) {
        self.always_mismatch.store(on, Ordering::SeqCst);
    }

    /// Writes keep the previous mtime, like a coarse-resolution filesystem
    pub fn freeze_mtime(&self, on: bool) {
        self.freeze_mtime.store(on, Ordering::SeqCst);
    }

    /// Suspend every write for `delay` before it lands
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn tick(&self) -> SystemTime {
        let secs = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn record(&self, op: FsOp) {
        self.ops.lock().push(op);
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        self.record(FsOp::Stat(path.to_path_buf()));
        Ok(self.files.lock().get(path).map(|f| FileStat {
            modified: f.modified,
            len: f.data.len() as u64,
        }))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.record(FsOp::Write(path.to_path_buf(), data.to_vec()));

        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if Self::take_one(&self.failing_writes) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }

        let mut files = self.files.lock();
        let modified = match files.get(path) {
            Some(existing) if self.freeze_mtime.load(Ordering::SeqCst) => existing.modified,
            _ => self.tick(),
        };
        files.insert(
            path.to_path_buf(),
            MemFile {
                data: data.to_vec(),
                modified,
            },
        );
        Ok(())
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.record(FsOp::Read(path.to_path_buf()));

        if Self::take_one(&self.garbage_reads) {
            return Ok(b"{\"truncated\": ".to_vec());
        }
        if self.always_mismatch.load(Ordering::SeqCst) || Self::take_one(&self.mismatched_reads) {
            return Ok(b"{\"someone\": \"else\"}".to_vec());
        }

        self.files
            .lock()
            .get(path)
            .map(|f| f.data.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.dirs.lock().insert(path.to_path_buf(), ());
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.dirs.lock().retain(|dir, _| !dir.starts_with(path));
        self.files.lock().retain(|file, _| !file.starts_with(path));
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut children: Vec<PathBuf> = self
            .dirs
            .lock()
            .keys()
            .chain(self.files.lock().keys())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        children.sort();
        children.dedup();
        Ok(children)
    }
}
