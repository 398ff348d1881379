//! Filesystem access used by the writer
//!
//! All disk I/O goes through the [`FileSystem`] trait so the retry logic
//! can be exercised against deterministic in-memory doubles.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;

/// Subset of file metadata the writer cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Last modification time
    pub modified: SystemTime,
    /// Size in bytes
    pub len: u64,
}

/// Asynchronous filesystem operations
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Stat a file, returning `None` when it does not exist
    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    /// Replace the file contents and flush them to stable storage
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Read the whole file
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// List the entries of a directory (empty when it does not exist)
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl FileSystem for TokioFs {
    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(Some(FileStat {
                modified: meta.modified()?,
                len: meta.len(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes to a sibling temp file, fsyncs it, then renames it over the
    /// target. Readers never observe a partially written file.
    ///
    /// A symlinked target is written through: the temp file is placed next
    /// to the resolved file, so the link survives. An existing file keeps
    /// its permissions.
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let (target, permissions) = match tokio::fs::metadata(path).await {
            Ok(meta) => (tokio::fs::canonicalize(path).await?, Some(meta.permissions())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (path.to_path_buf(), None),
            Err(e) => return Err(e),
        };
        let temp_path = temp_sibling(&target);

        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&temp_path)
                .await?;
            file.write_all(data).await?;
            if let Some(permissions) = permissions {
                file.set_permissions(permissions).await?;
            }
            file.sync_all().await?;
            drop(file);

            tokio::fs::rename(&temp_path, &target).await
        }
        .await;

        if let Err(e) = result {
            // Leave the target alone and clean up our temp file
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        #[cfg(unix)]
        {
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Ok(dir) = tokio::fs::File::open(parent).await {
                    // Best effort - rename durability on some filesystems
                    let _ = dir.sync_all().await;
                }
            }
        }

        Ok(())
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir_all(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        paths.sort();
        Ok(paths)
    }
}

/// Unique hidden temp path next to the target
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}
