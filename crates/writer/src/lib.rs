//! Durable document writing for Plotsave
//!
//! This crate provides:
//! - Verified writes (write, fsync, rename, read back, compare)
//! - Bounded retries with a fixed backoff
//! - Per-path write serialization
//! - Refusal to write into the backup directory
//! - Dated backup copies with day-based retention

pub mod backup;
pub mod durable;
pub mod error;
pub mod fs;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

// Re-exports
pub use backup::{BackupDay, BackupStore};
pub use durable::{DurableWriter, WriterConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use error::{Result, WriteError};
pub use fs::{FileStat, FileSystem, TokioFs};
