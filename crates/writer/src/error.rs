//! Writer error types

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a save request can fail
#[derive(Debug, Error)]
pub enum WriteError {
    /// Target lies inside the backup directory
    #[error("refusing to save {path} inside the backup directory {backup_dir}")]
    InsideBackupDir { path: PathBuf, backup_dir: PathBuf },

    /// Document lacks keys every saved file must carry
    #[error("document is missing required keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    /// Caller handed us bytes that are not JSON
    #[error("payload is not valid JSON")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("failed to serialize document")]
    Serialize(#[source] serde_json::Error),

    /// Retry bound reached without a confirmed read-back
    #[error("failed to save {path} after {attempts} attempts, the old file is untouched")]
    Exhausted {
        path: PathBuf,
        attempts: u32,
        last_error: Option<String>,
    },

    /// Backup store I/O failure
    #[error("backup of {path} failed")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    /// Errors raised before any disk I/O was attempted
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InsideBackupDir { .. }
                | Self::MissingKeys(_)
                | Self::InvalidPayload(_)
                | Self::Serialize(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WriteError>;
