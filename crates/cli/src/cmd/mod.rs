//! CLI command implementations

pub mod backups;
pub mod config;
pub mod save;
pub mod verify;
pub mod watch;
