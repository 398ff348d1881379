//! Workflow integration tests
//!
//! Drive the built binary end to end against temporary directories.

pub mod backups;
pub mod config;
pub mod save_verify;
pub mod watch;
