//! Periodic autosave and backup scheduling
//!
//! Runs two independent interval jobs against a continuously changing
//! document. Each job persists only snapshots that differ from what it
//! last persisted, and turns failure/recovery transitions into one-shot
//! notices instead of one per tick.

pub mod collab;
pub mod config;
pub mod job;
pub mod runner;

pub use collab::{
    ErrorReporter, FnPersist, FnSource, NeverRestarting, Notifier, Persist, RestartProbe,
    SilentNotifier, StateSource, TracingReporter,
};
pub use config::SaverConfig;
pub use job::{JobKind, JobStatus};
pub use runner::{Saver, SAVE_FAILED_BODY, SAVE_FAILED_TITLE};
