//! Collaborators injected into the saver
//!
//! The saver never knows how state is produced, how it is persisted or
//! how the user is told about problems. Each of those is a trait object
//! handed in at construction time.

use async_trait::async_trait;
use plotsave_core::Snapshot;
use std::future::Future;
use tracing::{error, warn};

/// Synchronous accessor for the live document
pub trait StateSource: Send + Sync {
    fn snapshot(&self) -> Snapshot;
}

/// Persistence strategy for one job (save or backup)
#[async_trait]
pub trait Persist: Send + Sync {
    async fn persist(&self, snapshot: Snapshot) -> anyhow::Result<()>;
}

/// User-facing notices, fired only on state transitions
pub trait Notifier: Send + Sync {
    /// Saving works again after an earlier failure
    fn save_recovered(&self);

    /// Saving just started failing
    fn save_failed(&self, title: &str, body: &str);
}

/// Telemetry sink for failures
pub trait ErrorReporter: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, error: &anyhow::Error);
}

/// Distinguishes expected downtime from real failures
#[async_trait]
pub trait RestartProbe: Send + Sync {
    async fn is_restarting(&self) -> bool;
}

/// Adapts a closure into a [`StateSource`]
pub struct FnSource<F>(pub F);

impl<F> StateSource for FnSource<F>
where
    F: Fn() -> Snapshot + Send + Sync,
{
    fn snapshot(&self) -> Snapshot {
        (self.0)()
    }
}

/// Adapts an async closure into a [`Persist`]
pub struct FnPersist<F>(pub F);

#[async_trait]
impl<F, Fut> Persist for FnPersist<F>
where
    F: Fn(Snapshot) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn persist(&self, snapshot: Snapshot) -> anyhow::Result<()> {
        (self.0)(snapshot).await
    }
}

/// Notifier that drops every notice
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn save_recovered(&self) {}
    fn save_failed(&self, _title: &str, _body: &str) {}
}

/// Reporter that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn warn(&self, message: &str) {
        warn!(target: "plotsave::telemetry", "{}", message);
    }

    fn error(&self, error: &anyhow::Error) {
        error!(target: "plotsave::telemetry", "{:#}", error);
    }
}

/// Probe for deployments without a restartable server
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverRestarting;

#[async_trait]
impl RestartProbe for NeverRestarting {
    async fn is_restarting(&self) -> bool {
        false
    }
}
