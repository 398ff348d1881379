//! Saver background loops
//!
//! Spawns one tokio task per job. Each tick snapshots the live state,
//! skips it when nothing changed since the last persisted (or still
//! pending) snapshot, and otherwise spawns the persist call so a slow
//! write never delays the next tick. Spawned persists are tracked in a
//! `JoinSet` so shutdown can wait for them.

use crate::collab::{
    ErrorReporter, NeverRestarting, Notifier, Persist, RestartProbe, SilentNotifier, StateSource,
    TracingReporter,
};
use crate::config::SaverConfig;
use crate::job::{JobKind, JobState, JobStatus};
use parking_lot::Mutex;
use plotsave_core::{Snapshot, StateComparator, SystemKeys};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Level};

/// Title of the notice shown when saving starts failing
pub const SAVE_FAILED_TITLE: &str = "Auto-saving failed";

/// Body of the notice shown when saving starts failing
pub const SAVE_FAILED_BODY: &str =
    "Saving your file didn't work. Check where it's stored and that you can write to it.";

/// One periodic job and its persisted state
struct Job {
    kind: JobKind,
    persist: Arc<dyn Persist>,
    state: Mutex<JobState>,
}

impl Job {
    fn new(kind: JobKind, persist: Arc<dyn Persist>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            persist,
            state: Mutex::new(JobState::default()),
        })
    }
}

/// Timer tasks of a started saver
struct Running {
    alive: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

/// Periodic save and backup scheduler
pub struct Saver {
    source: Arc<dyn StateSource>,
    comparator: Arc<StateComparator>,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn ErrorReporter>,
    probe: Arc<dyn RestartProbe>,
    config: SaverConfig,
    save: Arc<Job>,
    backup: Arc<Job>,
    tasks: Arc<Mutex<JoinSet<()>>>,
    running: Option<Running>,
}

impl Saver {
    /// Create a stopped saver
    pub fn new(
        source: Arc<dyn StateSource>,
        save: Arc<dyn Persist>,
        backup: Arc<dyn Persist>,
        config: SaverConfig,
    ) -> Self {
        Self {
            source,
            comparator: Arc::new(StateComparator::default()),
            notifier: Arc::new(SilentNotifier),
            reporter: Arc::new(TracingReporter),
            probe: Arc::new(NeverRestarting),
            config,
            save: Job::new(JobKind::Save, save),
            backup: Job::new(JobKind::Backup, backup),
            tasks: Arc::new(Mutex::new(JoinSet::new())),
            running: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_restart_probe(mut self, probe: Arc<dyn RestartProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Override which top-level keys change detection ignores
    pub fn with_system_keys(mut self, system_keys: SystemKeys) -> Self {
        self.comparator = Arc::new(StateComparator::new(system_keys));
        self
    }

    pub fn config(&self) -> &SaverConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Current bookkeeping of one job
    pub fn job_status(&self, kind: JobKind) -> JobStatus {
        self.job(kind).state.lock().status(kind)
    }

    /// Arm both job timers
    ///
    /// Must be called from within a tokio runtime. Starting a running
    /// saver does nothing.
    pub fn start(&mut self) {
        if self.running.is_some() {
            debug!("saver already running");
            return;
        }

        let alive = Arc::new(AtomicBool::new(true));
        let mut handles = vec![tokio::spawn(
            self.ticker(JobKind::Save, alive.clone())
                .run(self.config.save_interval()),
        )];
        if self.config.backup_enabled {
            handles.push(tokio::spawn(
                self.ticker(JobKind::Backup, alive.clone())
                    .run(self.config.backup_interval()),
            ));
        }

        info!(
            "saver started (save every {:?}, backup {})",
            self.config.save_interval(),
            if self.config.backup_enabled {
                format!("every {:?}", self.config.backup_interval())
            } else {
                "disabled".to_string()
            }
        );
        self.running = Some(Running { alive, handles });
    }

    /// Cancel both timers
    ///
    /// Persist calls already in flight run to completion, but their
    /// outcome no longer triggers any callback. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.alive.store(false, Ordering::SeqCst);
        for handle in running.handles {
            handle.abort();
        }
        info!("saver stopped");
    }

    /// Wait for every persist call spawned so far to finish
    ///
    /// Meant to follow `stop`; while running, new persists keep arriving.
    /// Cancelling the returned future aborts the persists it was
    /// waiting on.
    pub async fn drain(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.tasks.lock());
            if pending.is_empty() {
                return;
            }

            debug!("waiting for {} persist calls", pending.len());
            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        warn!("persist task panicked: {}", e);
                    }
                }
            }
        }
    }

    /// Number of spawned persist calls not yet reaped
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    fn job(&self, kind: JobKind) -> &Arc<Job> {
        match kind {
            JobKind::Save => &self.save,
            JobKind::Backup => &self.backup,
        }
    }

    fn ticker(&self, kind: JobKind, alive: Arc<AtomicBool>) -> Ticker {
        Ticker {
            job: self.job(kind).clone(),
            source: self.source.clone(),
            comparator: self.comparator.clone(),
            notifier: self.notifier.clone(),
            reporter: self.reporter.clone(),
            probe: self.probe.clone(),
            tasks: self.tasks.clone(),
            alive,
        }
    }
}

impl Drop for Saver {
    fn drop(&mut self) {
        self.stop();
        // Let in-flight persists finish on their own
        self.tasks.lock().detach_all();
    }
}

/// Everything one job's loop and its spawned persist calls need
#[derive(Clone)]
struct Ticker {
    job: Arc<Job>,
    source: Arc<dyn StateSource>,
    comparator: Arc<StateComparator>,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn ErrorReporter>,
    probe: Arc<dyn RestartProbe>,
    tasks: Arc<Mutex<JoinSet<()>>>,
    alive: Arc<AtomicBool>,
}

impl Ticker {
    async fn run(self, period: Duration) {
        // First tick after one full period, like a plain interval timer
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.tick();
        }
    }

    /// Snapshot, compare, and dispatch a persist if anything changed
    fn tick(&self) {
        let kind = self.job.kind;
        let snapshot = self.source.snapshot();

        let seq = {
            let mut state = self.job.state.lock();
            let pending = state.in_flight.as_ref().map(|(_, s)| s);
            if self.comparator.unchanged(state.last_persisted.as_ref(), &snapshot)
                || self.comparator.unchanged(pending, &snapshot)
            {
                state.skipped += 1;
                debug!("{} tick skipped, nothing changed", kind);
                return;
            }

            if tracing::enabled!(Level::DEBUG) {
                let changed = self
                    .comparator
                    .changed_keys(state.last_persisted.as_ref(), &snapshot);
                debug!("{} tick: changed keys {:?}", kind, changed);
            }
            state.dispatch(snapshot.clone())
        };

        let ticker = self.clone();
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move { ticker.persist(seq, snapshot).await });
    }

    async fn persist(&self, seq: u64, snapshot: Snapshot) {
        let result = self.job.persist.persist(snapshot.clone()).await;

        if !self.alive.load(Ordering::SeqCst) {
            debug!("{} #{} finished after stop, ignoring outcome", self.job.kind, seq);
            return;
        }

        match result {
            Ok(()) => self.on_success(seq, snapshot),
            Err(e) => self.on_failure(seq, e).await,
        }
    }

    fn on_success(&self, seq: u64, snapshot: Snapshot) {
        let kind = self.job.kind;
        let recovered = {
            let mut state = self.job.state.lock();
            state.record_success(seq, snapshot);
            std::mem::take(&mut state.failed)
        };

        debug!("{} #{} succeeded", kind, seq);
        if recovered {
            info!("{} is working again", kind);
            if kind == JobKind::Save {
                self.notifier.save_recovered();
            }
        }
    }

    async fn on_failure(&self, seq: u64, error: anyhow::Error) {
        let kind = self.job.kind;
        self.job.state.lock().settle(seq);

        if self.probe.is_restarting().await {
            info!(
                "{} #{} failed while the server restarts, retrying next tick: {:#}",
                kind, seq, error
            );
            self.job.state.lock().forget_persisted(seq);
            return;
        }

        if !self.alive.load(Ordering::SeqCst) {
            return;
        }

        let first_failure = {
            let mut state = self.job.state.lock();
            state.failures += 1;
            !std::mem::replace(&mut state.failed, true)
        };

        match kind {
            JobKind::Save => {
                error!("save #{} failed: {:#}", seq, error);
                self.reporter.error(&error);
                if first_failure {
                    self.notifier.save_failed(SAVE_FAILED_TITLE, SAVE_FAILED_BODY);
                }
            }
            JobKind::Backup => {
                warn!("backup #{} failed: {:#}", seq, error);
                self.reporter.warn(&format!("backup failed: {error:#}"));
            }
        }
    }
}
