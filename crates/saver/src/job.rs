//! Per-job bookkeeping

use plotsave_core::Snapshot;
use std::fmt;

/// The two periodic jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Save,
    Backup,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Save => f.write_str("save"),
            JobKind::Backup => f.write_str("backup"),
        }
    }
}

/// Mutable state of one job, shared between its ticks
#[derive(Debug, Default)]
pub(crate) struct JobState {
    /// Last snapshot this job successfully persisted
    pub last_persisted: Option<Snapshot>,
    /// Dispatch number of `last_persisted`
    pub persisted_seq: u64,
    /// Most recently dispatched snapshot still awaiting its outcome
    pub in_flight: Option<(u64, Snapshot)>,
    /// Dispatch counter
    pub next_seq: u64,
    /// Set on failure, cleared by the next success
    pub failed: bool,
    pub successes: u64,
    pub failures: u64,
    pub skipped: u64,
}

impl JobState {
    /// Reserve the next dispatch number for `snapshot`
    pub fn dispatch(&mut self, snapshot: Snapshot) -> u64 {
        self.next_seq += 1;
        self.in_flight = Some((self.next_seq, snapshot));
        self.next_seq
    }

    /// Forget the in-flight marker if it belongs to `seq`
    pub fn settle(&mut self, seq: u64) {
        if matches!(self.in_flight, Some((pending, _)) if pending == seq) {
            self.in_flight = None;
        }
    }

    /// Record a success unless a newer dispatch already succeeded
    pub fn record_success(&mut self, seq: u64, snapshot: Snapshot) {
        self.settle(seq);
        self.successes += 1;
        if seq > self.persisted_seq {
            self.persisted_seq = seq;
            self.last_persisted = Some(snapshot);
        }
    }

    /// Drop the persisted snapshot so the next tick retries, unless a
    /// newer dispatch than `seq` already succeeded
    pub fn forget_persisted(&mut self, seq: u64) {
        if seq > self.persisted_seq {
            self.last_persisted = None;
        }
    }

    pub fn status(&self, kind: JobKind) -> JobStatus {
        JobStatus {
            kind,
            failed: self.failed,
            has_persisted: self.last_persisted.is_some(),
            in_flight: self.in_flight.is_some(),
            successes: self.successes,
            failures: self.failures,
            skipped: self.skipped,
        }
    }
}

/// Read-only view of a job for status displays and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub kind: JobKind,
    pub failed: bool,
    pub has_persisted: bool,
    pub in_flight: bool,
    pub successes: u64,
    pub failures: u64,
    pub skipped: u64,
}
