//! Metrics collection for mirror resolution
//!
//! Lock-free counters for probes and resolutions, shared by concurrent
//! resolutions through an `Arc`.

use crate::error::ProbeFailure;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector for the mirror resolver
///
/// All operations are thread-safe using atomic operations.
#[derive(Debug, Default)]
pub struct MirrorMetrics {
    // Probe statistics
    total_probes: AtomicU64,
    successful_probes: AtomicU64,
    empty_probes: AtomicU64,
    errored_probes: AtomicU64,
    timed_out_probes: AtomicU64,
    total_probe_duration_us: AtomicU64,

    // Resolution statistics
    resolutions_started: AtomicU64,
    resolved: AtomicU64,
    exhausted: AtomicU64,
    unrecognized: AtomicU64,
    skipped: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_probes: u64,
    pub successful_probes: u64,
    pub empty_probes: u64,
    pub errored_probes: u64,
    pub timed_out_probes: u64,
    pub total_probe_duration_us: u64,

    pub resolutions_started: u64,
    pub resolved: u64,
    pub exhausted: u64,
    pub unrecognized: u64,
    pub skipped: u64,
}

impl MirrorMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a settled probe and how long it took
    pub fn record_probe(&self, outcome: &std::result::Result<(), ProbeFailure>, duration: Duration) {
        self.total_probes.fetch_add(1, Ordering::Relaxed);
        self.total_probe_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        let counter = match outcome {
            Ok(()) => &self.successful_probes,
            Err(ProbeFailure::Empty) => &self.empty_probes,
            Err(ProbeFailure::Error) => &self.errored_probes,
            Err(ProbeFailure::Timeout) => &self.timed_out_probes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the start of a resolution for a recognised reference
    pub fn record_resolution_started(&self) {
        self.resolutions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolved(&self) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reference whose URL is outside the shard naming scheme
    pub fn record_unrecognized(&self) {
        self.unrecognized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fix request ignored because the reference was already in progress or done
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    ///
    /// Counters are read one at a time, so a snapshot taken while resolutions
    /// are running may be slightly inconsistent across fields.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_probes: self.total_probes.load(Ordering::Relaxed),
            successful_probes: self.successful_probes.load(Ordering::Relaxed),
            empty_probes: self.empty_probes.load(Ordering::Relaxed),
            errored_probes: self.errored_probes.load(Ordering::Relaxed),
            timed_out_probes: self.timed_out_probes.load(Ordering::Relaxed),
            total_probe_duration_us: self.total_probe_duration_us.load(Ordering::Relaxed),
            resolutions_started: self.resolutions_started.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Failed probes of any kind
    pub fn failed_probes(&self) -> u64 {
        self.empty_probes + self.errored_probes + self.timed_out_probes
    }

    /// Average probe duration in milliseconds
    pub fn avg_probe_duration_ms(&self) -> f64 {
        if self.total_probes == 0 {
            0.0
        } else {
            (self.total_probe_duration_us as f64 / self.total_probes as f64) / 1000.0
        }
    }

    /// Average probes per finished resolution
    pub fn avg_probes_per_resolution(&self) -> f64 {
        let finished = self.resolved + self.exhausted;
        if finished == 0 {
            0.0
        } else {
            self.total_probes as f64 / finished as f64
        }
    }
}
