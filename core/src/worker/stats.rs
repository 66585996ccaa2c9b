//! Worker statistics: the live metrics a worker publishes and the summary
//! it returns when it finishes

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics a worker publishes after every batch
///
/// Each field is an independent atomic. Readers may observe fields from
/// different batches; only single-field visibility is guaranteed.
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// `f64` bit pattern of the latest rate
    rate_bits: AtomicU64,
    cumulative_result: AtomicI64,
    invocations: AtomicU64,
    regenerations: AtomicU64,
    failed: AtomicBool,
}

impl WorkerMetrics {
    /// Fresh metrics: rate 0, nothing counted
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the state at a batch boundary
    pub fn publish(&self, rate: f64, cumulative_result: i64, invocations: u64, regenerations: u64) {
        self.rate_bits.store(rate.to_bits(), Ordering::Relaxed);
        self.cumulative_result
            .store(cumulative_result, Ordering::Relaxed);
        self.invocations.store(invocations, Ordering::Relaxed);
        self.regenerations.store(regenerations, Ordering::Relaxed);
    }

    /// Mark the owning worker as failed; its rate is pinned at 0
    pub fn mark_failed(&self) {
        self.rate_bits.store(0f64.to_bits(), Ordering::Relaxed);
        self.failed.store(true, Ordering::Release);
    }

    /// Read the latest published values
    pub fn snapshot(&self) -> ExecutionReport {
        let failed = self.failed.load(Ordering::Acquire);
        ExecutionReport {
            rate: if failed {
                0.0
            } else {
                f64::from_bits(self.rate_bits.load(Ordering::Relaxed))
            },
            cumulative_result: self.cumulative_result.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            regenerations: self.regenerations.load(Ordering::Relaxed),
            failed,
        }
    }
}

/// Point-in-time view of one worker, as read by the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecutionReport {
    /// Invocations per second over the last completed batch
    pub rate: f64,

    /// Wrapping sum of every invocation's result
    pub cumulative_result: i64,

    /// Total invocations so far
    pub invocations: u64,

    /// Units replaced so far
    pub regenerations: u64,

    /// Whether the worker stopped on an error
    pub failed: bool,
}

/// Rate for a batch of `invocations` that took `elapsed`
///
/// A window too short to measure leaves the rate at `previous`, so the
/// result is always finite.
pub fn compute_rate(invocations: u64, elapsed: Duration, previous: f64) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        invocations as f64 / secs
    } else {
        previous
    }
}

/// Summary returned by a worker when it stops
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Total invocations executed
    pub invocations: u64,

    /// Units replaced after the first one
    pub regenerations: u64,

    /// Final wrapping accumulator
    pub cumulative_result: i64,

    /// Whether the worker stopped on an error
    pub failed: bool,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Merge stats from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.invocations += other.invocations;
        self.regenerations += other.regenerations;
        self.cumulative_result = self.cumulative_result.wrapping_add(other.cumulative_result);
        self.failed |= other.failed;
    }
}

impl From<ExecutionReport> for WorkerStats {
    fn from(report: ExecutionReport) -> Self {
        Self {
            invocations: report.invocations,
            regenerations: report.regenerations,
            cumulative_result: report.cumulative_result,
            failed: report.failed,
            ..Self::default()
        }
    }
}
