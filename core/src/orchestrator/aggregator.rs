//! Aggregation of worker metrics: the per-interval average rate and the
//! end-of-run roll-up

use std::time::Duration;

use crate::worker::{ExecutionReport, WorkerStats};

/// Unweighted mean of every worker's published rate
///
/// Workers that have not finished a batch yet, or have failed, count as 0
/// rather than being left out.
pub fn average_rate(reports: &[ExecutionReport]) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    let sum: f64 = reports.iter().map(|r| r.rate).sum();
    sum / reports.len() as f64
}

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    /// Number of workers in the pool
    pub total_workers: usize,

    /// Workers that stopped on an error
    pub failed_workers: usize,

    /// Total invocations across workers
    pub total_invocations: u64,

    /// Total unit replacements across workers
    pub total_regenerations: u64,

    /// Wrapping sum of every worker's accumulator
    pub combined_result: i64,

    /// Maximum duration across all workers
    pub total_duration: Duration,

    /// Overall invocations per second
    pub invocations_per_second: f64,
}

impl AggregatedStats {
    /// Workers that ran until asked to stop
    pub fn healthy_workers(&self) -> usize {
        self.total_workers - self.failed_workers
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut merged = WorkerStats::new();
    for s in stats {
        merged.merge(s);
    }
    let failed_workers = stats.iter().filter(|s| s.failed).count();

    // Use the maximum elapsed time across all workers
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let invocations_per_second = if secs > 0.0 {
        merged.invocations as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_workers: stats.len(),
        failed_workers,
        total_invocations: merged.invocations,
        total_regenerations: merged.regenerations,
        combined_result: merged.cumulative_result,
        total_duration,
        invocations_per_second,
    }
}
