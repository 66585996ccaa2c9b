//! Worker execution loop

use crate::error::{BenchError, BenchResult, WorkerPhase};
use crate::traits::{ExecutableUnit, UnitProvider};

use super::stats::{compute_rate, ExecutionReport, WorkerMetrics, WorkerStats};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Worker runs batches of invocations on its own unit: invoke -> publish ->
/// regenerate -> repeat
///
/// A worker is CPU bound and runs synchronously on a dedicated thread. It
/// shares nothing with other workers except the provider; the orchestrator
/// sees it only through a [`WorkerHandle`].
pub struct Worker {
    pub(super) id: usize,
    pub(super) provider: Arc<dyn UnitProvider>,
    pub(super) template: Arc<str>,
    pub(super) batch_size: u64,
    pub(super) workload_size: u64,
    pub(super) regeneration_threshold: Option<u64>,
    pub(super) metrics: Arc<WorkerMetrics>,
    pub(super) stop: Arc<AtomicBool>,
}

impl Worker {
    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Read-side handle for observing and stopping this worker
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            id: self.id,
            metrics: Arc::clone(&self.metrics),
            stop: Arc::clone(&self.stop),
        }
    }

    /// Run the worker loop until a stop is requested
    ///
    /// Blocks the calling thread. The stop flag is checked at batch
    /// boundaries only, so an in-flight batch always completes.
    ///
    /// # Errors
    /// Returns [`BenchError::Worker`] if a unit cannot be produced, either
    /// at startup or on regeneration. The worker's metrics are marked
    /// failed before returning.
    pub fn run(self) -> BenchResult<WorkerStats> {
        let mut stats = WorkerStats::new();
        stats.start();

        tracing::debug!(
            worker_id = self.id,
            provider = self.provider.name(),
            batch_size = self.batch_size,
            workload_size = self.workload_size,
            regeneration_threshold = ?self.regeneration_threshold,
            "Worker started"
        );

        let mut unit = self.produce(WorkerPhase::Startup, &mut stats)?;
        let mut since_regeneration: u64 = 0;
        let mut rate = 0.0;

        while !self.stop.load(Ordering::Acquire) {
            let batch_start = Instant::now();
            for _ in 0..self.batch_size {
                let result = unit.invoke(self.workload_size);
                stats.cumulative_result = stats.cumulative_result.wrapping_add(result);
            }
            rate = compute_rate(self.batch_size, batch_start.elapsed(), rate);

            stats.invocations += self.batch_size;
            since_regeneration += self.batch_size;
            self.metrics.publish(
                rate,
                stats.cumulative_result,
                stats.invocations,
                stats.regenerations,
            );

            if self
                .regeneration_threshold
                .is_some_and(|threshold| since_regeneration >= threshold)
            {
                // the fresh unit exists before the old one is dropped
                unit = self.produce(WorkerPhase::Regeneration, &mut stats)?;
                stats.regenerations += 1;
                tracing::trace!(
                    worker_id = self.id,
                    regenerations = stats.regenerations,
                    invocations = stats.invocations,
                    "Unit regenerated"
                );
                since_regeneration = 0;
            }
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            invocations = stats.invocations,
            regenerations = stats.regenerations,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        Ok(stats)
    }

    fn produce(
        &self,
        phase: WorkerPhase,
        stats: &mut WorkerStats,
    ) -> BenchResult<Box<dyn ExecutableUnit>> {
        self.provider.produce(&self.template).map_err(|source| {
            self.metrics.mark_failed();
            stats.failed = true;
            stats.stop();
            tracing::error!(
                worker_id = self.id,
                phase = %phase,
                invocations = stats.invocations,
                error = %source,
                "Worker failed to obtain executable unit"
            );
            BenchError::worker(self.id, phase, source)
        })
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("provider", &self.provider.name())
            .field("batch_size", &self.batch_size)
            .field("workload_size", &self.workload_size)
            .field("regeneration_threshold", &self.regeneration_threshold)
            .finish()
    }
}

/// Orchestrator-side view of a running worker
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: usize,
    metrics: Arc<WorkerMetrics>,
    stop: Arc<AtomicBool>,
}

impl WorkerHandle {
    /// Worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Latest published metrics; never blocks
    pub fn current_report(&self) -> ExecutionReport {
        self.metrics.snapshot()
    }

    /// Ask the worker to stop at its next batch boundary
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}
