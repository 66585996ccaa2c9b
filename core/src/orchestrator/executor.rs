//! Orchestrator execution logic

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{HarnessConfig, StopCondition};
use crate::error::{BenchError, BenchResult};
use crate::report::{bytes_to_mb, ReportLine, ReportSink};
use crate::traits::{ResourceMonitor, UnitProvider};
use crate::worker::{ExecutionReport, WorkerBuilder, WorkerHandle, WorkerStats};

use super::aggregator::{aggregate_worker_stats, average_rate};

/// Everything a finished run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Report lines in the order they were emitted
    pub reports: Vec<ReportLine>,

    /// Final stats per worker, indexed by worker ID
    pub workers: Vec<WorkerStats>,
}

impl RunSummary {
    /// Each worker's final accumulator, in worker order
    pub fn finals(&self) -> Vec<i64> {
        self.workers.iter().map(|s| s.cumulative_result).collect()
    }
}

/// Orchestrator manages the run lifecycle
///
/// Responsible for spawning workers, sampling them on the reporting
/// cadence, coordinating shutdown and collecting final results.
pub struct Orchestrator {
    /// Harness configuration
    pub(crate) config: HarnessConfig,

    /// Unit provider (shared across workers)
    pub(crate) provider: Arc<dyn UnitProvider>,

    /// Resource monitor, acquired once at startup
    pub(crate) monitor: Arc<dyn ResourceMonitor>,

    /// Source template handed to the provider
    pub(crate) template: Arc<str>,

    /// Shutdown latch; once `true` it stays set
    pub(crate) shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        config: HarnessConfig,
        provider: Arc<dyn UnitProvider>,
        monitor: Arc<dyn ResourceMonitor>,
        template: Arc<str>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            provider,
            monitor,
            template,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Stop a run in progress, or the next one if none has started yet
    ///
    /// The request is latched: every later [`run`](Self::run) on this
    /// orchestrator stops right after spawning its workers.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Get the harness configuration
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the harness
    ///
    /// Prints the header, starts every worker, then wakes every poll
    /// interval and emits a report line whenever more than one report
    /// interval has passed since the last one. Once the stop condition is
    /// met (or [`shutdown`](Self::shutdown) is called) workers are asked
    /// to stop, joined, and their final accumulators are written to the
    /// sink, one per worker in worker order.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Orchestration`] if every worker failed, and
    /// propagates sink write errors. Finals are written in both cases.
    pub async fn run(&self, sink: &mut dyn ReportSink) -> BenchResult<RunSummary> {
        let start = Instant::now();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tracing::info!(
            workers = self.config.workers,
            batch_size = self.config.batch_size,
            workload_size = self.config.workload_size,
            regeneration_threshold = ?self.config.regeneration_threshold,
            report_interval = ?self.config.report_interval,
            stop_condition = ?self.config.stop_condition,
            provider = self.provider.name(),
            monitor = self.monitor.name(),
            "Starting run"
        );

        sink.header()?;

        // Spawn workers on the blocking pool; they never yield
        let mut running = RunningWorkers::with_capacity(self.config.workers);
        let mut tasks = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let spawned = WorkerBuilder::new(worker_id)
                .provider(Arc::clone(&self.provider))
                .template(Arc::clone(&self.template))
                .batch_size(self.config.batch_size)
                .workload_size(self.config.workload_size)
                .regeneration_threshold(self.config.regeneration_threshold)
                .build();
            let worker = match spawned {
                Ok(worker) => worker,
                Err(e) => {
                    stop_workers(&running.handles);
                    join_workers(tasks, &running.handles).await;
                    return Err(e);
                }
            };

            running.handles.push(worker.handle());
            tasks.push(tokio::task::spawn_blocking(move || worker.run()));
        }

        let reported = self
            .report_loop(start, &running.handles, sink, &mut shutdown_rx)
            .await;

        stop_workers(&running.handles);
        let workers = join_workers(tasks, &running.handles).await;
        let finals: Vec<i64> = workers.iter().map(|s| s.cumulative_result).collect();
        let finals_written = sink.finals(&finals);

        let aggregated = aggregate_worker_stats(&workers);
        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            total_invocations = aggregated.total_invocations,
            total_regenerations = aggregated.total_regenerations,
            failed_workers = aggregated.failed_workers,
            invocations_per_second = aggregated.invocations_per_second,
            "Run completed"
        );

        let reports = reported?;
        finals_written?;

        if aggregated.total_workers > 0 && aggregated.healthy_workers() == 0 {
            return Err(BenchError::orchestration(format!(
                "All {} workers failed",
                aggregated.total_workers
            )));
        }

        Ok(RunSummary { reports, workers })
    }

    /// Sample workers until the stop condition is reached
    async fn report_loop(
        &self,
        start: Instant,
        handles: &[WorkerHandle],
        sink: &mut dyn ReportSink,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> BenchResult<Vec<ReportLine>> {
        let mut reports = Vec::new();
        let mut last_report = start;

        loop {
            if *shutdown_rx.borrow_and_update() {
                tracing::info!("Shutdown requested, stopping workers");
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            let samples: Vec<ExecutionReport> =
                handles.iter().map(WorkerHandle::current_report).collect();
            let failed_workers = samples.iter().filter(|r| r.failed).count();

            if failed_workers == samples.len() {
                tracing::error!(
                    workers = samples.len(),
                    "All workers failed, ending run early"
                );
                break;
            }

            if last_report.elapsed() > self.config.report_interval {
                let line = self.sample(start.elapsed(), &samples, failed_workers);
                sink.report(&line)?;
                reports.push(line);
                last_report = Instant::now();
            }

            if self.stop_condition_reached(start.elapsed(), reports.len()) {
                tracing::info!(
                    stop_condition = ?self.config.stop_condition,
                    reports = reports.len(),
                    "Stop condition reached"
                );
                break;
            }
        }

        Ok(reports)
    }

    fn sample(
        &self,
        elapsed: Duration,
        samples: &[ExecutionReport],
        failed_workers: usize,
    ) -> ReportLine {
        ReportLine {
            elapsed,
            cache_used_mb: bytes_to_mb(self.monitor.current_usage_bytes()),
            cache_max_mb: self.monitor.max_usage_bytes().map(bytes_to_mb),
            average_rate: average_rate(samples),
            failed_workers,
        }
    }

    fn stop_condition_reached(&self, elapsed: Duration, reports: usize) -> bool {
        match self.config.stop_condition {
            StopCondition::Indefinite => false,
            StopCondition::Duration(limit) => elapsed >= limit,
            StopCondition::Reports(n) => reports >= n,
        }
    }

    /// Run with Ctrl+C signal handling
    ///
    /// The first Ctrl+C triggers a graceful shutdown; a second one exits
    /// the process without waiting for workers to finish their batch.
    pub async fn run_with_signal_handling(
        &self,
        sink: &mut dyn ReportSink,
    ) -> BenchResult<RunSummary> {
        let shutdown_tx = Arc::clone(&self.shutdown_tx);

        // Spawn signal handler task
        let signal_handle = tokio::spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, &shutdown_tx).await {
                tracing::warn!("Received second Ctrl+C, exiting without waiting for workers");
                std::process::exit(130);
            }
        });

        let result = self.run(sink).await;

        // Abort signal handler if still running
        signal_handle.abort();

        result
    }
}

/// Latch a graceful shutdown on the first interrupt
///
/// Returns `true` once a second interrupt arrives and `false` if the
/// signal source fails.
pub(super) async fn watch_interrupts<S, F>(
    mut interrupt: S,
    shutdown_tx: &watch::Sender<bool>,
) -> bool
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupt().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return false;
    }
    tracing::info!("Received Ctrl+C, initiating graceful shutdown (press again to force exit)");
    shutdown_tx.send_replace(true);

    match interrupt().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            false
        }
    }
}

/// Handles of the workers spawned by one run
///
/// Dropping it asks every worker to stop, so a cancelled run never leaves
/// workers spinning on the blocking pool.
struct RunningWorkers {
    handles: Vec<WorkerHandle>,
}

impl RunningWorkers {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
        }
    }
}

impl Drop for RunningWorkers {
    fn drop(&mut self) {
        stop_workers(&self.handles);
    }
}

fn stop_workers(handles: &[WorkerHandle]) {
    for handle in handles {
        handle.request_stop();
    }
}

/// Wait for every worker thread, in order
///
/// A worker that failed or panicked is represented by the last values it
/// published, flagged as failed.
async fn join_workers(
    tasks: Vec<JoinHandle<BenchResult<WorkerStats>>>,
    handles: &[WorkerHandle],
) -> Vec<WorkerStats> {
    let mut results = Vec::with_capacity(tasks.len());
    for (idx, (task, handle)) in tasks.into_iter().zip(handles).enumerate() {
        match task.await {
            Ok(Ok(stats)) => {
                tracing::debug!(
                    worker_id = idx,
                    invocations = stats.invocations,
                    regenerations = stats.regenerations,
                    "Worker completed"
                );
                results.push(stats);
            }
            Ok(Err(e)) => {
                tracing::warn!(worker_id = idx, error = %e, "Worker returned error");
                let mut stats = WorkerStats::from(handle.current_report());
                stats.failed = true;
                results.push(stats);
            }
            Err(e) => {
                tracing::error!(worker_id = idx, error = %e, "Worker task panicked");
                let mut stats = WorkerStats::from(handle.current_report());
                stats.failed = true;
                results.push(stats);
            }
        }
    }
    results
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .field("monitor", &self.monitor.name())
            .finish()
    }
}
