//! Builder pattern for Worker construction

use crate::error::{BenchError, BenchResult};
use crate::traits::UnitProvider;

use super::executor::Worker;
use super::stats::WorkerMetrics;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Builder for creating Worker instances
///
/// # Example
/// ```
/// # use std::sync::Arc;
/// # use codechurn_core::code_cache::CodeCache;
/// # use codechurn_core::compiler::{KernelCompiler, DEFAULT_TEMPLATE};
/// # use codechurn_core::config::CacheConfig;
/// use codechurn_core::WorkerBuilder;
///
/// # let provider = Arc::new(KernelCompiler::new(CodeCache::new(CacheConfig::default())));
/// let worker = WorkerBuilder::new(0)
///     .provider(provider)
///     .template(DEFAULT_TEMPLATE)
///     .batch_size(10_000)
///     .workload_size(1_000)
///     .regeneration_threshold(Some(10_000))
///     .build()
///     .unwrap();
/// assert_eq!(worker.id(), 0);
/// ```
pub struct WorkerBuilder {
    id: usize,
    provider: Option<Arc<dyn UnitProvider>>,
    template: Option<Arc<str>>,
    batch_size: Option<u64>,
    workload_size: Option<u64>,
    regeneration_threshold: Option<u64>,
    stop: Option<Arc<AtomicBool>>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            provider: None,
            template: None,
            batch_size: None,
            workload_size: None,
            regeneration_threshold: None,
            stop: None,
        }
    }

    /// Set the unit provider
    pub fn provider(mut self, provider: Arc<dyn UnitProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the source template handed to the provider
    pub fn template(mut self, template: impl Into<Arc<str>>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the number of invocations per measurement window
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the workload size passed to every invocation
    pub fn workload_size(mut self, workload_size: u64) -> Self {
        self.workload_size = Some(workload_size);
        self
    }

    /// Set the regeneration threshold (`None` keeps the first unit)
    pub fn regeneration_threshold(mut self, threshold: Option<u64>) -> Self {
        self.regeneration_threshold = threshold;
        self
    }

    /// Observe an existing stop flag instead of a fresh one
    pub fn stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing or zero.
    pub fn build(self) -> BenchResult<Worker> {
        let provider = self.provider.ok_or(BenchError::missing_config("provider"))?;
        let template = self.template.ok_or(BenchError::missing_config("template"))?;
        let batch_size = self
            .batch_size
            .ok_or(BenchError::missing_config("batch_size"))?;
        let workload_size = self
            .workload_size
            .ok_or(BenchError::missing_config("workload_size"))?;

        if batch_size == 0 {
            return Err(BenchError::config("batch size must be at least 1"));
        }
        if self.regeneration_threshold == Some(0) {
            return Err(BenchError::config(
                "regeneration threshold must be at least 1",
            ));
        }

        Ok(Worker {
            id: self.id,
            provider,
            template,
            batch_size,
            workload_size,
            regeneration_threshold: self.regeneration_threshold,
            metrics: Arc::new(WorkerMetrics::new()),
            stop: self.stop.unwrap_or_default(),
        })
    }
}
