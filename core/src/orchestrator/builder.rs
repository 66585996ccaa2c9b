//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use crate::compiler::DEFAULT_TEMPLATE;
use crate::config::{HarnessConfig, StopCondition};
use crate::error::{BenchError, BenchResult};
use crate::traits::{ResourceMonitor, UnitProvider};

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```
/// # use std::sync::Arc;
/// # use codechurn_core::code_cache::CodeCache;
/// # use codechurn_core::compiler::KernelCompiler;
/// # use codechurn_core::config::CacheConfig;
/// # use codechurn_core::monitor::CodeCacheMonitor;
/// use codechurn_core::{OrchestratorBuilder, StopCondition};
///
/// let cache = CodeCache::new(CacheConfig::default());
/// let orchestrator = OrchestratorBuilder::new()
///     .workers(4)
///     .stop_condition(StopCondition::Reports(10))
///     .provider(Arc::new(KernelCompiler::new(Arc::clone(&cache))))
///     .monitor(Arc::new(CodeCacheMonitor::new(cache)))
///     .build()
///     .unwrap();
/// assert_eq!(orchestrator.config().workers, 4);
/// ```
pub struct OrchestratorBuilder {
    config: HarnessConfig,
    provider: Option<Arc<dyn UnitProvider>>,
    monitor: Option<Arc<dyn ResourceMonitor>>,
    template: Arc<str>,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
            provider: None,
            monitor: None,
            template: Arc::from(DEFAULT_TEMPLATE),
        }
    }

    /// Set the full harness configuration
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the stop condition
    pub fn stop_condition(mut self, stop: StopCondition) -> Self {
        self.config.stop_condition = stop;
        self
    }

    /// Set the unit provider shared by every worker
    pub fn provider(mut self, provider: Arc<dyn UnitProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the resource monitor sampled on every report
    pub fn monitor(mut self, monitor: Arc<dyn ResourceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Set the source template (defaults to [`DEFAULT_TEMPLATE`])
    pub fn template(mut self, template: impl Into<Arc<str>>) -> Self {
        self.template = template.into();
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if provider or monitor are not set, or if
    /// configuration validation fails.
    pub fn build(self) -> BenchResult<Orchestrator> {
        let provider = self
            .provider
            .ok_or_else(|| BenchError::missing_config("provider"))?;

        let monitor = self
            .monitor
            .ok_or_else(|| BenchError::missing_config("monitor"))?;

        self.config
            .validate()
            .map_err(|e| BenchError::config(e.to_string()))?;

        Ok(Orchestrator::new(self.config, provider, monitor, self.template))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
