//! Orchestrator for run lifecycle management
//!
//! The Orchestrator coordinates a complete harness run:
//! - Spawning one worker per configured thread on the blocking pool
//! - Sampling worker rates and the resource monitor on a fixed cadence
//! - Managing graceful shutdown via a latched watch channel and per-worker
//!   stop flags
//! - Collecting and printing each worker's final accumulator
//!
//! Workers and the orchestrator never wait on each other; the reporting
//! loop reads whatever each worker last published.
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use codechurn_core::code_cache::CodeCache;
//! # use codechurn_core::compiler::KernelCompiler;
//! # use codechurn_core::config::CacheConfig;
//! # use codechurn_core::monitor::CodeCacheMonitor;
//! use codechurn_core::report::ConsoleReporter;
//! use codechurn_core::OrchestratorBuilder;
//!
//! # async fn demo() -> codechurn_core::BenchResult<()> {
//! let cache = CodeCache::new(CacheConfig::default());
//! let orchestrator = OrchestratorBuilder::new()
//!     .provider(Arc::new(KernelCompiler::new(Arc::clone(&cache))))
//!     .monitor(Arc::new(CodeCacheMonitor::new(cache)))
//!     .build()?;
//!
//! let summary = orchestrator
//!     .run_with_signal_handling(&mut ConsoleReporter::stdout())
//!     .await?;
//! println!("{} report lines", summary.reports.len());
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_stats, average_rate, AggregatedStats};
pub use builder::OrchestratorBuilder;
pub use executor::{Orchestrator, RunSummary};
