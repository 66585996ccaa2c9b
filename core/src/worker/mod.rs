//! Worker module for executing regenerating units
//!
//! The Worker is the measurement engine of codechurn, responsible for one
//! simple but hot loop: **invoke a batch -> publish -> maybe regenerate ->
//! repeat**.
//!
//! Each Worker owns exactly one active executable unit at a time and runs
//! on its own OS thread. It:
//!
//! 1. Obtains a unit from the [`UnitProvider`](crate::traits::UnitProvider)
//! 2. Invokes it `batch_size` times, folding results into a wrapping
//!    accumulator
//! 3. Publishes the batch rate and counters to lock-free metrics
//! 4. Replaces the unit once the regeneration threshold is reached
//! 5. Repeats until a stop is requested at a batch boundary
//!
//! A provider failure ends the worker; it is logged with the worker ID and
//! phase and surfaced to the orchestrator as [`BenchError::Worker`].
//!
//! # Example
//!
//! ```
//! # use std::sync::Arc;
//! # use codechurn_core::code_cache::CodeCache;
//! # use codechurn_core::compiler::{KernelCompiler, DEFAULT_TEMPLATE};
//! # use codechurn_core::config::CacheConfig;
//! use codechurn_core::worker::WorkerBuilder;
//!
//! # let provider = Arc::new(KernelCompiler::new(CodeCache::new(CacheConfig::default())));
//! let worker = WorkerBuilder::new(0)
//!     .provider(provider)
//!     .template(DEFAULT_TEMPLATE)
//!     .batch_size(100)
//!     .workload_size(10)
//!     .regeneration_threshold(Some(200))
//!     .build()
//!     .unwrap();
//!
//! let handle = worker.handle();
//! let thread = std::thread::spawn(move || worker.run());
//! while handle.current_report().invocations < 1_000 {
//!     std::thread::yield_now();
//! }
//! handle.request_stop();
//!
//! let stats = thread.join().unwrap().unwrap();
//! assert!(stats.regenerations >= 1);
//! ```
//!
//! [`BenchError::Worker`]: crate::error::BenchError::Worker

mod builder;
mod executor;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::{Worker, WorkerHandle};
pub use stats::{compute_rate, ExecutionReport, WorkerMetrics, WorkerStats};
