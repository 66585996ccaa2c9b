//! codechurn-core: a concurrent throughput harness for regenerating code
//!
//! This crate measures how fast a pool of workers can invoke freshly
//! produced executable units while those units are continually thrown
//! away and rebuilt, and samples a bounded cache resource while it runs.
//! It provides:
//!
//! - Collaborator traits (`UnitProvider`, `ExecutableUnit`, `ResourceMonitor`)
//! - A kernel compiler and the bounded code cache its units live in
//! - The worker loop with lock-free per-worker metrics
//! - The orchestrator with its periodic reporting loop
//! - Configuration and error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod code_cache;
pub mod compiler;
pub mod config;
pub mod error;
pub mod monitor;
pub mod orchestrator;
pub mod report;
pub mod traits;
pub mod worker;

pub use config::{CacheConfig, ConfigError, HarnessConfig, StopCondition};
pub use error::*;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RunSummary};
pub use report::{ConsoleReporter, ReportLine, ReportSink};
pub use traits::*;
pub use worker::{ExecutionReport, Worker, WorkerBuilder, WorkerHandle, WorkerStats};
