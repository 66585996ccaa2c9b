//! Error types for codechurn-core

use std::fmt;

use thiserror::Error;

use crate::traits::CompileError;

/// Where in its lifecycle a worker was when its unit could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Producing the first unit, before any invocation
    Startup,
    /// Replacing the active unit after the regeneration threshold
    Regeneration,
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerPhase::Startup => f.write_str("startup"),
            WorkerPhase::Regeneration => f.write_str("regeneration"),
        }
    }
}

/// Core error type
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration failed validation
    #[error("configuration error: {0}")]
    Config(String),

    /// A builder was finished without a required field
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// The environment cannot support the harness (e.g. no resource monitor)
    #[error("setup failure: {0}")]
    Setup(String),

    /// A worker could not obtain an executable unit
    #[error("worker {worker_id} failed during {phase}: {source}")]
    Worker {
        /// Index of the failed worker
        worker_id: usize,
        /// Lifecycle phase at the time of failure
        phase: WorkerPhase,
        /// Underlying provider error
        #[source]
        source: CompileError,
    },

    /// The run as a whole could not continue
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Shorthand for [`BenchError::Config`]
    pub fn config(message: impl Into<String>) -> Self {
        BenchError::Config(message.into())
    }

    /// Shorthand for [`BenchError::MissingConfig`]
    pub fn missing_config(field: &'static str) -> Self {
        BenchError::MissingConfig(field)
    }

    /// Shorthand for [`BenchError::Setup`]
    pub fn setup(message: impl Into<String>) -> Self {
        BenchError::Setup(message.into())
    }

    /// Shorthand for [`BenchError::Worker`]
    pub fn worker(worker_id: usize, phase: WorkerPhase, source: CompileError) -> Self {
        BenchError::Worker {
            worker_id,
            phase,
            source,
        }
    }

    /// Shorthand for [`BenchError::Orchestration`]
    pub fn orchestration(message: impl Into<String>) -> Self {
        BenchError::Orchestration(message.into())
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
