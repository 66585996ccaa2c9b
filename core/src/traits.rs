//! Collaborator traits consumed by the worker pool and the orchestrator
//!
//! The harness depends on two things it does not implement in its core loop:
//! something that turns a source template into an invokable unit, and
//! something that reports how much of a bounded cache is in use. Both are
//! modelled here as narrow traits; in-process implementations live in
//! [`crate::compiler`] and [`crate::monitor`].

// ============================================================================
// Executable Unit Provider
// ============================================================================

/// A single instance of generated, directly invokable logic
///
/// A unit is owned by exactly one worker. It is never shared and never
/// mutated from outside; regeneration replaces it with a fresh instance.
pub trait ExecutableUnit: Send {
    /// Run the unit once with the given workload size
    ///
    /// Cost must be proportional to `workload`; the returned value is an
    /// opaque checksum-like result.
    fn invoke(&mut self, workload: u64) -> i64;
}

/// Produces fresh executable units from a source template
pub trait UnitProvider: Send + Sync {
    /// Provider identifier used in logs
    fn name(&self) -> &str;

    /// Turn `template` into a new, independently owned unit
    ///
    /// Every call must return a distinct instance, even for the same
    /// template.
    fn produce(&self, template: &str) -> Result<Box<dyn ExecutableUnit>, CompileError>;
}

/// Reasons a provider could not produce a unit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A line did not match any statement form
    #[error("line {line}: syntax error: {message}")]
    Syntax {
        /// 1-based source line
        line: usize,
        /// What was expected
        message: String,
    },

    /// A name was used before it was declared
    #[error("line {line}: unknown identifier `{name}`")]
    UnknownIdentifier {
        /// 1-based source line
        line: usize,
        /// The offending name
        name: String,
    },

    /// A `}` without an open block, or a block left open at end of input
    #[error("line {line}: unbalanced block")]
    UnbalancedBlock {
        /// 1-based source line
        line: usize,
    },

    /// The template never returns a value
    #[error("template has no return statement")]
    MissingReturn,

    /// The bounded code cache has no room for another artifact
    #[error("code cache exhausted: requested {requested} bytes, {available} available")]
    CacheExhausted {
        /// Bytes the artifact needs
        requested: u64,
        /// Bytes left in the cache
        available: u64,
    },
}

// ============================================================================
// Resource Monitor
// ============================================================================

/// Read-only view of the bounded cache resource
pub trait ResourceMonitor: Send + Sync {
    /// Monitor identifier used in logs
    fn name(&self) -> &str;

    /// Bytes currently in use
    fn current_usage_bytes(&self) -> u64;

    /// Capacity in bytes, or `None` when the platform does not report one
    fn max_usage_bytes(&self) -> Option<u64>;
}
