//! In-process executable unit provider
//!
//! `KernelCompiler` turns a kernel template into a fresh [`ExecutableUnit`]
//! on every call. "Compilation" here is a full re-parse of the template into
//! a new statement tree plus a reservation in the shared [`CodeCache`], so
//! repeated regeneration produces the same kind of artifact churn a JIT
//! would, without embedding one.
//!
//! # Kernel language
//!
//! One statement per line, `#` starts a comment:
//!
//! ```text
//! let <name> = <operand>
//! <name> (+= | -= | *= | ^=) <operand>
//! repeat <operand> {
//! }
//! return <name>
//! ```
//!
//! Operands are `count` (the invocation's workload size), `random` (a fresh
//! pseudo-random value), an integer literal, or a declared variable.
//! Arithmetic wraps on overflow.
//!
//! # Example
//!
//! ```
//! use codechurn_core::compiler::{KernelCompiler, DEFAULT_TEMPLATE};
//! use codechurn_core::config::CacheConfig;
//! use codechurn_core::code_cache::CodeCache;
//! use codechurn_core::UnitProvider;
//!
//! let compiler = KernelCompiler::new(CodeCache::new(CacheConfig::default()));
//! let mut unit = compiler.produce("let a = count\na *= 2\nreturn a").unwrap();
//! assert_eq!(unit.invoke(21), 42);
//! ```

mod parse;
mod program;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::code_cache::{CacheLease, CodeCache};
use crate::traits::{CompileError, ExecutableUnit, UnitProvider};

use program::Program;

/// Reference workload: start from `count`, add `count` random values
pub const DEFAULT_TEMPLATE: &str = "\
let result = count
repeat count {
    result += random
}
return result
";

/// Parses kernel templates into fresh units backed by a bounded code cache
#[derive(Debug)]
pub struct KernelCompiler {
    cache: Arc<CodeCache>,
    produced: AtomicU64,
}

impl KernelCompiler {
    /// Create a compiler that allocates artifacts in `cache`
    pub fn new(cache: Arc<CodeCache>) -> Self {
        Self {
            cache,
            produced: AtomicU64::new(0),
        }
    }

    /// The cache artifacts are reserved in
    pub fn cache(&self) -> &Arc<CodeCache> {
        &self.cache
    }

    /// Number of units produced so far
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }
}

impl UnitProvider for KernelCompiler {
    fn name(&self) -> &str {
        "kernel"
    }

    fn produce(&self, template: &str) -> Result<Box<dyn ExecutableUnit>, CompileError> {
        let program = parse::parse(template)?;
        let raw_size = (template.len() + program.size_bytes()) as u64;
        let lease = self.cache.reserve(raw_size)?;
        let generation = self.produced.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::trace!(
            generation,
            footprint = lease.size(),
            cache_used = self.cache.used(),
            "Compiled kernel"
        );

        Ok(Box::new(KernelUnit {
            vars: vec![0; program.slots],
            program,
            rng: SmallRng::from_entropy(),
            _lease: lease,
        }))
    }
}

/// One compiled kernel instance; releases its cache lease when dropped
struct KernelUnit {
    program: Program,
    vars: Vec<i64>,
    rng: SmallRng,
    _lease: CacheLease,
}

impl ExecutableUnit for KernelUnit {
    fn invoke(&mut self, workload: u64) -> i64 {
        let count = i64::try_from(workload).unwrap_or(i64::MAX);
        self.program.run(&mut self.vars, count, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn compiler_with(capacity: u64, segment: u64) -> KernelCompiler {
        KernelCompiler::new(CodeCache::new(CacheConfig {
            capacity_bytes: capacity,
            segment_bytes: segment,
        }))
    }

    #[test]
    fn test_deterministic_template() {
        let compiler = compiler_with(1 << 20, 4096);
        let mut unit = compiler
            .produce("let acc = count\nrepeat count {\n  acc += 2\n}\nreturn acc")
            .unwrap();
        assert_eq!(unit.invoke(10), 30);
        // state does not leak between invocations
        assert_eq!(unit.invoke(10), 30);
    }

    #[test]
    fn test_default_template_zero_workload() {
        let compiler = compiler_with(1 << 20, 4096);
        let mut unit = compiler.produce(DEFAULT_TEMPLATE).unwrap();
        assert_eq!(unit.invoke(0), 0);
    }

    #[test]
    fn test_each_produce_reserves_cache() {
        let compiler = compiler_with(1 << 20, 4096);
        let a = compiler.produce(DEFAULT_TEMPLATE).unwrap();
        let b = compiler.produce(DEFAULT_TEMPLATE).unwrap();
        assert_eq!(compiler.produced(), 2);
        assert_eq!(compiler.cache().artifacts(), 2);
        assert_eq!(compiler.cache().used(), 2 * 4096);

        drop(a);
        drop(b);
        assert_eq!(compiler.cache().used(), 0);
    }

    #[test]
    fn test_units_have_independent_random_streams() {
        let compiler = compiler_with(1 << 20, 4096);
        let mut a = compiler.produce(DEFAULT_TEMPLATE).unwrap();
        let mut b = compiler.produce(DEFAULT_TEMPLATE).unwrap();
        let xs: Vec<i64> = (0..4).map(|_| a.invoke(8)).collect();
        let ys: Vec<i64> = (0..4).map(|_| b.invoke(8)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_parse_error_is_propagated() {
        let compiler = compiler_with(1 << 20, 4096);
        let err = compiler.produce("return nothing").err().unwrap();
        assert!(matches!(err, CompileError::UnknownIdentifier { line: 1, .. }));
        assert_eq!(compiler.produced(), 0);
        assert_eq!(compiler.cache().used(), 0);
    }

    #[test]
    fn test_full_cache_rejects_units() {
        let compiler = compiler_with(4096, 4096);
        let _held = compiler.produce(DEFAULT_TEMPLATE).unwrap();
        let err = compiler.produce(DEFAULT_TEMPLATE).err().unwrap();
        assert!(matches!(err, CompileError::CacheExhausted { .. }));
    }
}
