//! Bounded code cache shared by every compiled unit
//!
//! The cache is a byte budget, not a store: a compiled unit reserves its
//! footprint when it is produced and gives it back when it is dropped.
//! Reservations are a single compare-and-swap on an atomic counter, so
//! workers regenerating concurrently never take a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::traits::CompileError;

/// Fixed-capacity byte budget for compiled artifacts
#[derive(Debug)]
pub struct CodeCache {
    capacity: u64,
    segment: u64,
    used: AtomicU64,
    artifacts: AtomicU64,
}

impl CodeCache {
    /// Create an empty cache
    pub fn new(config: CacheConfig) -> Arc<Self> {
        Arc::new(Self {
            capacity: config.capacity_bytes,
            segment: config.segment_bytes.max(1),
            used: AtomicU64::new(0),
            artifacts: AtomicU64::new(0),
        })
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes currently reserved by live artifacts
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Number of live artifacts
    pub fn artifacts(&self) -> u64 {
        self.artifacts.load(Ordering::Relaxed)
    }

    /// Round `bytes` up to a whole number of segments (minimum one)
    pub fn footprint(&self, bytes: u64) -> u64 {
        bytes.max(1).div_ceil(self.segment) * self.segment
    }

    /// Reserve room for an artifact of `bytes` raw size
    ///
    /// The returned lease releases the reservation when dropped.
    pub fn reserve(self: &Arc<Self>, bytes: u64) -> Result<CacheLease, CompileError> {
        let size = self.footprint(bytes);
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            let available = self.capacity.saturating_sub(current);
            if size > available {
                return Err(CompileError::CacheExhausted {
                    requested: size,
                    available,
                });
            }
            match self.used.compare_exchange_weak(
                current,
                current + size,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        self.artifacts.fetch_add(1, Ordering::Relaxed);

        Ok(CacheLease {
            cache: Arc::clone(self),
            size,
        })
    }
}

/// A live reservation in the [`CodeCache`]
#[derive(Debug)]
pub struct CacheLease {
    cache: Arc<CodeCache>,
    size: u64,
}

impl CacheLease {
    /// Bytes held by this lease
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for CacheLease {
    fn drop(&mut self) {
        self.cache.used.fetch_sub(self.size, Ordering::AcqRel);
        self.cache.artifacts.fetch_sub(1, Ordering::Relaxed);
    }
}
