//! Resource monitors for the bounded cache resource
//!
//! A monitor is located once at startup and handed to the orchestrator.
//! Locating one that the platform cannot provide is a setup failure.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::code_cache::CodeCache;
use crate::error::{BenchError, BenchResult};
use crate::traits::ResourceMonitor;

/// Which resource the report's cache columns sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitorKind {
    /// The in-process code cache compiled units are reserved in
    #[default]
    CodeCache,
    /// Resident set size of this process
    ProcessRss,
}

impl FromStr for MonitorKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code-cache" => Ok(MonitorKind::CodeCache),
            "process-rss" => Ok(MonitorKind::ProcessRss),
            other => Err(BenchError::config(format!(
                "unknown monitor `{other}` (expected `code-cache` or `process-rss`)"
            ))),
        }
    }
}

/// Acquire the monitor for `kind`, failing fast if it is unavailable
pub fn locate(
    kind: MonitorKind,
    cache: &Arc<CodeCache>,
) -> BenchResult<Arc<dyn ResourceMonitor>> {
    let monitor: Arc<dyn ResourceMonitor> = match kind {
        MonitorKind::CodeCache => Arc::new(CodeCacheMonitor::new(Arc::clone(cache))),
        MonitorKind::ProcessRss => Arc::new(ProcessMemoryMonitor::locate()?),
    };
    tracing::debug!(monitor = monitor.name(), "Resource monitor located");
    Ok(monitor)
}

/// Reports usage and capacity of a [`CodeCache`]
#[derive(Debug, Clone)]
pub struct CodeCacheMonitor {
    cache: Arc<CodeCache>,
}

impl CodeCacheMonitor {
    /// Monitor the given cache
    pub fn new(cache: Arc<CodeCache>) -> Self {
        Self { cache }
    }
}

impl ResourceMonitor for CodeCacheMonitor {
    fn name(&self) -> &str {
        "code-cache"
    }

    fn current_usage_bytes(&self) -> u64 {
        self.cache.used()
    }

    fn max_usage_bytes(&self) -> Option<u64> {
        Some(self.cache.capacity())
    }
}

/// Reads the resident set size of the current process from procfs
#[derive(Debug, Clone)]
pub struct ProcessMemoryMonitor {
    status_path: PathBuf,
}

impl ProcessMemoryMonitor {
    const STATUS_PATH: &'static str = "/proc/self/status";

    /// Locate the monitor, checking that `/proc/self/status` reports `VmRSS`
    pub fn locate() -> BenchResult<Self> {
        Self::at(Self::STATUS_PATH)
    }

    /// Locate the monitor against an arbitrary status file
    pub fn at(path: impl AsRef<Path>) -> BenchResult<Self> {
        let status_path = path.as_ref().to_path_buf();
        let status = fs::read_to_string(&status_path).map_err(|e| {
            BenchError::setup(format!(
                "process memory statistics unavailable ({}): {e}",
                status_path.display()
            ))
        })?;
        if parse_vm_rss(&status).is_none() {
            return Err(BenchError::setup(format!(
                "VmRSS not found in {}",
                status_path.display()
            )));
        }
        Ok(Self { status_path })
    }
}

impl ResourceMonitor for ProcessMemoryMonitor {
    fn name(&self) -> &str {
        "process-rss"
    }

    fn current_usage_bytes(&self) -> u64 {
        // a failed read after a successful locate reports zero rather than
        // stopping the run
        fs::read_to_string(&self.status_path)
            .ok()
            .and_then(|status| parse_vm_rss(&status))
            .unwrap_or(0)
    }

    fn max_usage_bytes(&self) -> Option<u64> {
        None
    }
}

/// Extract `VmRSS` in bytes from the contents of a procfs status file
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let kib: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") => kib.checked_mul(1024),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    const SAMPLE_STATUS: &str = "Name:\tcodechurn\nVmPeak:\t  204800 kB\nVmRSS:\t   10240 kB\nThreads:\t9\n";

    #[test]
    fn test_parse_vm_rss() {
        assert_eq!(parse_vm_rss(SAMPLE_STATUS), Some(10240 * 1024));
        assert_eq!(parse_vm_rss("Name:\tx\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\tlots kB\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\t12\n"), None);
    }

    #[test]
    fn test_code_cache_monitor_tracks_cache() {
        let cache = CodeCache::new(CacheConfig {
            capacity_bytes: 1 << 20,
            segment_bytes: 4096,
        });
        let monitor = CodeCacheMonitor::new(Arc::clone(&cache));
        assert_eq!(monitor.current_usage_bytes(), 0);
        assert_eq!(monitor.max_usage_bytes(), Some(1 << 20));

        let _lease = cache.reserve(1).unwrap();
        assert_eq!(monitor.current_usage_bytes(), 4096);
    }

    #[test]
    fn test_locate_missing_status_is_setup_failure() {
        let err = ProcessMemoryMonitor::at("/nonexistent/status").unwrap_err();
        assert!(matches!(err, BenchError::Setup(_)));
    }

    #[test]
    fn test_monitor_kind_from_str() {
        assert_eq!(
            "code-cache".parse::<MonitorKind>().unwrap(),
            MonitorKind::CodeCache
        );
        assert_eq!(
            "process-rss".parse::<MonitorKind>().unwrap(),
            MonitorKind::ProcessRss
        );
        assert!("jvm".parse::<MonitorKind>().is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_monitor_reads_self() {
        let monitor = ProcessMemoryMonitor::locate().unwrap();
        assert!(monitor.current_usage_bytes() > 0);
        assert_eq!(monitor.max_usage_bytes(), None);
    }
}
