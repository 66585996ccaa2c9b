//! Harness configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Harness configuration
///
/// Everything the reference workload hard-codes is tunable here. The
/// defaults reproduce the reference configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Number of worker threads
    pub workers: usize,

    /// Invocations per measurement window
    pub batch_size: u64,

    /// Workload size passed to every invocation
    pub workload_size: u64,

    /// Invocations between regenerations; `None` keeps the first unit forever
    pub regeneration_threshold: Option<u64>,

    /// How often a report line is printed
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,

    /// How often the reporting loop wakes up to check the clock
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// When the run ends
    pub stop_condition: StopCondition,

    /// Bounded code cache sizing
    pub cache: CacheConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            batch_size: 10_000,
            workload_size: 1_000,
            regeneration_threshold: Some(10_000),
            report_interval: Duration::from_secs(3),
            poll_interval: Duration::from_millis(10),
            stop_condition: StopCondition::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with the given worker count
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the per-invocation workload size
    pub fn with_workload_size(mut self, workload_size: u64) -> Self {
        self.workload_size = workload_size;
        self
    }

    /// Set the regeneration threshold (`None` disables regeneration)
    pub fn with_regeneration_threshold(mut self, threshold: Option<u64>) -> Self {
        self.regeneration_threshold = threshold;
        self
    }

    /// Set the reporting interval
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set the polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the stop condition
    pub fn with_stop_condition(mut self, stop: StopCondition) -> Self {
        self.stop_condition = stop;
        self
    }

    /// Set the code cache sizing
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(
                "worker count must be at least 1".into(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatch(
                "batch size must be at least 1".into(),
            ));
        }

        if self.regeneration_threshold == Some(0) {
            return Err(ConfigError::InvalidBatch(
                "regeneration threshold must be at least 1".into(),
            ));
        }

        if self.report_interval.is_zero() || self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "report and poll intervals must be positive".into(),
            ));
        }

        if self.poll_interval > self.report_interval {
            return Err(ConfigError::InvalidInterval(format!(
                "poll interval {:?} is longer than report interval {:?}",
                self.poll_interval, self.report_interval
            )));
        }

        match self.stop_condition {
            StopCondition::Reports(0) => {
                return Err(ConfigError::InvalidStopCondition(
                    "report count must be at least 1".into(),
                ));
            }
            StopCondition::Duration(d) if d.is_zero() => {
                return Err(ConfigError::InvalidStopCondition(
                    "run duration must be positive".into(),
                ));
            }
            _ => {}
        }

        self.cache.validate()
    }
}

/// Sizing of the bounded code cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total bytes available to compiled artifacts
    pub capacity_bytes: u64,

    /// Allocation granularity; every artifact occupies whole segments
    pub segment_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 64 * 1024 * 1024,
            segment_bytes: 64 * 1024,
        }
    }
}

impl CacheConfig {
    /// Validate the cache sizing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_bytes == 0 || self.segment_bytes == 0 {
            return Err(ConfigError::InvalidCache(
                "cache capacity and segment size must be positive".into(),
            ));
        }
        if self.segment_bytes > self.capacity_bytes {
            return Err(ConfigError::InvalidCache(format!(
                "segment size {} exceeds capacity {}",
                self.segment_bytes, self.capacity_bytes
            )));
        }
        Ok(())
    }
}

/// When a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// Run until interrupted (Ctrl+C) or shut down explicitly
    #[default]
    Indefinite,

    /// Run for the given wall-clock time
    Duration(#[serde(with = "humantime_serde")] Duration),

    /// Stop after printing this many report lines
    Reports(usize),
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count: {0}")]
    InvalidWorkers(String),

    /// Invalid batch size or regeneration threshold
    #[error("Invalid batch settings: {0}")]
    InvalidBatch(String),

    /// Invalid report or poll interval
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Invalid stop condition
    #[error("Invalid stop condition: {0}")]
    InvalidStopCondition(String),

    /// Invalid cache sizing
    #[error("Invalid cache configuration: {0}")]
    InvalidCache(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference() {
        let config = HarnessConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.workload_size, 1_000);
        assert_eq!(config.regeneration_threshold, Some(10_000));
        assert_eq!(config.report_interval, Duration::from_secs(3));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.stop_condition, StopCondition::Indefinite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = HarnessConfig::new(2)
            .with_batch_size(100)
            .with_workload_size(1)
            .with_regeneration_threshold(Some(50))
            .with_report_interval(Duration::from_secs(1))
            .with_stop_condition(StopCondition::Reports(2));

        assert_eq!(config.workers, 2);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.regeneration_threshold, Some(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workload_is_valid() {
        let config = HarnessConfig::new(1).with_workload_size(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_workers() {
        let config = HarnessConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkers(_))
        ));
    }

    #[test]
    fn test_config_validation_zero_batch() {
        let config = HarnessConfig::new(1).with_batch_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBatch(_))));
    }

    #[test]
    fn test_config_validation_zero_threshold() {
        let config = HarnessConfig::new(1).with_regeneration_threshold(Some(0));
        assert!(config.validate().is_err());

        let disabled = HarnessConfig::new(1).with_regeneration_threshold(None);
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_config_validation_poll_longer_than_report() {
        let config = HarnessConfig::new(1)
            .with_report_interval(Duration::from_millis(5))
            .with_poll_interval(Duration::from_millis(10));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_config_validation_stop_conditions() {
        let zero_reports = HarnessConfig::new(1).with_stop_condition(StopCondition::Reports(0));
        assert!(zero_reports.validate().is_err());

        let zero_duration =
            HarnessConfig::new(1).with_stop_condition(StopCondition::Duration(Duration::ZERO));
        assert!(zero_duration.validate().is_err());
    }

    #[test]
    fn test_cache_validation() {
        let segment_too_big = CacheConfig {
            capacity_bytes: 1024,
            segment_bytes: 4096,
        };
        assert!(segment_too_big.validate().is_err());

        let empty = CacheConfig {
            capacity_bytes: 0,
            segment_bytes: 0,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "workers": 4,
            "report_interval": "1s",
            "poll_interval": "5ms",
            "stop_condition": { "duration": "30s" },
            "cache": { "capacity_bytes": 12582912 }
        }"#;
        let config: HarnessConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.workers, 4);
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.report_interval, Duration::from_secs(1));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(
            config.stop_condition,
            StopCondition::Duration(Duration::from_secs(30))
        );
        assert_eq!(config.cache.capacity_bytes, 12 * 1024 * 1024);
        assert_eq!(config.cache.segment_bytes, 64 * 1024);
    }
}
