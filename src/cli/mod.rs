//! CLI argument parsing and run dispatch

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use codechurn_core::code_cache::CodeCache;
use codechurn_core::compiler::{KernelCompiler, DEFAULT_TEMPLATE};
use codechurn_core::monitor::{self, MonitorKind};
use codechurn_core::{ConsoleReporter, HarnessConfig, OrchestratorBuilder, StopCondition};

#[derive(Parser, Debug)]
#[command(name = "codechurn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, env = "CODECHURN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of worker threads [default: available parallelism]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Invocations per measurement window
    #[arg(long)]
    pub batch_size: Option<u64>,

    /// Workload size passed to every invocation
    #[arg(long)]
    pub workload_size: Option<u64>,

    /// Invocations between unit regenerations
    #[arg(long, conflicts_with = "no_regenerate")]
    pub regeneration_threshold: Option<u64>,

    /// Keep the first unit for the whole run
    #[arg(long)]
    pub no_regenerate: bool,

    /// Time between report lines (e.g. "3s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub report_interval: Option<Duration>,

    /// How often the reporting loop wakes up (e.g. "10ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Stop after this much wall-clock time (e.g. "1m")
    #[arg(long, value_parser = humantime::parse_duration, conflicts_with = "reports")]
    pub duration: Option<Duration>,

    /// Stop after this many report lines
    #[arg(long)]
    pub reports: Option<usize>,

    /// Code cache capacity in bytes; accepts K/M/G suffixes
    #[arg(long, value_parser = parse_bytes)]
    pub cache_capacity: Option<u64>,

    /// Code cache segment size in bytes; accepts K/M/G suffixes
    #[arg(long, value_parser = parse_bytes)]
    pub cache_segment: Option<u64>,

    /// Resource sampled in the report's cache columns
    #[arg(long, default_value = "code-cache")]
    pub monitor: MonitorKind,

    /// Kernel template file [default: built-in reference workload]
    #[arg(long)]
    pub template: Option<PathBuf>,
}

impl Cli {
    /// Load the configuration file, if any, and apply flag overrides
    pub fn harness_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => HarnessConfig::default(),
        };

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(workload_size) = self.workload_size {
            config.workload_size = workload_size;
        }
        if self.no_regenerate {
            config.regeneration_threshold = None;
        } else if let Some(threshold) = self.regeneration_threshold {
            config.regeneration_threshold = Some(threshold);
        }
        if let Some(interval) = self.report_interval {
            config.report_interval = interval;
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval = interval;
        }
        if let Some(duration) = self.duration {
            config.stop_condition = StopCondition::Duration(duration);
        } else if let Some(reports) = self.reports {
            config.stop_condition = StopCondition::Reports(reports);
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache.capacity_bytes = capacity;
        }
        if let Some(segment) = self.cache_segment {
            config.cache.segment_bytes = segment;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read the kernel template, falling back to the built-in one
    pub fn template_source(&self) -> Result<String> {
        match &self.template {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read template {}", path.display())),
            None => Ok(DEFAULT_TEMPLATE.to_string()),
        }
    }
}

/// Run the harness until Ctrl+C or the configured stop condition
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.harness_config()?;
    let template = cli.template_source()?;

    tracing::info!(
        workers = config.workers,
        batch_size = config.batch_size,
        workload_size = config.workload_size,
        regeneration_threshold = ?config.regeneration_threshold,
        report_interval = ?config.report_interval,
        poll_interval = ?config.poll_interval,
        stop_condition = ?config.stop_condition,
        cache_capacity = config.cache.capacity_bytes,
        monitor = ?cli.monitor,
        "codechurn starting"
    );

    let cache = CodeCache::new(config.cache);
    let resource_monitor = monitor::locate(cli.monitor, &cache)?;
    let compiler = Arc::new(KernelCompiler::new(Arc::clone(&cache)));

    let orchestrator = OrchestratorBuilder::new()
        .config(config)
        .provider(compiler)
        .monitor(resource_monitor)
        .template(template)
        .build()?;

    let summary = orchestrator
        .run_with_signal_handling(&mut ConsoleReporter::stdout())
        .await?;

    tracing::info!(
        reports = summary.reports.len(),
        workers = summary.workers.len(),
        "codechurn finished"
    );

    Ok(())
}

/// Parse a byte count such as `65536`, `64K`, `12M` or `1G` (binary units)
fn parse_bytes(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(digits_end);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid byte count `{raw}`"))?;
    let scale: u64 = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1 << 10,
        "M" | "MB" | "MIB" => 1 << 20,
        "G" | "GB" | "GIB" => 1 << 30,
        other => return Err(format!("unknown size suffix `{other}`")),
    };
    value
        .checked_mul(scale)
        .ok_or_else(|| format!("byte count `{raw}` is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("codechurn").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = parse(&[]);
        let config = cli.harness_config().unwrap();
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.regeneration_threshold, Some(10_000));
        assert_eq!(config.stop_condition, StopCondition::Indefinite);
        assert_eq!(cli.monitor, MonitorKind::CodeCache);
        assert_eq!(cli.template_source().unwrap(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_flag_overrides() {
        let cli = parse(&[
            "--workers",
            "2",
            "--batch-size",
            "100",
            "--workload-size",
            "1",
            "--regeneration-threshold",
            "50",
            "--report-interval",
            "1s",
            "--poll-interval",
            "5ms",
            "--reports",
            "2",
            "--cache-capacity",
            "12M",
            "--cache-segment",
            "4K",
            "--monitor",
            "process-rss",
        ]);
        let config = cli.harness_config().unwrap();

        assert_eq!(config.workers, 2);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.workload_size, 1);
        assert_eq!(config.regeneration_threshold, Some(50));
        assert_eq!(config.report_interval, Duration::from_secs(1));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.stop_condition, StopCondition::Reports(2));
        assert_eq!(config.cache.capacity_bytes, 12 * 1024 * 1024);
        assert_eq!(config.cache.segment_bytes, 4096);
        assert_eq!(cli.monitor, MonitorKind::ProcessRss);
    }

    #[test]
    fn test_no_regenerate() {
        let cli = parse(&["--no-regenerate", "--duration", "30s"]);
        let config = cli.harness_config().unwrap();
        assert_eq!(config.regeneration_threshold, None);
        assert_eq!(
            config.stop_condition,
            StopCondition::Duration(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        let args = ["codechurn", "--no-regenerate", "--regeneration-threshold", "5"];
        assert!(Cli::try_parse_from(args).is_err());

        let args = ["codechurn", "--duration", "1s", "--reports", "3"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_config_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "workers": 3, "batch_size": 500, "report_interval": "2s" }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["--config", &path, "--batch-size", "250"]);
        let config = cli.harness_config().unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.report_interval, Duration::from_secs(2));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = parse(&["--config", "/nonexistent/codechurn.json"]);
        let err = cli.harness_config().unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_malformed_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["--config", &path]);
        let err = cli.harness_config().unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let cli = parse(&["--workers", "0"]);
        assert!(cli.harness_config().is_err());
    }

    #[test]
    fn test_template_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "let a = count\nreturn a").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["--template", &path]);
        assert_eq!(cli.template_source().unwrap(), "let a = count\nreturn a\n");
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("65536"), Ok(65536));
        assert_eq!(parse_bytes("64K"), Ok(64 * 1024));
        assert_eq!(parse_bytes("12MiB"), Ok(12 * 1024 * 1024));
        assert_eq!(parse_bytes("1g"), Ok(1 << 30));
        assert!(parse_bytes("lots").is_err());
        assert!(parse_bytes("12X").is_err());
        assert!(parse_bytes("99999999999999G").is_err());
    }
}
