//! Periodic report lines and where they are written
//!
//! Stdout carries only the header, one line per reporting interval and
//! the final accumulators; everything else goes through `tracing`.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use crate::error::BenchResult;

/// Column header printed once before the first report line
pub const HEADER: &str = "Elapsed (s)  Used Code Cache (Mb)  Max Code Cache (Mb)  Invocations/s";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert a byte count to (binary) megabytes
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// One sample of aggregate harness behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    /// Time since the run started
    pub elapsed: Duration,

    /// Cache resource in use
    pub cache_used_mb: f64,

    /// Cache resource capacity, if the monitor reports one
    pub cache_max_mb: Option<f64>,

    /// Unweighted mean of every worker's published rate
    pub average_rate: f64,

    /// Workers that have stopped on an error
    pub failed_workers: usize,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{}    {:.2}    ",
            self.elapsed.as_secs(),
            self.cache_used_mb
        )?;
        match self.cache_max_mb {
            Some(max) => write!(f, "{max:.2}")?,
            None => f.write_str("n/a")?,
        }
        write!(f, "    {:.2}", self.average_rate)?;
        if self.failed_workers > 0 {
            write!(f, "    [{} worker(s) failed]", self.failed_workers)?;
        }
        Ok(())
    }
}

/// Destination for the run's human-readable output
pub trait ReportSink: Send {
    /// Called once before any worker starts reporting
    fn header(&mut self) -> BenchResult<()>;

    /// Called once per reporting interval
    fn report(&mut self, line: &ReportLine) -> BenchResult<()>;

    /// Called once at shutdown with each worker's cumulative result, in
    /// worker order
    fn finals(&mut self, results: &[i64]) -> BenchResult<()>;
}

/// Writes report output as plain text lines
pub struct ConsoleReporter<W: Write + Send = io::Stdout> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    /// Reporter on standard output
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    /// Reporter on an arbitrary writer
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the reporter and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ReportSink for ConsoleReporter<W> {
    fn header(&mut self) -> BenchResult<()> {
        writeln!(self.out, "{HEADER}")?;
        self.out.flush()?;
        Ok(())
    }

    fn report(&mut self, line: &ReportLine) -> BenchResult<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }

    fn finals(&mut self, results: &[i64]) -> BenchResult<()> {
        for result in results {
            writeln!(self.out, "{result}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> fmt::Debug for ConsoleReporter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleReporter").finish_non_exhaustive()
    }
}
