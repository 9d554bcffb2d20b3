//! I/O operations for benchmark sessions.
//!
//! Every session writes into its own timestamped directory:
//!
//! ```text
//! <root>/benchmark_results_2024-05-01_14-03-22_key_128bit/
//!   ├─ benchmark_results.csv
//!   ├─ session.json
//!   └─ summary.md
//! ```

use crate::csv;
use crate::markdown;
use chrono::{DateTime, Local, TimeZone};
use lwcbench_core::SessionReport;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Prefix of every result directory name.
pub const RESULTS_PREFIX: &str = "benchmark_results";

/// Per-sample CSV file name.
pub const CSV_FILE: &str = "benchmark_results.csv";

/// Session JSON file name.
pub const SESSION_FILE: &str = "session.json";

/// Summary markdown file name.
pub const SUMMARY_FILE: &str = "summary.md";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `session.json` only
    Json,
    /// `benchmark_results.csv` only
    Csv,
    /// `summary.md` only
    Markdown,
    /// All three files
    #[default]
    All,
}

impl OutputFormat {
    fn includes(self, other: OutputFormat) -> bool {
        self == OutputFormat::All || self == other
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "all" => Ok(OutputFormat::All),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Directory name for a session started at `at`.
///
/// An empty or missing label drops the suffix.
pub fn result_dir_name<Tz>(at: &DateTime<Tz>, label: Option<&str>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let stamp = at.format("%Y-%m-%d_%H-%M-%S");
    match label.map(str::trim).filter(|l| !l.is_empty()) {
        Some(label) => format!("{}_{}_{}", RESULTS_PREFIX, stamp, label),
        None => format!("{}_{}", RESULTS_PREFIX, stamp),
    }
}

/// Create a fresh result directory under `root`, named for the current
/// local time.
pub fn create_result_dir(root: impl AsRef<Path>, label: Option<&str>) -> io::Result<PathBuf> {
    let dir = root.as_ref().join(result_dir_name(&Local::now(), label));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Write the session report as pretty JSON.
pub fn write_session_json(report: &SessionReport, path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

/// Read a session report back, re-validating every record.
pub fn read_session_json(path: impl AsRef<Path>) -> io::Result<SessionReport> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write the per-sample CSV.
pub fn write_csv(report: &SessionReport, path: impl AsRef<Path>) -> io::Result<()> {
    fs::write(path, csv::generate_csv(&report.results))
}

/// Write the markdown summary.
pub fn write_summary(report: &SessionReport, path: impl AsRef<Path>) -> io::Result<()> {
    fs::write(path, markdown::generate_summary(report))
}

/// Write the selected outputs into `dir` and return the files written.
pub fn write_all_outputs(
    report: &SessionReport,
    dir: impl AsRef<Path>,
    format: OutputFormat,
) -> io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if format.includes(OutputFormat::Csv) {
        let path = dir.join(CSV_FILE);
        write_csv(report, &path)?;
        written.push(path);
    }
    if format.includes(OutputFormat::Json) {
        let path = dir.join(SESSION_FILE);
        write_session_json(report, &path)?;
        written.push(path);
    }
    if format.includes(OutputFormat::Markdown) {
        let path = dir.join(SUMMARY_FILE);
        write_summary(report, &path)?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "Results written");
    Ok(written)
}
