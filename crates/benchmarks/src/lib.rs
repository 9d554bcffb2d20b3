//! Workload supervision, sampling and export for lwcbench.
//!
//! # Quick Start
//!
//! ```no_run
//! use lwcbench_adapters::prelude::*;
//! use lwcbench_benchmarks::{run_session, io::OutputFormat};
//! use lwcbench_core::BenchConfig;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BenchConfig::load(None)?;
//! let report = run_session(
//!     &config,
//!     Box::new(NullTelemetry),
//!     Box::new(SysinfoMetrics::new()),
//! )
//! .await;
//!
//! for record in &report.results {
//!     println!("{}: {} samples", record.target_name(), record.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`supervisor`] - launching and polling workload processes
//! - [`sampler`] - the fixed-interval sampling loop
//! - [`aggregator`] - sequential execution over all targets
//! - [`io`] - result directories and file output
//! - [`csv`] / [`markdown`] - output renderers
//! - `testing` - deterministic supervisors, behind the `testing` feature

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod aggregator;
pub mod csv;
pub mod io;
pub mod markdown;
pub mod sampler;
pub mod supervisor;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregator::ResultAggregator;
pub use sampler::{SamplingLoop, SupervisedLoop, TargetRunner};
pub use supervisor::{ChildHandle, ChildSupervisor, ProcessSupervisor};

use lwcbench_adapters::system::DynSystemMetrics;
use lwcbench_adapters::telemetry::DynTelemetry;
use lwcbench_core::{BenchConfig, SessionReport};
use std::path::PathBuf;

/// Run every configured target once, in order, with real child processes.
pub async fn run_session(
    config: &BenchConfig,
    telemetry: DynTelemetry,
    metrics: DynSystemMetrics,
) -> SessionReport {
    let sampling =
        SamplingLoop::new(config.interval(), telemetry, metrics).with_command(config.workload.clone());
    let mut runner = SupervisedLoop::new(sampling, ChildSupervisor::new());

    ResultAggregator::new(config.interval())
        .run_all(&config.targets, &mut runner)
        .await
}

/// Run a session and write its outputs into a fresh result directory.
///
/// Returns the report and the directory it was written to.
///
/// # Errors
///
/// Returns an `io::Error` if the result directory or any output file cannot
/// be written. The session itself has already completed at that point.
pub async fn run_and_write_all(
    config: &BenchConfig,
    telemetry: DynTelemetry,
    metrics: DynSystemMetrics,
    format: io::OutputFormat,
) -> std::io::Result<(SessionReport, PathBuf)> {
    let report = run_session(config, telemetry, metrics).await;
    let dir = io::create_result_dir(&config.results_dir, config.results_label.as_deref())?;
    io::write_all_outputs(&report, &dir, format)?;
    Ok((report, dir))
}
