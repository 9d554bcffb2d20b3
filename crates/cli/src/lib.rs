//! CLI for lwcbench.
//!
//! This crate provides the `lwcbench` command: `run` benchmarks every
//! configured target and writes a result directory, `status` shows what a
//! run would do.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod helpers;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use helpers::HelperSet;
use lwcbench_adapters::prelude::*;
use lwcbench_adapters::telemetry;
use lwcbench_benchmarks::io::{self, OutputFormat};
use lwcbench_benchmarks::run_session;
use lwcbench_core::{BenchConfig, SessionReport};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// lwcbench CLI.
#[derive(Parser, Debug)]
#[command(name = "lwcbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to bench.toml if present).
    #[arg(short, long, global = true, env = "LWCBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark every configured target and write a result directory.
    ///
    /// Targets run one at a time in configuration order. Each session
    /// writes into benchmark_results_<timestamp>[_<label>]/ under the
    /// results directory:
    /// - benchmark_results.csv - One row per sample
    /// - session.json - Full session report
    /// - summary.md - Markdown summary
    Run {
        /// Results directory override.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sampling interval override, milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Skip the power sensor and record zero readings.
        #[arg(long)]
        no_sensor: bool,

        /// Do not start the configured helper processes.
        #[arg(long)]
        no_helpers: bool,

        /// Output format: json, csv, markdown, or all.
        #[arg(short, long, default_value = "all")]
        format: OutputFormat,
    },

    /// Show configuration and target status.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "lwcbench=debug" } else { "lwcbench=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the CLI with the process arguments.
pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = BenchConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Run {
            output,
            interval_ms,
            no_sensor,
            no_helpers,
            format,
        } => {
            if let Some(dir) = output {
                config.results_dir = dir;
            }
            if let Some(ms) = interval_ms {
                config.interval_ms = ms;
            }
            if no_sensor {
                config.sensor.enabled = false;
            }
            config.validate().context("invalid configuration")?;

            run_benchmarks(&config, no_helpers, format, cli.verbose).await
        }
        Commands::Status { detailed } => {
            print_status(&config, detailed);
            Ok(())
        }
    }
}

async fn run_benchmarks(
    config: &BenchConfig,
    no_helpers: bool,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let telemetry = telemetry::open(&config.sensor).unwrap_or_else(|fault| {
        warn!(error = %fault, "Power sensor unavailable, recording zero readings");
        Box::new(NullTelemetry) as DynTelemetry
    });

    let mut helpers = if no_helpers {
        HelperSet::default()
    } else {
        HelperSet::start(&config.helpers).await?
    };

    println!("Running {} targets...", config.targets.len());
    let report = run_session(config, telemetry, Box::new(SysinfoMetrics::new())).await;

    helpers.shutdown().await;

    let dir = io::create_result_dir(&config.results_dir, config.results_label.as_deref())
        .with_context(|| format!("failed to create result directory in {}", config.results_dir.display()))?;
    io::write_all_outputs(&report, &dir, format)
        .with_context(|| format!("failed to write results to {}", dir.display()))?;
    info!(dir = %dir.display(), "Session complete");

    print_report(&report, verbose);
    println!("Results written to {}", dir.display());

    if report.results.is_empty() && !report.failures.is_empty() {
        anyhow::bail!("no target could be run");
    }
    Ok(())
}

fn print_report(report: &SessionReport, verbose: bool) {
    println!(
        "Completed {} of {} targets",
        report.results.len(),
        report.attempted()
    );

    for record in &report.results {
        let status = match record.exit_code() {
            Some(0) => "ok".green(),
            Some(code) => format!("exit {}", code).yellow(),
            None => "killed".yellow(),
        };
        println!(
            "  {} {}: {} samples in {:.2}s",
            status,
            record.target_name(),
            record.len(),
            record.duration_secs()
        );
        if verbose {
            if let (Some(first), Some(last)) = (record.sample(0), record.samples().last()) {
                println!(
                    "      first: {:.1}% cpu, {:.0} MB, {:.0} mW  last: {:.1}% cpu, {:.0} MB, {:.0} mW",
                    first.cpu_percent, first.ram_mb, first.power_mw,
                    last.cpu_percent, last.ram_mb, last.power_mw
                );
            }
        }
    }

    for failure in &report.failures {
        println!("  {} {}: {}", "failed".red(), failure.target_name, failure.reason);
    }
}

fn print_status(config: &BenchConfig, detailed: bool) {
    println!("{}", "lwcbench".bold());
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Sampling interval: {} ms", config.interval_ms);
    println!("Workload: {}", config.workload);
    println!("Results directory: {}", config.results_dir.display());

    let sensor = &config.sensor;
    if sensor.enabled {
        println!(
            "Sensor: INA219 on /dev/i2c-{} at {:#04x}",
            sensor.bus, sensor.address
        );
    } else {
        println!("Sensor: {}", "disabled".yellow());
    }

    println!("\nTargets:");
    for target in &config.targets {
        let marker = if target.path.is_dir() {
            "✓".green()
        } else {
            "✗".red()
        };
        println!("  {} {} ({})", marker, target.name, target.path.display());
    }

    if detailed {
        println!("\nSensor parameters:");
        println!("  - shunt: {} Ω", sensor.shunt_ohms);
        println!("  - max expected current: {} A", sensor.max_expected_amps);
        println!("  - bus voltage range: {:?}", sensor.voltage_range);
        println!("  - auto gain: {}", sensor.auto_gain);
        println!("  - invert current: {}", sensor.invert_current);

        println!("\nHelpers:");
        if config.helpers.is_empty() {
            println!("  (none)");
        }
        for helper in &config.helpers {
            println!(
                "  - {}: {} (startup delay {} ms)",
                helper.name,
                helper.command(),
                helper.startup_delay_ms
            );
        }

        if let Some(label) = &config.results_label {
            println!("\nResult directory label: {}", label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "lwcbench",
            "run",
            "--config",
            "lab.toml",
            "--interval-ms",
            "250",
            "--no-sensor",
            "--format",
            "csv",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("lab.toml")));
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                interval_ms,
                no_sensor,
                no_helpers,
                format,
                output,
            } => {
                assert_eq!(interval_ms, Some(250));
                assert!(no_sensor);
                assert!(!no_helpers);
                assert_eq!(format, OutputFormat::Csv);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_defaults_to_all_formats() {
        let cli = Cli::try_parse_from(["lwcbench", "run"]).unwrap();
        match cli.command {
            Commands::Run { format, .. } => assert_eq!(format, OutputFormat::All),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["lwcbench", "run", "--format", "html"]).is_err());
    }

    #[test]
    fn test_status_detailed() {
        let cli = Cli::try_parse_from(["lwcbench", "status", "--detailed"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { detailed: true }));
    }
}
