//! Markdown output generation for benchmark sessions.
//!
//! The summary lists what ran and what did not. It carries no statistics;
//! the per-sample data lives in the CSV and JSON outputs.

use lwcbench_core::SessionReport;
use std::fmt::{self, Write};

/// Generate a markdown summary of a session.
pub fn generate_summary(report: &SessionReport) -> String {
    let mut output = String::new();
    let _ = write_summary(&mut output, report);
    output
}

fn write_summary(output: &mut String, report: &SessionReport) -> fmt::Result {
    writeln!(output, "# Benchmark Summary")?;
    writeln!(output)?;
    writeln!(output, "Session: `{}`", report.session_id)?;
    writeln!(output, "Started: {}", report.started_at.to_rfc3339())?;
    if let Some(finished_at) = report.finished_at {
        writeln!(output, "Finished: {}", finished_at.to_rfc3339())?;
    }
    writeln!(output, "Sampling interval: {} ms", report.interval_ms)?;
    writeln!(output)?;
    writeln!(output, "## Results")?;
    writeln!(output)?;
    writeln!(output, "| Algorithm | Samples | Duration (s) | Exit code |")?;
    writeln!(output, "|-----------|---------|--------------|-----------|")?;

    for record in &report.results {
        let exit_code = record
            .exit_code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            output,
            "| {} | {} | {:.2} | {} |",
            record.target_name(),
            record.len(),
            record.duration_secs(),
            exit_code
        )?;
    }

    if !report.failures.is_empty() {
        writeln!(output)?;
        writeln!(output, "## Failures")?;
        writeln!(output)?;
        writeln!(output, "| Algorithm | Path | Reason |")?;
        writeln!(output, "|-----------|------|--------|")?;
        for failure in &report.failures {
            writeln!(
                output,
                "| {} | {} | {} |",
                failure.target_name,
                failure.path.display(),
                failure.reason.replace('|', "\\|")
            )?;
        }
    }

    writeln!(output)?;
    writeln!(output, "---")?;
    writeln!(
        output,
        "Completed: {} of {} targets, {} samples",
        report.results.len(),
        report.attempted(),
        report.results.total_samples()
    )?;
    Ok(())
}
