//! Sequential execution of all targets in a session.
//!
//! Targets run one at a time, in the given order. CPU, memory and power are
//! host-wide signals, so two overlapping workloads could not be told apart.
//! A target that fails to launch is recorded as a [`TargetFailure`] and the
//! session moves on; it gets no entry in the result set.

use crate::sampler::TargetRunner;
use lwcbench_core::{BenchmarkTarget, SessionReport, TargetFailure};
use std::time::Duration;
use tracing::{info, warn};

/// Runs targets in order and collects their records.
#[derive(Debug, Clone, Copy)]
pub struct ResultAggregator {
    interval: Duration,
}

impl ResultAggregator {
    /// Aggregator for a session sampled every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Run every target with the same runner.
    pub async fn run_all<R>(&self, targets: &[BenchmarkTarget], runner: &mut R) -> SessionReport
    where
        R: TargetRunner + Send,
    {
        let mut report = self.begin(targets);
        for target in targets {
            run_one(&mut report, target, runner).await;
        }
        self.end(report)
    }

    /// Run every target with a runner built for it by `make_runner`.
    pub async fn run_all_with<F, R>(&self, targets: &[BenchmarkTarget], mut make_runner: F) -> SessionReport
    where
        F: FnMut(&BenchmarkTarget) -> R,
        R: TargetRunner + Send,
    {
        let mut report = self.begin(targets);
        for target in targets {
            let mut runner = make_runner(target);
            run_one(&mut report, target, &mut runner).await;
        }
        self.end(report)
    }

    fn begin(&self, targets: &[BenchmarkTarget]) -> SessionReport {
        let report = SessionReport::new(self.interval.as_millis() as u64);
        info!(
            session_id = %report.session_id,
            targets = targets.len(),
            "Benchmark session started"
        );
        report
    }

    fn end(&self, mut report: SessionReport) -> SessionReport {
        report.finish();
        info!(
            session_id = %report.session_id,
            completed = report.results.len(),
            failed = report.failures.len(),
            "Benchmark session finished"
        );
        report
    }
}

async fn run_one<R>(report: &mut SessionReport, target: &BenchmarkTarget, runner: &mut R)
where
    R: TargetRunner + Send,
{
    info!(target_name = %target.name, path = %target.path.display(), "Benchmarking target");

    let failure = match runner.run_target(target).await {
        Ok(record) => match report.record_success(record) {
            Ok(()) => return,
            Err(err) => TargetFailure::new(target, err.to_string()),
        },
        Err(err) => TargetFailure::new(target, err.to_string()),
    };

    warn!(target_name = %target.name, reason = %failure.reason, "Target skipped");
    report.record_failure(failure);
}
