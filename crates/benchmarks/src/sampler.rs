//! The sampling loop.
//!
//! One run is a two-state machine:
//!
//! ```text
//! Running --(supervisor reports exit)--> Exited
//! ```
//!
//! While `Running`, the loop takes one [`Sample`] per interval: elapsed
//! time, host CPU and memory, and a power reading. All six values are
//! appended together, so the series stay aligned by construction. The sleep
//! between samples is the only suspension point and nothing else touches
//! the recorder while it is suspended.
//!
//! There is no timeout. A workload that never exits keeps the loop
//! sampling until the process is killed externally.

use crate::supervisor::ProcessSupervisor;
use async_trait::async_trait;
use lwcbench_adapters::{SystemMetricsReader, TelemetryReader};
use lwcbench_core::{BenchmarkTarget, LaunchError, RunRecord, RunRecorder, Sample, WorkloadCommand};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Anything that can turn a target into a sealed run record.
#[async_trait]
pub trait TargetRunner {
    /// Run `target` to completion and return its record.
    async fn run_target(&mut self, target: &BenchmarkTarget) -> Result<RunRecord, LaunchError>;
}

/// Samples host and power telemetry at a fixed interval while a workload
/// runs.
#[derive(Debug)]
pub struct SamplingLoop<T, M> {
    interval: Duration,
    command: WorkloadCommand,
    telemetry: T,
    metrics: M,
}

impl<T, M> SamplingLoop<T, M>
where
    T: TelemetryReader,
    M: SystemMetricsReader,
{
    /// Create a loop running the default workload command.
    pub fn new(interval: Duration, telemetry: T, metrics: M) -> Self {
        Self {
            interval,
            command: WorkloadCommand::default(),
            telemetry,
            metrics,
        }
    }

    /// Run `command` in each target directory instead of the default.
    pub fn with_command(mut self, command: WorkloadCommand) -> Self {
        self.command = command;
        self
    }

    /// Sampling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Command run in each target directory.
    pub fn command(&self) -> &WorkloadCommand {
        &self.command
    }

    /// Give back the readers.
    pub fn into_parts(self) -> (T, M) {
        (self.telemetry, self.metrics)
    }

    fn take_sample(&mut self, timestamp: f64) -> Sample {
        let host = self.metrics.sample();
        let power = self.telemetry.read();
        Sample {
            timestamp,
            cpu_percent: host.cpu_percent,
            ram_mb: host.ram_mb,
            voltage: power.voltage,
            current_ma: power.current_ma,
            power_mw: power.power_mw,
        }
    }

    /// Launch the workload for `target` and sample until it exits.
    ///
    /// Returns the sealed record, possibly empty if the workload exited
    /// before the first sample. A launch failure is returned as is and no
    /// record is produced.
    pub async fn run<S>(
        &mut self,
        target: &BenchmarkTarget,
        supervisor: &S,
    ) -> Result<RunRecord, LaunchError>
    where
        S: ProcessSupervisor,
    {
        let started = Instant::now();
        let mut recorder = RunRecorder::new(&target.name);
        let mut handle = supervisor.start(&self.command, target.path())?;

        info!(
            target_name = %target.name,
            command = %self.command,
            interval_ms = self.interval.as_millis() as u64,
            "Workload started"
        );

        while supervisor.is_running(&mut handle) {
            let sample = self.take_sample(started.elapsed().as_secs_f64());
            if let Err(err) = recorder.push(sample) {
                warn!(target_name = %target.name, error = %err, "Sample dropped");
            }
            sleep(self.interval).await;
        }

        let exit_code = supervisor.exit_code(&handle);
        let record = recorder.seal(started.elapsed().as_secs_f64(), exit_code);

        match exit_code {
            Some(0) => info!(
                target_name = %target.name,
                samples = record.len(),
                duration_secs = record.duration_secs(),
                "Workload finished"
            ),
            other => warn!(
                target_name = %target.name,
                samples = record.len(),
                exit_code = ?other,
                "Workload finished unsuccessfully"
            ),
        }
        debug!(target_name = %target.name, timestamps = ?record.timestamps(), "Run sealed");

        Ok(record)
    }
}

/// A sampling loop bound to the supervisor that launches its workloads.
#[derive(Debug)]
pub struct SupervisedLoop<T, M, S> {
    sampling: SamplingLoop<T, M>,
    supervisor: S,
}

impl<T, M, S> SupervisedLoop<T, M, S> {
    /// Bind `sampling` to `supervisor`.
    pub fn new(sampling: SamplingLoop<T, M>, supervisor: S) -> Self {
        Self {
            sampling,
            supervisor,
        }
    }

    /// The supervisor.
    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    /// Split back into the loop and the supervisor.
    pub fn into_inner(self) -> (SamplingLoop<T, M>, S) {
        (self.sampling, self.supervisor)
    }
}

#[async_trait]
impl<T, M, S> TargetRunner for SupervisedLoop<T, M, S>
where
    T: TelemetryReader + Send,
    M: SystemMetricsReader + Send,
    S: ProcessSupervisor + Send + Sync,
{
    async fn run_target(&mut self, target: &BenchmarkTarget) -> Result<RunRecord, LaunchError> {
        self.sampling.run(target, &self.supervisor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSupervisor, TimedSupervisor};
    use lwcbench_adapters::prelude::*;

    fn target(name: &str) -> BenchmarkTarget {
        BenchmarkTarget::new(name, format!("/bench/{}", name))
    }

    fn assert_timestamps(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "timestamps: {:?}", actual);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-3, "timestamps: {:?}", actual);
        }
    }

    fn fixed_loop() -> SamplingLoop<FixedTelemetry, FixedMetrics> {
        SamplingLoop::new(
            Duration::from_millis(500),
            FixedTelemetry::new(PowerReading::new(5.1, 420.0, 2142.0)),
            FixedMetrics::new(37.5, 812.0),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_every_interval_until_exit() {
        let supervisor = TimedSupervisor::new([("/bench/Ascon", Duration::from_millis(1200))]);
        let record = fixed_loop().run(&target("Ascon"), &supervisor).await.unwrap();

        assert_eq!(record.target_name(), "Ascon");
        assert_timestamps(record.timestamps(), &[0.0, 0.5, 1.0]);
        assert_eq!(record.cpu_percent(), &[37.5; 3]);
        assert_eq!(record.power_mw(), &[2142.0; 3]);
        assert_eq!(record.exit_code(), Some(0));
        assert!(record.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_exit_yields_empty_record() {
        let supervisor = TimedSupervisor::new([("/bench/Ascon", Duration::ZERO)]);
        let record = fixed_loop().run(&target("Ascon"), &supervisor).await.unwrap();

        assert!(record.is_empty());
        assert_eq!(record.series().power_mw.len(), 0);
        assert!(record.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_faulty_telemetry_records_zeros_and_keeps_sampling() {
        let supervisor = ScriptedSupervisor::running_for(4);
        let mut sampling = SamplingLoop::new(
            Duration::from_millis(500),
            FaultyTelemetry::bus_error(),
            FixedMetrics::new(10.0, 256.0),
        );
        let record = sampling.run(&target("Elephant"), &supervisor).await.unwrap();

        assert_eq!(record.len(), 4);
        assert_eq!(record.voltage(), &[0.0; 4]);
        assert_eq!(record.current_ma(), &[0.0; 4]);
        assert_eq!(record.power_mw(), &[0.0; 4]);
        assert_eq!(record.cpu_percent().len(), record.voltage().len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_faulty_host_metrics_record_sentinel() {
        let supervisor = ScriptedSupervisor::running_for(2);
        let mut sampling = SamplingLoop::new(
            Duration::from_millis(500),
            FixedTelemetry::new(PowerReading::new(5.0, 100.0, 500.0)),
            FaultyMetrics,
        );
        let record = sampling.run(&target("Xoodyak"), &supervisor).await.unwrap();

        assert_eq!(record.cpu_percent(), &[0.0, 0.0]);
        assert_eq!(record.ram_mb(), &[0.0, 0.0]);
        assert_eq!(record.voltage(), &[5.0, 5.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermittent_fault_only_zeroes_that_sample() {
        let good = PowerReading::new(5.0, 300.0, 1500.0);
        let supervisor = ScriptedSupervisor::running_for(3);
        let mut sampling = SamplingLoop::new(
            Duration::from_millis(500),
            ScriptedTelemetry::new([Some(good), None, Some(good)]),
            FixedMetrics::new(1.0, 1.0),
        );
        let record = sampling.run(&target("GIFT-COFB"), &supervisor).await.unwrap();

        assert_eq!(record.power_mw(), &[1500.0, 0.0, 1500.0]);
        let (telemetry, _) = sampling.into_parts();
        assert_eq!(telemetry.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_error_propagates() {
        let supervisor = ScriptedSupervisor::failing();
        let err = fixed_loop().run(&target("Ascon"), &supervisor).await.unwrap_err();
        assert!(matches!(err, LaunchError::MissingWorkingDir { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonzero_exit_still_produces_record() {
        let supervisor = ScriptedSupervisor::running_for(1).with_exit_code(Some(2));
        let record = fixed_loop().run(&target("Ascon"), &supervisor).await.unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.exit_code(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervised_loop_uses_configured_command() {
        let supervisor = ScriptedSupervisor::running_for(0);
        let sampling = fixed_loop().with_command(WorkloadCommand::new("make", ["bench_128"]));
        let mut runner = SupervisedLoop::new(sampling, supervisor);

        runner.run_target(&target("Ascon")).await.unwrap();
        assert_eq!(
            runner.supervisor().commands(),
            vec!["make bench_128".to_string()]
        );
    }
}
