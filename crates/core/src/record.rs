// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Samples and the per-run record of aligned time series.
//!
//! A run is collected into a [`RunRecorder`], which is the only type with an
//! append operation. Sealing the recorder consumes it and yields a
//! [`RunRecord`] that cannot be mutated.
//!
//! # Invariants
//!
//! ```text
//! len(timestamps) == len(cpu_percent) == len(ram_mb)
//!                 == len(voltage) == len(current_ma) == len(power_mw)
//! timestamps[0] >= 0 and timestamps[i] < timestamps[i + 1]
//! ```
//!
//! Downstream consumers index the series by position.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One synchronized reading of host and power telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds elapsed since the run started.
    pub timestamp: f64,
    /// Host-wide CPU utilisation, percent.
    pub cpu_percent: f64,
    /// Host-wide used memory, MiB.
    pub ram_mb: f64,
    /// Bus voltage, volts.
    pub voltage: f64,
    /// Load current, milliamps.
    pub current_ma: f64,
    /// Load power, milliwatts.
    pub power_mw: f64,
}

/// The six parallel series of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Elapsed seconds per sample.
    pub timestamps: Vec<f64>,
    /// CPU utilisation per sample.
    pub cpu_percent: Vec<f64>,
    /// Used memory per sample.
    pub ram_mb: Vec<f64>,
    /// Bus voltage per sample.
    pub voltage: Vec<f64>,
    /// Current per sample.
    pub current_ma: Vec<f64>,
    /// Power per sample.
    pub power_mw: Vec<f64>,
}

impl Series {
    fn push(&mut self, sample: Sample) {
        self.timestamps.push(sample.timestamp);
        self.cpu_percent.push(sample.cpu_percent);
        self.ram_mb.push(sample.ram_mb);
        self.voltage.push(sample.voltage);
        self.current_ma.push(sample.current_ma);
        self.power_mw.push(sample.power_mw);
    }

    fn len(&self) -> usize {
        self.timestamps.len()
    }

    fn lengths(&self) -> [usize; 6] {
        [
            self.timestamps.len(),
            self.cpu_percent.len(),
            self.ram_mb.len(),
            self.voltage.len(),
            self.current_ma.len(),
            self.power_mw.len(),
        ]
    }
}

/// Collecting state of a run, exclusively owned by the sampling loop.
#[derive(Debug)]
pub struct RunRecorder {
    target_name: String,
    started_at: DateTime<Utc>,
    series: Series,
}

impl RunRecorder {
    /// Start an empty recording for `target_name`.
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            started_at: Utc::now(),
            series: Series::default(),
        }
    }

    /// Name of the target being recorded.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether no sample has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.series.len() == 0
    }

    /// Append one sample to all six series.
    ///
    /// A sample with a negative, non-finite or non-increasing timestamp, or a
    /// negative CPU/RAM figure, is rejected as a whole.
    pub fn push(&mut self, sample: Sample) -> Result<()> {
        if !sample.timestamp.is_finite() || sample.timestamp < 0.0 {
            return Err(Error::invalid_input(format!(
                "timestamp {} is not a non-negative number",
                sample.timestamp
            )));
        }
        if let Some(&last) = self.series.timestamps.last() {
            if sample.timestamp <= last {
                return Err(Error::invalid_input(format!(
                    "timestamp {} does not follow {}",
                    sample.timestamp, last
                )));
            }
        }
        if sample.cpu_percent < 0.0 || sample.ram_mb < 0.0 {
            return Err(Error::invalid_input("CPU and RAM readings must be >= 0"));
        }
        self.series.push(sample);
        Ok(())
    }

    /// Finish the recording once the workload has been observed to exit.
    pub fn seal(self, duration_secs: f64, exit_code: Option<i32>) -> RunRecord {
        RunRecord {
            target_name: self.target_name,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_secs,
            exit_code,
            series: self.series,
        }
    }
}

/// The complete, aligned time-series output of one workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    target_name: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    series: Series,
}

impl RunRecord {
    /// Name of the benchmarked target.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Wall-clock time the run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock time the run was sealed.
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Monotonic seconds from start until the exit was observed.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Exit code of the workload, `None` if it was killed by a signal or
    /// could not be reaped.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the workload exited before the first sample.
    pub fn is_empty(&self) -> bool {
        self.series.len() == 0
    }

    /// All six series.
    pub fn series(&self) -> &Series {
        &self.series
    }

    /// Elapsed-seconds series.
    pub fn timestamps(&self) -> &[f64] {
        &self.series.timestamps
    }

    /// CPU utilisation series.
    pub fn cpu_percent(&self) -> &[f64] {
        &self.series.cpu_percent
    }

    /// Used-memory series.
    pub fn ram_mb(&self) -> &[f64] {
        &self.series.ram_mb
    }

    /// Bus voltage series.
    pub fn voltage(&self) -> &[f64] {
        &self.series.voltage
    }

    /// Current series.
    pub fn current_ma(&self) -> &[f64] {
        &self.series.current_ma
    }

    /// Power series.
    pub fn power_mw(&self) -> &[f64] {
        &self.series.power_mw
    }

    /// The sample at position `index`.
    pub fn sample(&self, index: usize) -> Option<Sample> {
        let s = &self.series;
        Some(Sample {
            timestamp: *s.timestamps.get(index)?,
            cpu_percent: *s.cpu_percent.get(index)?,
            ram_mb: *s.ram_mb.get(index)?,
            voltage: *s.voltage.get(index)?,
            current_ma: *s.current_ma.get(index)?,
            power_mw: *s.power_mw.get(index)?,
        })
    }

    /// Iterate over samples in time order.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |i| self.sample(i))
    }

    /// Re-check the alignment and ordering invariants.
    ///
    /// Records built through [`RunRecorder`] always pass; this guards
    /// records loaded from disk.
    pub fn validate(&self) -> Result<()> {
        let lengths = self.series.lengths();
        if lengths.iter().any(|&l| l != lengths[0]) {
            return Err(Error::misaligned(
                &self.target_name,
                format!("series lengths differ: {:?}", lengths),
            ));
        }
        if let Some(&first) = self.series.timestamps.first() {
            if first < 0.0 {
                return Err(Error::misaligned(
                    &self.target_name,
                    format!("first timestamp {} is negative", first),
                ));
            }
        }
        if let Some(w) = self
            .series
            .timestamps
            .windows(2)
            .find(|w| w[1] <= w[0])
        {
            return Err(Error::misaligned(
                &self.target_name,
                format!("timestamp {} does not follow {}", w[1], w[0]),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> Sample {
        Sample {
            timestamp: t,
            cpu_percent: 12.5,
            ram_mb: 512.0,
            voltage: 5.1,
            current_ma: 420.0,
            power_mw: 2142.0,
        }
    }

    #[test]
    fn test_push_keeps_series_aligned() {
        let mut recorder = RunRecorder::new("Ascon");
        recorder.push(sample(0.0)).unwrap();
        recorder.push(sample(0.5)).unwrap();
        let record = recorder.seal(0.7, Some(0));

        assert_eq!(record.len(), 2);
        assert_eq!(record.series().lengths(), [2; 6]);
        assert_eq!(record.timestamps(), &[0.0, 0.5]);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_push_rejects_non_increasing_timestamp() {
        let mut recorder = RunRecorder::new("Ascon");
        recorder.push(sample(0.5)).unwrap();
        assert!(recorder.push(sample(0.5)).is_err());
        assert!(recorder.push(sample(0.2)).is_err());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_push_rejects_negative_timestamp() {
        let mut recorder = RunRecorder::new("Ascon");
        assert!(recorder.push(sample(-0.1)).is_err());
        assert!(recorder.push(sample(f64::NAN)).is_err());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_push_rejects_negative_cpu() {
        let mut recorder = RunRecorder::new("Ascon");
        let mut s = sample(0.0);
        s.cpu_percent = -1.0;
        assert!(recorder.push(s).is_err());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_empty_record_is_well_formed() {
        let record = RunRecorder::new("Xoodyak").seal(0.0, Some(0));
        assert!(record.is_empty());
        assert_eq!(record.samples().count(), 0);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_samples_round_trip_positions() {
        let mut recorder = RunRecorder::new("GIFT-COFB");
        recorder.push(sample(0.0)).unwrap();
        recorder.push(sample(0.5)).unwrap();
        let record = recorder.seal(1.0, None);

        let samples: Vec<Sample> = record.samples().collect();
        assert_eq!(samples, vec![sample(0.0), sample(0.5)]);
        assert!(record.sample(2).is_none());
        assert_eq!(record.exit_code(), None);
    }

    #[test]
    fn test_validate_detects_tampered_series() {
        let mut recorder = RunRecorder::new("Elephant");
        recorder.push(sample(0.0)).unwrap();
        let record = recorder.seal(0.1, Some(0));

        let mut json = serde_json::to_value(&record).unwrap();
        json["series"]["power_mw"] = serde_json::json!([]);
        let tampered: RunRecord = serde_json::from_value(json).unwrap();
        let err = tampered.validate().unwrap_err();
        assert!(err.to_string().contains("lengths differ"));
    }
}
