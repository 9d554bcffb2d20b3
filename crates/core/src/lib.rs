// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for lwcbench.
//!
//! This crate holds the data model shared by the telemetry adapters, the
//! sampling orchestrator and the CLI:
//!
//! - [`target`] - benchmark targets and the workload command
//! - [`record`] - samples and aligned per-run time series
//! - [`session`] - the result set and session report
//! - [`config`] - explicit session configuration
//! - [`error`] - the error taxonomy

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod record;
pub mod session;
pub mod target;

pub use self::config::{BenchConfig, HelperProcess, SensorConfig, VoltageRange};
pub use error::{Error, LaunchError, Result, SystemMetricError, TelemetryFault};
pub use record::{RunRecord, RunRecorder, Sample, Series};
pub use session::{ResultSet, SessionReport, TargetFailure};
pub use target::{BenchmarkTarget, OutputMode, WorkloadCommand};
