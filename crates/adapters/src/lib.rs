// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Telemetry and host metric adapters for lwcbench.
//!
//! Both sources are small capability traits with a real implementation and
//! deterministic stand-ins:
//!
//! - [`telemetry::TelemetryReader`] - INA219 over I2C, or stubs
//! - [`system::SystemMetricsReader`] - `sysinfo`, or stubs
//!
//! Neither trait surfaces a failure to the sampling loop; faults degrade to
//! zero readings.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod system;
pub mod telemetry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::system::{
        DynSystemMetrics, FaultyMetrics, FixedMetrics, HostSnapshot, SysinfoMetrics,
        SystemMetricsReader,
    };
    pub use super::telemetry::{
        DynTelemetry, FaultyTelemetry, FixedTelemetry, NullTelemetry, PowerReading,
        ScriptedTelemetry, TelemetryReader,
    };
}

pub use system::{SysinfoMetrics, SystemMetricsReader};
pub use telemetry::{PowerReading, TelemetryReader};
