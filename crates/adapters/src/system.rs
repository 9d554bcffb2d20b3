// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host CPU and memory metrics.
//!
//! Figures are host-wide, not per process: the workload is usually a
//! `make` invocation whose children do the actual work.

use lwcbench_core::SystemMetricError;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::debug;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// One reading of host load.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HostSnapshot {
    /// CPU utilisation since the previous reading, percent.
    pub cpu_percent: f64,
    /// Used memory, MiB.
    pub ram_mb: f64,
}

impl HostSnapshot {
    /// Sentinel recorded when the host cannot report.
    pub const SENTINEL: HostSnapshot = HostSnapshot {
        cpu_percent: 0.0,
        ram_mb: 0.0,
    };
}

/// Capability: a source of host CPU and memory figures.
pub trait SystemMetricsReader {
    /// Take one reading, reporting any failure.
    fn try_sample(&mut self) -> Result<HostSnapshot, SystemMetricError>;

    /// Take one reading, substituting [`HostSnapshot::SENTINEL`] on failure.
    fn sample(&mut self) -> HostSnapshot {
        match self.try_sample() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                debug!(error = %err, "Host metrics unavailable, recording sentinel");
                HostSnapshot::SENTINEL
            }
        }
    }
}

impl<T: SystemMetricsReader + ?Sized> SystemMetricsReader for Box<T> {
    fn try_sample(&mut self) -> Result<HostSnapshot, SystemMetricError> {
        (**self).try_sample()
    }
}

/// Boxed reader as handed to the sampling loop.
pub type DynSystemMetrics = Box<dyn SystemMetricsReader + Send>;

/// Host metrics from `sysinfo`.
///
/// CPU utilisation is measured between consecutive calls, so the first
/// reading after construction covers the time since [`SysinfoMetrics::new`].
pub struct SysinfoMetrics {
    system: System,
}

impl SysinfoMetrics {
    /// Create a reader and prime the CPU counters.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self { system }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoMetrics").finish_non_exhaustive()
    }
}

impl SystemMetricsReader for SysinfoMetrics {
    fn try_sample(&mut self) -> Result<HostSnapshot, SystemMetricError> {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        if self.system.cpus().is_empty() {
            return Err(SystemMetricError::Unavailable("cpu"));
        }
        if self.system.total_memory() == 0 {
            return Err(SystemMetricError::Unavailable("memory"));
        }

        let cpu_percent = f64::from(self.system.global_cpu_info().cpu_usage());
        Ok(HostSnapshot {
            cpu_percent: if cpu_percent.is_finite() {
                cpu_percent.max(0.0)
            } else {
                0.0
            },
            ram_mb: self.system.used_memory() as f64 / BYTES_PER_MIB,
        })
    }
}

/// Always returns the same snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FixedMetrics {
    snapshot: HostSnapshot,
}

impl FixedMetrics {
    /// Reader that returns the given figures on every call.
    pub fn new(cpu_percent: f64, ram_mb: f64) -> Self {
        Self {
            snapshot: HostSnapshot {
                cpu_percent,
                ram_mb,
            },
        }
    }
}

impl SystemMetricsReader for FixedMetrics {
    fn try_sample(&mut self) -> Result<HostSnapshot, SystemMetricError> {
        Ok(self.snapshot)
    }
}

/// Fails on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultyMetrics;

impl SystemMetricsReader for FaultyMetrics {
    fn try_sample(&mut self) -> Result<HostSnapshot, SystemMetricError> {
        Err(SystemMetricError::Unavailable("cpu"))
    }
}
