// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic telemetry readers for hosts without the sensor and tests.

use super::{PowerReading, TelemetryReader};
use lwcbench_core::TelemetryFault;
use std::collections::VecDeque;
use std::io;

/// Always reads zero. Used when the sensor is disabled or absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetryReader for NullTelemetry {
    fn try_read(&mut self) -> Result<PowerReading, TelemetryFault> {
        Ok(PowerReading::ZERO)
    }
}

/// Always returns the same reading.
#[derive(Debug, Clone, Copy)]
pub struct FixedTelemetry {
    reading: PowerReading,
}

impl FixedTelemetry {
    /// Reader that returns `reading` on every call.
    pub fn new(reading: PowerReading) -> Self {
        Self { reading }
    }
}

impl TelemetryReader for FixedTelemetry {
    fn try_read(&mut self) -> Result<PowerReading, TelemetryFault> {
        Ok(self.reading)
    }
}

/// Faults on every call.
#[derive(Debug, Clone, Copy)]
pub struct FaultyTelemetry {
    range: bool,
}

impl FaultyTelemetry {
    /// Every read overflows the measurement range.
    pub fn range_exceeded() -> Self {
        Self { range: true }
    }

    /// Every read fails on the bus.
    pub fn bus_error() -> Self {
        Self { range: false }
    }
}

impl TelemetryReader for FaultyTelemetry {
    fn try_read(&mut self) -> Result<PowerReading, TelemetryFault> {
        if self.range {
            Err(TelemetryFault::RangeExceeded { gain_volts: 0.32 })
        } else {
            Err(TelemetryFault::Bus(io::Error::new(
                io::ErrorKind::TimedOut,
                "no acknowledge from device",
            )))
        }
    }
}

/// Replays a fixed script of outcomes, then reads zero.
///
/// `None` entries fault with a range error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTelemetry {
    script: VecDeque<Option<PowerReading>>,
    calls: usize,
}

impl ScriptedTelemetry {
    /// Reader that replays `script` in order.
    pub fn new(script: impl IntoIterator<Item = Option<PowerReading>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: 0,
        }
    }

    /// Number of reads performed so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl TelemetryReader for ScriptedTelemetry {
    fn try_read(&mut self) -> Result<PowerReading, TelemetryFault> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Some(reading)) => Ok(reading),
            Some(None) => Err(TelemetryFault::RangeExceeded { gain_volts: 0.32 }),
            None => Ok(PowerReading::ZERO),
        }
    }
}
