// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Power telemetry sources.
//!
//! Any type implementing [`TelemetryReader`] can feed the sampling loop:
//! the INA219 driver on real hardware, or one of the [`stub`] readers on
//! hosts without the sensor and in tests.
//!
//! # Contract
//!
//! [`TelemetryReader::read`] never fails. Implementations report faults
//! through [`TelemetryReader::try_read`]; the provided `read` substitutes a
//! zero reading so a faulty sample still occupies its slot in every series.
//!
//! Each call performs a bus transaction. Callers must not read faster than
//! the sensor's conversion time (about 532 µs at 12-bit resolution).

pub mod i2c;
pub mod ina219;
pub mod stub;

use lwcbench_core::{SensorConfig, TelemetryFault};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use i2c::{LinuxI2cBus, RegisterBus};
pub use ina219::{Gain, Ina219};
pub use stub::{FaultyTelemetry, FixedTelemetry, NullTelemetry, ScriptedTelemetry};

/// One power reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerReading {
    /// Bus voltage, volts.
    pub voltage: f64,
    /// Load current, milliamps.
    pub current_ma: f64,
    /// Load power, milliwatts.
    pub power_mw: f64,
}

impl PowerReading {
    /// The degraded reading substituted for a faulted read.
    pub const ZERO: PowerReading = PowerReading {
        voltage: 0.0,
        current_ma: 0.0,
        power_mw: 0.0,
    };

    /// Create a reading.
    pub fn new(voltage: f64, current_ma: f64, power_mw: f64) -> Self {
        Self {
            voltage,
            current_ma,
            power_mw,
        }
    }
}

/// Capability: a source of (voltage, current, power) readings.
pub trait TelemetryReader {
    /// Perform one read, reporting any fault.
    fn try_read(&mut self) -> Result<PowerReading, TelemetryFault>;

    /// Perform one read, substituting [`PowerReading::ZERO`] on fault.
    fn read(&mut self) -> PowerReading {
        match self.try_read() {
            Ok(reading) => reading,
            Err(fault) => {
                debug!(error = %fault, "Telemetry fault, recording zero reading");
                PowerReading::ZERO
            }
        }
    }
}

impl<T: TelemetryReader + ?Sized> TelemetryReader for Box<T> {
    fn try_read(&mut self) -> Result<PowerReading, TelemetryFault> {
        (**self).try_read()
    }
}

/// Boxed reader as handed to the sampling loop.
pub type DynTelemetry = Box<dyn TelemetryReader + Send>;

/// Open the telemetry source described by `config`.
///
/// A disabled sensor yields [`NullTelemetry`]. Otherwise the INA219 is
/// opened on `/dev/i2c-<bus>` and calibrated; opening errors are returned
/// so the caller can decide whether to fall back.
pub fn open(config: &SensorConfig) -> Result<DynTelemetry, TelemetryFault> {
    if !config.enabled {
        debug!("Power sensor disabled, using null telemetry");
        return Ok(Box::new(NullTelemetry));
    }
    let bus = LinuxI2cBus::open(config.bus, config.address)?;
    let sensor = Ina219::new(bus, config)?;
    Ok(Box::new(sensor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_substitutes_zero_on_fault() {
        let mut reader = FaultyTelemetry::range_exceeded();
        assert!(reader.try_read().is_err());
        assert_eq!(reader.read(), PowerReading::ZERO);
    }

    #[test]
    fn test_boxed_reader_delegates() {
        let mut reader: DynTelemetry = Box::new(FixedTelemetry::new(PowerReading::new(5.0, 1.0, 5.0)));
        assert_eq!(reader.read().voltage, 5.0);
    }

    #[test]
    fn test_open_disabled_sensor_reads_zero() {
        let config = SensorConfig {
            enabled: false,
            ..SensorConfig::default()
        };
        let mut reader = open(&config).unwrap();
        assert_eq!(reader.read(), PowerReading::ZERO);
    }
}
