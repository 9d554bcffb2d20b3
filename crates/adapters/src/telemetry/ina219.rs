// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! INA219 current/power monitor driver.
//!
//! The device is calibrated once at construction from the shunt resistance
//! and the largest expected current. Readings come straight from the
//! bus-voltage, current and power registers.
//!
//! Register map:
//!
//! ```text
//! 0x00 configuration   BRNG[13] PG[12:11] BADC[10:7] SADC[6:3] MODE[2:0]
//! 0x02 bus voltage     BD[15:3] CNVR[1] OVF[0]
//! 0x03 power           power_lsb per bit
//! 0x04 current         signed, current_lsb per bit
//! 0x05 calibration
//! ```

use super::i2c::RegisterBus;
use super::{PowerReading, TelemetryReader};
use lwcbench_core::{SensorConfig, TelemetryFault, VoltageRange};
use tracing::{debug, info};

const REG_CONFIG: u8 = 0x00;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

const CALIBRATION_FACTOR: f64 = 0.04096;
const MAX_CALIBRATION_VALUE: f64 = 65534.0;
const CURRENT_LSB_FACTOR: f64 = 32800.0;
const POWER_LSB_RATIO: f64 = 20.0;
const BUS_MILLIVOLTS_LSB: f64 = 4.0;

const ADC_12BIT: u16 = 0b0011;
const MODE_SHUNT_AND_BUS_CONTINUOUS: u16 = 0b111;
const OVERFLOW_FLAG: u16 = 0x0001;

/// Programmable shunt voltage range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Gain {
    /// ±40 mV.
    Div1,
    /// ±80 mV.
    Div2,
    /// ±160 mV.
    Div4,
    /// ±320 mV.
    Div8,
}

impl Gain {
    const ALL: [Gain; 4] = [Gain::Div1, Gain::Div2, Gain::Div4, Gain::Div8];

    /// Full-scale shunt voltage in volts.
    pub fn volts(self) -> f64 {
        match self {
            Gain::Div1 => 0.04,
            Gain::Div2 => 0.08,
            Gain::Div4 => 0.16,
            Gain::Div8 => 0.32,
        }
    }

    fn bits(self) -> u16 {
        match self {
            Gain::Div1 => 0,
            Gain::Div2 => 1,
            Gain::Div4 => 2,
            Gain::Div8 => 3,
        }
    }

    /// Largest current measurable through `shunt_ohms`, amps, to the mA.
    pub fn max_amps(self, shunt_ohms: f64) -> f64 {
        (self.volts() / shunt_ohms * 1000.0).round() / 1000.0
    }

    /// The next larger range, if any.
    pub fn next(self) -> Option<Gain> {
        match self {
            Gain::Div1 => Some(Gain::Div2),
            Gain::Div2 => Some(Gain::Div4),
            Gain::Div4 => Some(Gain::Div8),
            Gain::Div8 => None,
        }
    }

    /// Smallest range able to measure `max_amps` through `shunt_ohms`.
    pub fn for_current(max_amps: f64, shunt_ohms: f64) -> Option<Gain> {
        Gain::ALL
            .into_iter()
            .find(|g| max_amps <= g.max_amps(shunt_ohms))
    }
}

/// Register scaling derived from shunt and current range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Amps per current register bit.
    pub current_lsb: f64,
    /// Watts per power register bit.
    pub power_lsb: f64,
    /// Value written to the calibration register.
    pub register: u16,
}

impl Calibration {
    /// Compute the calibration for `max_expected_amps` at `gain`.
    pub fn compute(
        shunt_ohms: f64,
        max_expected_amps: f64,
        gain: Gain,
    ) -> Result<Self, TelemetryFault> {
        let max_possible_amps = gain.max_amps(shunt_ohms);
        if max_expected_amps > max_possible_amps {
            return Err(TelemetryFault::InvalidConfiguration(format!(
                "expected current {:.3} A exceeds {:.3} A measurable at {} V shunt range",
                max_expected_amps,
                max_possible_amps,
                gain.volts()
            )));
        }

        let min_device_lsb = CALIBRATION_FACTOR / (shunt_ohms * MAX_CALIBRATION_VALUE);
        let current_lsb = (max_expected_amps / CURRENT_LSB_FACTOR).max(min_device_lsb);
        let register = (CALIBRATION_FACTOR / (current_lsb * shunt_ohms)).trunc();

        Ok(Self {
            current_lsb,
            power_lsb: current_lsb * POWER_LSB_RATIO,
            register: register.min(MAX_CALIBRATION_VALUE) as u16,
        })
    }
}

/// INA219 on a [`RegisterBus`].
#[derive(Debug)]
pub struct Ina219<B> {
    bus: B,
    shunt_ohms: f64,
    voltage_range: VoltageRange,
    gain: Gain,
    calibration: Calibration,
    auto_gain: bool,
    invert_current: bool,
}

impl<B: RegisterBus> Ina219<B> {
    /// Calibrate and configure the device described by `config`.
    pub fn new(bus: B, config: &SensorConfig) -> Result<Self, TelemetryFault> {
        let gain = Gain::for_current(config.max_expected_amps, config.shunt_ohms).ok_or_else(|| {
            TelemetryFault::InvalidConfiguration(format!(
                "expected current {} A cannot be measured through a {} Ω shunt",
                config.max_expected_amps, config.shunt_ohms
            ))
        })?;
        let calibration = Calibration::compute(config.shunt_ohms, config.max_expected_amps, gain)?;

        let mut sensor = Self {
            bus,
            shunt_ohms: config.shunt_ohms,
            voltage_range: config.voltage_range,
            gain,
            calibration,
            auto_gain: config.auto_gain,
            invert_current: config.invert_current,
        };
        sensor.apply()?;

        info!(
            gain_volts = gain.volts(),
            calibration = calibration.register,
            current_lsb = calibration.current_lsb,
            "INA219 configured"
        );
        Ok(sensor)
    }

    /// Shunt range currently in effect.
    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Calibration currently in effect.
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Access the underlying bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn config_word(&self) -> u16 {
        let brng: u16 = match self.voltage_range {
            VoltageRange::V16 => 0,
            VoltageRange::V32 => 1,
        };
        brng << 13
            | self.gain.bits() << 11
            | ADC_12BIT << 7
            | ADC_12BIT << 3
            | MODE_SHUNT_AND_BUS_CONTINUOUS
    }

    fn apply(&mut self) -> Result<(), TelemetryFault> {
        self.bus
            .write_register(REG_CALIBRATION, self.calibration.register)?;
        let word = self.config_word();
        self.bus.write_register(REG_CONFIG, word)?;
        Ok(())
    }

    /// Move to the next larger shunt range and recalibrate for it.
    ///
    /// Fails with `RangeExceeded` when auto gain is off or the range is
    /// already the largest.
    fn step_up_gain(&mut self) -> Result<(), TelemetryFault> {
        let next = match self.gain.next() {
            Some(next) if self.auto_gain => next,
            _ => {
                return Err(TelemetryFault::RangeExceeded {
                    gain_volts: self.gain.volts(),
                })
            }
        };
        let calibration = Calibration::compute(self.shunt_ohms, next.max_amps(self.shunt_ohms), next)?;
        self.gain = next;
        self.calibration = calibration;
        self.apply()?;
        debug!(gain_volts = next.volts(), "INA219 gain increased after overflow");
        Ok(())
    }
}

impl<B: RegisterBus> TelemetryReader for Ina219<B> {
    fn try_read(&mut self) -> Result<PowerReading, TelemetryFault> {
        let mut bus_raw = self.bus.read_register(REG_BUS_VOLTAGE)?;
        while bus_raw & OVERFLOW_FLAG != 0 {
            self.step_up_gain()?;
            bus_raw = self.bus.read_register(REG_BUS_VOLTAGE)?;
        }

        let current_raw = self.bus.read_register(REG_CURRENT)? as i16;
        let power_raw = self.bus.read_register(REG_POWER)?;

        let voltage = f64::from(bus_raw >> 3) * BUS_MILLIVOLTS_LSB / 1000.0;
        let current_ma = f64::from(current_raw) * self.calibration.current_lsb * 1000.0;
        let power_mw = f64::from(power_raw) * self.calibration.power_lsb * 1000.0;

        Ok(PowerReading {
            voltage,
            // 0.0 - x keeps a zero reading positive
            current_ma: if self.invert_current {
                0.0 - current_ma
            } else {
                current_ma
            },
            power_mw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;

    #[derive(Debug, Default)]
    struct FakeBus {
        registers: HashMap<u8, u16>,
        writes: Vec<(u8, u16)>,
        fail_reads: bool,
        clear_overflow_on_calibration: Option<u16>,
    }

    impl RegisterBus for FakeBus {
        fn read_register(&mut self, register: u8) -> io::Result<u16> {
            if self.fail_reads {
                return Err(io::Error::new(io::ErrorKind::Other, "nack"));
            }
            Ok(self.registers.get(&register).copied().unwrap_or(0))
        }

        fn write_register(&mut self, register: u8, value: u16) -> io::Result<()> {
            self.writes.push((register, value));
            self.registers.insert(register, value);
            if register == REG_CALIBRATION && self.clear_overflow_on_calibration == Some(value) {
                if let Some(bus) = self.registers.get_mut(&REG_BUS_VOLTAGE) {
                    *bus &= !OVERFLOW_FLAG;
                }
            }
            Ok(())
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_gain_selection() {
        assert_eq!(Gain::for_current(2.0, 0.1), Some(Gain::Div8));
        assert_eq!(Gain::for_current(1.0, 0.1), Some(Gain::Div4));
        assert_eq!(Gain::for_current(0.4, 0.1), Some(Gain::Div1));
        assert_eq!(Gain::for_current(5.0, 0.1), None);
    }

    #[test]
    fn test_calibration_for_reference_rig() {
        let cal = Calibration::compute(0.1, 2.0, Gain::Div8).unwrap();
        assert_eq!(cal.register, 6717);
        assert!(approx(cal.current_lsb, 2.0 / 32800.0));
        assert!(approx(cal.power_lsb, 20.0 * 2.0 / 32800.0));
    }

    #[test]
    fn test_new_writes_calibration_then_config() {
        let sensor = Ina219::new(FakeBus::default(), &SensorConfig::default()).unwrap();
        assert_eq!(sensor.bus.writes, vec![(REG_CALIBRATION, 6717), (REG_CONFIG, 0x199F)]);
        assert_eq!(sensor.gain(), Gain::Div8);
    }

    #[test]
    fn test_new_rejects_unmeasurable_current() {
        let config = SensorConfig {
            max_expected_amps: 10.0,
            ..SensorConfig::default()
        };
        let err = Ina219::new(FakeBus::default(), &config).unwrap_err();
        assert!(matches!(err, TelemetryFault::InvalidConfiguration(_)));
    }

    #[test]
    fn test_read_scales_registers() {
        let mut sensor = Ina219::new(FakeBus::default(), &SensorConfig::default()).unwrap();
        let bus = sensor.bus_mut();
        bus.registers.insert(REG_BUS_VOLTAGE, 1250 << 3);
        bus.registers.insert(REG_CURRENT, 1000);
        bus.registers.insert(REG_POWER, 100);

        let reading = sensor.try_read().unwrap();
        assert!(approx(reading.voltage, 5.0));
        assert!(approx(reading.current_ma, -60.975609756));
        assert!(approx(reading.power_mw, 121.951219512));
    }

    #[test]
    fn test_read_without_inversion_keeps_sign() {
        let config = SensorConfig {
            invert_current: false,
            ..SensorConfig::default()
        };
        let mut sensor = Ina219::new(FakeBus::default(), &config).unwrap();
        sensor.bus_mut().registers.insert(REG_CURRENT, (-1000i16) as u16);
        let reading = sensor.try_read().unwrap();
        assert!(approx(reading.current_ma, -60.975609756));
    }

    #[test]
    fn test_zero_current_stays_positive_zero() {
        let mut sensor = Ina219::new(FakeBus::default(), &SensorConfig::default()).unwrap();
        let reading = sensor.read();
        assert!(reading.current_ma.is_sign_positive());
    }

    #[test]
    fn test_overflow_at_max_gain_degrades_to_zero() {
        let mut sensor = Ina219::new(FakeBus::default(), &SensorConfig::default()).unwrap();
        sensor.bus_mut().registers.insert(REG_BUS_VOLTAGE, (1250 << 3) | OVERFLOW_FLAG);

        let err = sensor.try_read().unwrap_err();
        assert!(matches!(err, TelemetryFault::RangeExceeded { gain_volts } if approx(gain_volts, 0.32)));
        assert_eq!(sensor.read(), PowerReading::ZERO);
        assert_eq!(sensor.gain(), Gain::Div8);
    }

    #[test]
    fn test_overflow_steps_up_until_max_gain() {
        let config = SensorConfig {
            max_expected_amps: 1.0,
            ..SensorConfig::default()
        };
        let mut sensor = Ina219::new(FakeBus::default(), &config).unwrap();
        assert_eq!(sensor.gain(), Gain::Div4);
        sensor.bus_mut().registers.insert(REG_BUS_VOLTAGE, OVERFLOW_FLAG);

        let err = sensor.try_read().unwrap_err();
        assert!(matches!(err, TelemetryFault::RangeExceeded { gain_volts } if approx(gain_volts, 0.32)));
        assert_eq!(sensor.gain(), Gain::Div8);
        assert_eq!(sensor.calibration().register, 4198);
        assert!(sensor.bus.writes.contains(&(REG_CALIBRATION, 4198)));
    }

    #[test]
    fn test_overflow_recovered_by_gain_step_returns_reading() {
        let config = SensorConfig {
            max_expected_amps: 1.0,
            ..SensorConfig::default()
        };
        let mut sensor = Ina219::new(FakeBus::default(), &config).unwrap();
        let bus = sensor.bus_mut();
        bus.clear_overflow_on_calibration = Some(4198);
        bus.registers.insert(REG_BUS_VOLTAGE, (1250 << 3) | OVERFLOW_FLAG);
        bus.registers.insert(REG_CURRENT, 1000);
        bus.registers.insert(REG_POWER, 100);

        let reading = sensor.read();
        assert_eq!(sensor.gain(), Gain::Div8);
        assert!(approx(reading.voltage, 5.0));
        assert!(approx(reading.current_ma, -97.56097561));
        assert!(approx(reading.power_mw, 195.12195122));
    }

    #[test]
    fn test_overflow_without_auto_gain_keeps_range() {
        let config = SensorConfig {
            max_expected_amps: 1.0,
            auto_gain: false,
            ..SensorConfig::default()
        };
        let mut sensor = Ina219::new(FakeBus::default(), &config).unwrap();
        sensor.bus_mut().registers.insert(REG_BUS_VOLTAGE, OVERFLOW_FLAG);
        assert!(sensor.try_read().is_err());
        assert_eq!(sensor.gain(), Gain::Div4);
    }

    #[test]
    fn test_bus_error_is_a_fault() {
        let mut sensor = Ina219::new(FakeBus::default(), &SensorConfig::default()).unwrap();
        sensor.bus_mut().fail_reads = true;
        assert!(matches!(sensor.try_read(), Err(TelemetryFault::Bus(_))));
        assert_eq!(sensor.read(), PowerReading::ZERO);
    }
}
