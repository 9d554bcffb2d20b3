// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark session configuration.
//!
//! Everything the orchestrator needs is passed in explicitly through
//! [`BenchConfig`]: sensor parameters, target list, sampling interval,
//! workload command and optional helper processes.
//!
//! Sources are layered with the `config` crate, later sources winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`bench.toml` unless a path is given)
//! 3. Environment variables prefixed `LWCBENCH__`, e.g.
//!    `LWCBENCH__INTERVAL_MS=250` or `LWCBENCH__SENSOR__ENABLED=false`
//!
//! # Example
//!
//! ```toml
//! interval_ms = 500
//! results_label = "key_128bit"
//!
//! [sensor]
//! address = 0x40
//! shunt_ohms = 0.1
//! max_expected_amps = 2.0
//!
//! [[targets]]
//! name = "Ascon"
//! path = "/opt/lwc/ascon"
//! ```

use crate::target::{BenchmarkTarget, OutputMode, WorkloadCommand};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "bench.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "LWCBENCH";

/// Bus voltage range of the power sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoltageRange {
    /// 0-16 V.
    #[default]
    #[serde(rename = "16V")]
    V16,
    /// 0-32 V.
    #[serde(rename = "32V")]
    V32,
}

/// Power sensor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Read the sensor at all. When false every reading is zero.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// I2C bus number (`/dev/i2c-<bus>`).
    #[serde(default = "default_bus")]
    pub bus: u8,
    /// 7-bit device address.
    #[serde(default = "default_address")]
    pub address: u16,
    /// Shunt resistance, ohms.
    #[serde(default = "default_shunt_ohms")]
    pub shunt_ohms: f64,
    /// Largest current the load is expected to draw, amps.
    #[serde(default = "default_max_expected_amps")]
    pub max_expected_amps: f64,
    /// Bus voltage range.
    #[serde(default)]
    pub voltage_range: VoltageRange,
    /// Step up the shunt gain on overflow when a larger range exists.
    #[serde(default = "default_true")]
    pub auto_gain: bool,
    /// Report current with the opposite sign (shunt wired in reverse).
    #[serde(default = "default_true")]
    pub invert_current: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bus: default_bus(),
            address: default_address(),
            shunt_ohms: default_shunt_ohms(),
            max_expected_amps: default_max_expected_amps(),
            voltage_range: VoltageRange::default(),
            auto_gain: true,
            invert_current: true,
        }
    }
}

/// A long-lived process started before the targets and stopped after them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperProcess {
    /// Label used in logs.
    pub name: String,
    /// Program to execute.
    pub program: String,
    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory, defaults to the current one.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Time to wait after starting before continuing, milliseconds.
    #[serde(default)]
    pub startup_delay_ms: u64,
    /// Time to wait after SIGTERM before killing, milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl HelperProcess {
    /// The command line to launch, with output discarded.
    pub fn command(&self) -> WorkloadCommand {
        WorkloadCommand::new(self.program.clone(), self.args.clone()).with_output(OutputMode::Null)
    }

    /// Startup delay as a [`Duration`].
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Top-level session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Fixed sampling interval, milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Directory under which per-session result directories are created.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Suffix appended to result directory names.
    #[serde(default = "default_results_label")]
    pub results_label: Option<String>,
    /// Command run inside every target directory.
    #[serde(default)]
    pub workload: WorkloadCommand,
    /// Power sensor parameters.
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Targets in execution order.
    #[serde(default)]
    pub targets: Vec<BenchmarkTarget>,
    /// Helper processes started before the first target.
    #[serde(default)]
    pub helpers: Vec<HelperProcess>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            results_dir: default_results_dir(),
            results_label: default_results_label(),
            workload: WorkloadCommand::default(),
            sensor: SensorConfig::default(),
            targets: Vec::new(),
            helpers: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_bus() -> u8 {
    1
}
fn default_address() -> u16 {
    0x40
}
fn default_shunt_ohms() -> f64 {
    0.1
}
fn default_max_expected_amps() -> f64 {
    2.0
}
fn default_shutdown_grace_ms() -> u64 {
    2_000
}
fn default_interval_ms() -> u64 {
    500
}
fn default_results_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_results_label() -> Option<String> {
    Some("key_128bit".to_string())
}

impl BenchConfig {
    /// Load configuration from `path` (or `bench.toml` if present) layered
    /// under `LWCBENCH__*` environment variables, then validate it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let cfg: BenchConfig = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a TOML document without touching the environment.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let cfg: BenchConfig = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Sampling interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Check the configuration for values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::config("interval_ms must be greater than zero"));
        }
        if self.workload.program.trim().is_empty() {
            return Err(Error::config("workload.program must not be empty"));
        }
        if self.targets.is_empty() {
            return Err(Error::config("at least one target is required"));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(Error::config("target names must not be empty"));
            }
            if !seen.insert(target.name.as_str()) {
                return Err(Error::config(format!("duplicate target name: {}", target.name)));
            }
        }

        let sensor = &self.sensor;
        if !(sensor.shunt_ohms > 0.0) {
            return Err(Error::config("sensor.shunt_ohms must be positive"));
        }
        if !(sensor.max_expected_amps > 0.0) {
            return Err(Error::config("sensor.max_expected_amps must be positive"));
        }
        if !(0x03..=0x77).contains(&sensor.address) {
            return Err(Error::config(format!(
                "sensor.address {:#04x} is outside the 7-bit range 0x03..=0x77",
                sensor.address
            )));
        }

        for helper in &self.helpers {
            if helper.program.trim().is_empty() {
                return Err(Error::config(format!(
                    "helper {} has an empty program",
                    helper.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
interval_ms = 250
results_label = "key_128bit"

[workload]
program = "make"
args = ["benchmark"]

[sensor]
address = 0x41
shunt_ohms = 0.1
max_expected_amps = 2.0
voltage_range = "32V"

[[targets]]
name = "Ascon"
path = "/opt/lwc/ascon"

[[targets]]
name = "GIFT-COFB"
path = "/opt/lwc/gift-cofb"

[[helpers]]
name = "sitl"
program = "sim_vehicle.py"
args = ["-v", "ArduCopter", "-w"]
startup_delay_ms = 10000
"#;

    #[test]
    fn test_parse_full_document() {
        let cfg = BenchConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.interval(), Duration::from_millis(250));
        assert_eq!(cfg.sensor.address, 0x41);
        assert_eq!(cfg.sensor.voltage_range, VoltageRange::V32);
        assert!(cfg.sensor.invert_current);
        assert_eq!(cfg.targets.len(), 2);
        assert_eq!(cfg.targets[1].name, "GIFT-COFB");
        assert_eq!(cfg.helpers[0].startup_delay(), Duration::from_secs(10));
        assert_eq!(cfg.helpers[0].shutdown_grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_defaults_match_reference_rig() {
        let cfg = BenchConfig::from_toml_str(
            r#"
[[targets]]
name = "Xoodyak"
path = "/opt/lwc/xoodyak"
"#,
        )
        .unwrap();
        assert_eq!(cfg.interval_ms, 500);
        assert_eq!(cfg.workload, WorkloadCommand::default());
        assert_eq!(cfg.sensor, SensorConfig::default());
        assert_eq!(cfg.results_label.as_deref(), Some("key_128bit"));
    }

    #[test]
    fn test_rejects_duplicate_targets() {
        let err = BenchConfig::from_toml_str(
            r#"
[[targets]]
name = "Ascon"
path = "/a"

[[targets]]
name = "Ascon"
path = "/b"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate target name"));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut cfg = BenchConfig::default();
        cfg.targets.push(BenchmarkTarget::new("Ascon", "/a"));
        cfg.interval_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_target_list() {
        assert!(BenchConfig::default().validate().is_err());
    }

    #[test]
    fn test_rejects_bad_sensor_parameters() {
        let mut cfg = BenchConfig::default();
        cfg.targets.push(BenchmarkTarget::new("Ascon", "/a"));

        cfg.sensor.shunt_ohms = 0.0;
        assert!(cfg.validate().is_err());

        cfg.sensor.shunt_ohms = 0.1;
        cfg.sensor.address = 0x80;
        assert!(cfg.validate().is_err());

        cfg.sensor.address = 0x40;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_layers_environment_over_file() {
        let path = std::env::temp_dir().join(format!("lwcbench-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
interval_ms = 500
results_label = "from_file"

[sensor]
auto_gain = true

[[targets]]
name = "Ascon"
path = "/opt/lwc/ascon"
"#,
        )
        .unwrap();

        std::env::set_var("LWCBENCH__RESULTS_LABEL", "from_env");
        std::env::set_var("LWCBENCH__SENSOR__AUTO_GAIN", "false");
        let loaded = BenchConfig::load(Some(&path));
        std::env::remove_var("LWCBENCH__RESULTS_LABEL");
        std::env::remove_var("LWCBENCH__SENSOR__AUTO_GAIN");
        std::fs::remove_file(&path).unwrap();

        let cfg = loaded.unwrap();
        assert_eq!(cfg.results_label.as_deref(), Some("from_env"));
        assert!(!cfg.sensor.auto_gain);
        assert_eq!(cfg.interval_ms, 500);
        assert_eq!(cfg.targets[0].name, "Ascon");
    }
}
