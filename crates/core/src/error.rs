// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for benchmark sessions.
//!
//! Only [`LaunchError`] ever reaches a caller of the sampling loop.
//! [`TelemetryFault`] and [`SystemMetricError`] are produced by the reader
//! implementations and absorbed into degraded readings before a sample is
//! recorded.

use std::path::PathBuf;
use thiserror::Error;

/// The workload process could not be started.
///
/// Fatal to the affected target's run, never to the session.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The working directory does not exist or is not a directory.
    #[error("working directory {} does not exist or is not a directory", path.display())]
    MissingWorkingDir {
        /// Directory that was requested.
        path: PathBuf,
    },

    /// The OS refused to spawn the process.
    #[error("failed to spawn `{program}` in {}: {source}", cwd.display())]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Working directory it was executed in.
        cwd: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The command line was empty.
    #[error("workload command has no program")]
    EmptyCommand,
}

/// A power sensor read failed.
#[derive(Debug, Error)]
pub enum TelemetryFault {
    /// Bus-level I/O failure talking to the device.
    #[error("sensor bus I/O error: {0}")]
    Bus(#[from] std::io::Error),

    /// The shunt current overflowed the configured measurement range.
    #[error("current out of sensor range at {gain_volts} V shunt gain")]
    RangeExceeded {
        /// Shunt voltage range in effect when the overflow was seen.
        gain_volts: f64,
    },

    /// The sensor parameters cannot be realised by the device.
    #[error("invalid sensor configuration: {0}")]
    InvalidConfiguration(String),
}

/// The host OS failed to report CPU or memory figures.
#[derive(Debug, Error)]
pub enum SystemMetricError {
    /// The named metric is not exposed by this host.
    #[error("host metric unavailable: {0}")]
    Unavailable(&'static str),
}

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input supplied by a caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A result with this target name already exists.
    #[error("Duplicate target: {0}")]
    DuplicateTarget(String),

    /// A run record violates the alignment or ordering invariant.
    #[error("Misaligned record for {target}: {detail}")]
    MisalignedRecord {
        /// Offending record.
        target: String,
        /// What was wrong.
        detail: String,
    },

    /// Workload launch failure.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build an [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Build an [`Error::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn misaligned(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::MisalignedRecord {
            target: target.into(),
            detail: detail.into(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error_mentions_directory() {
        let err = LaunchError::MissingWorkingDir {
            path: PathBuf::from("/nowhere/ascon"),
        };
        assert!(err.to_string().contains("/nowhere/ascon"));
    }

    #[test]
    fn test_launch_error_converts_transparently() {
        let err: Error = LaunchError::EmptyCommand.into();
        assert_eq!(err.to_string(), "workload command has no program");
    }

    #[test]
    fn test_invalid_input_constructor() {
        let err = Error::invalid_input("bad");
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "bad"));
    }
}
