// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark targets and the command used to run them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One workload under benchmark: a name and the directory it is run in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkTarget {
    /// Identifier used as the key in the result set.
    pub name: String,
    /// Working directory of the workload.
    pub path: PathBuf,
}

impl BenchmarkTarget {
    /// Create a new target.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Working directory of the workload.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Where a child process's stdout and stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Discard output.
    #[default]
    Null,
    /// Share the parent's stdout/stderr.
    Inherit,
}

/// Command line executed inside each target's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadCommand {
    /// Program to execute, resolved through `PATH`.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Handling of the child's output streams.
    #[serde(default)]
    pub output: OutputMode,
}

impl WorkloadCommand {
    /// Create a command with output discarded.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            output: OutputMode::Null,
        }
    }

    /// Set the output mode.
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

impl Default for WorkloadCommand {
    /// `make benchmark`, the build-and-run convention every target follows.
    fn default() -> Self {
        Self::new("make", ["benchmark"])
    }
}

impl fmt::Display for WorkloadCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
