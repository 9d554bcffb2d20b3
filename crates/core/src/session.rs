// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Result set and session report types.
//!
//! A session runs every configured target once, in order. Each successful
//! run contributes one [`RunRecord`] to the [`ResultSet`]; each launch
//! failure contributes one [`TargetFailure`] instead.
//!
//! ```text
//! SessionReport
//!   ├─ ResultSet (execution order, unique names)
//!   │    └─ RunRecord (one per completed target)
//!   └─ TargetFailure (one per target that could not be launched)
//! ```

use crate::record::RunRecord;
use crate::target::BenchmarkTarget;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a benchmark session.
pub type SessionId = String;

/// Ordered collection of run records keyed by target name.
///
/// Grows by one entry per completed run and never mutates an entry after
/// insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RunRecord>", into = "Vec<RunRecord>")]
pub struct ResultSet {
    records: Vec<RunRecord>,
}

impl ResultSet {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sealed record.
    ///
    /// Returns `Err` if a record for the same target already exists.
    pub fn insert(&mut self, record: RunRecord) -> Result<()> {
        if self.contains(record.target_name()) {
            return Err(Error::DuplicateTarget(record.target_name().to_string()));
        }
        self.records.push(record);
        Ok(())
    }

    /// Look up a record by target name.
    pub fn get(&self, target_name: &str) -> Option<&RunRecord> {
        self.records.iter().find(|r| r.target_name() == target_name)
    }

    /// Whether a record for `target_name` exists.
    pub fn contains(&self, target_name: &str) -> bool {
        self.get(target_name).is_some()
    }

    /// Target names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.target_name())
    }

    /// Records in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, RunRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record has been inserted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of samples across all records.
    pub fn total_samples(&self) -> usize {
        self.records.iter().map(RunRecord::len).sum()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a RunRecord;
    type IntoIter = std::slice::Iter<'a, RunRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl TryFrom<Vec<RunRecord>> for ResultSet {
    type Error = Error;

    fn try_from(records: Vec<RunRecord>) -> Result<Self> {
        let mut set = ResultSet::new();
        for record in records {
            record.validate()?;
            set.insert(record)?;
        }
        Ok(set)
    }
}

impl From<ResultSet> for Vec<RunRecord> {
    fn from(set: ResultSet) -> Self {
        set.records
    }
}

/// Diagnostic record of a target that produced no results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetFailure {
    /// Name of the target.
    pub target_name: String,
    /// Working directory that was used.
    pub path: std::path::PathBuf,
    /// Human-readable cause.
    pub reason: String,
    /// When the failure was recorded.
    pub at: DateTime<Utc>,
}

impl TargetFailure {
    /// Record a failure for `target` now.
    pub fn new(target: &BenchmarkTarget, reason: impl Into<String>) -> Self {
        Self {
            target_name: target.name.clone(),
            path: target.path.clone(),
            reason: reason.into(),
            at: Utc::now(),
        }
    }
}

/// Everything one benchmark session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Unique session identifier (UUID v4).
    pub session_id: SessionId,
    /// When the first target was started.
    pub started_at: DateTime<Utc>,
    /// When the last target finished, set by [`SessionReport::finish`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Sampling interval used for every run, milliseconds.
    pub interval_ms: u64,
    /// Records of completed runs.
    pub results: ResultSet,
    /// Targets that could not be run.
    #[serde(default)]
    pub failures: Vec<TargetFailure>,
}

impl SessionReport {
    /// Start a new, empty session.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            interval_ms,
            results: ResultSet::new(),
            failures: Vec::new(),
        }
    }

    /// Add the record of a completed run.
    pub fn record_success(&mut self, record: RunRecord) -> Result<()> {
        self.results.insert(record)
    }

    /// Add the diagnostic of a failed target.
    pub fn record_failure(&mut self, failure: TargetFailure) {
        self.failures.push(failure);
    }

    /// Mark the session as finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whether every attempted target produced a record.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of targets attempted.
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Session wall-clock duration in milliseconds, once finished.
    pub fn duration_ms(&self) -> Option<u64> {
        self.finished_at.map(|end| {
            end.signed_duration_since(self.started_at)
                .num_milliseconds()
                .unsigned_abs()
        })
    }
}
