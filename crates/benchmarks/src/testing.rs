//! Deterministic [`ProcessSupervisor`]s that spawn nothing.
//!
//! Both record every call so tests can check launch order and that runs
//! never overlap.

use crate::supervisor::ProcessSupervisor;
use lwcbench_core::{LaunchError, WorkloadCommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// One observed supervisor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A workload was started in this directory.
    Started(PathBuf),
    /// The workload in this directory was observed to exit.
    Exited(PathBuf),
}

#[derive(Debug, Default)]
struct Journal {
    events: Mutex<Vec<Event>>,
    commands: Mutex<Vec<String>>,
}

impl Journal {
    fn started(&self, command: &WorkloadCommand, dir: &Path) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.to_string());
        }
        self.push(Event::Started(dir.to_path_buf()));
    }

    fn push(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// Handle issued by the scripted supervisors.
#[derive(Debug)]
pub struct FakeHandle {
    dir: PathBuf,
    polls_left: usize,
    deadline: Option<Instant>,
    exited: bool,
}

/// Reports each workload as running for a fixed number of polls.
#[derive(Debug)]
pub struct ScriptedSupervisor {
    polls: usize,
    exit_code: Option<i32>,
    fail: bool,
    journal: Journal,
}

impl ScriptedSupervisor {
    /// Every workload is running for the first `polls` checks.
    pub fn running_for(polls: usize) -> Self {
        Self {
            polls,
            exit_code: Some(0),
            fail: false,
            journal: Journal::default(),
        }
    }

    /// Every launch fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::running_for(0)
        }
    }

    /// Exit code reported for every workload.
    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Events observed so far.
    pub fn events(&self) -> Vec<Event> {
        self.journal.events()
    }

    /// Command lines started so far.
    pub fn commands(&self) -> Vec<String> {
        self.journal.commands()
    }
}

impl ProcessSupervisor for ScriptedSupervisor {
    type Handle = FakeHandle;

    fn start(&self, command: &WorkloadCommand, working_dir: &Path) -> Result<FakeHandle, LaunchError> {
        if self.fail {
            return Err(LaunchError::MissingWorkingDir {
                path: working_dir.to_path_buf(),
            });
        }
        self.journal.started(command, working_dir);
        Ok(FakeHandle {
            dir: working_dir.to_path_buf(),
            polls_left: self.polls,
            deadline: None,
            exited: false,
        })
    }

    fn is_running(&self, handle: &mut FakeHandle) -> bool {
        if handle.exited {
            return false;
        }
        if handle.polls_left == 0 {
            handle.exited = true;
            self.journal.push(Event::Exited(handle.dir.clone()));
            return false;
        }
        handle.polls_left -= 1;
        true
    }

    fn terminate(&self, handle: &mut FakeHandle) {
        handle.polls_left = 0;
    }

    fn exit_code(&self, handle: &FakeHandle) -> Option<i32> {
        if handle.exited {
            self.exit_code
        } else {
            None
        }
    }
}

/// Reports each workload as running for a fixed wall time, keyed by
/// working directory. Unknown directories fail to launch.
///
/// Uses the tokio clock, so runs are deterministic under a paused runtime.
#[derive(Debug)]
pub struct TimedSupervisor {
    runtimes: HashMap<PathBuf, Duration>,
    journal: Journal,
}

impl TimedSupervisor {
    /// Workload in each directory runs for the paired duration.
    pub fn new<P>(runtimes: impl IntoIterator<Item = (P, Duration)>) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            runtimes: runtimes.into_iter().map(|(p, d)| (p.into(), d)).collect(),
            journal: Journal::default(),
        }
    }

    /// Events observed so far.
    pub fn events(&self) -> Vec<Event> {
        self.journal.events()
    }
}

impl ProcessSupervisor for TimedSupervisor {
    type Handle = FakeHandle;

    fn start(&self, command: &WorkloadCommand, working_dir: &Path) -> Result<FakeHandle, LaunchError> {
        let runtime = self
            .runtimes
            .get(working_dir)
            .copied()
            .ok_or_else(|| LaunchError::MissingWorkingDir {
                path: working_dir.to_path_buf(),
            })?;
        self.journal.started(command, working_dir);
        Ok(FakeHandle {
            dir: working_dir.to_path_buf(),
            polls_left: 0,
            deadline: Some(Instant::now() + runtime),
            exited: false,
        })
    }

    fn is_running(&self, handle: &mut FakeHandle) -> bool {
        if handle.exited {
            return false;
        }
        match handle.deadline {
            Some(deadline) if Instant::now() < deadline => true,
            _ => {
                handle.exited = true;
                self.journal.push(Event::Exited(handle.dir.clone()));
                false
            }
        }
    }

    fn terminate(&self, handle: &mut FakeHandle) {
        handle.deadline = None;
    }

    fn exit_code(&self, handle: &FakeHandle) -> Option<i32> {
        if handle.exited {
            Some(0)
        } else {
            None
        }
    }
}
