//! Workload process supervision.
//!
//! A supervisor starts a process without waiting for it and answers one
//! question without blocking: is it still running? The caller only ever
//! holds an opaque handle.

use lwcbench_core::{LaunchError, OutputMode, WorkloadCommand};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Capability: launch and observe a child process.
pub trait ProcessSupervisor {
    /// Opaque handle to a started process.
    type Handle: Send;

    /// Spawn `command` in `working_dir` and return immediately.
    fn start(&self, command: &WorkloadCommand, working_dir: &Path)
        -> Result<Self::Handle, LaunchError>;

    /// Whether the process has not yet exited. Never blocks, never fails.
    fn is_running(&self, handle: &mut Self::Handle) -> bool;

    /// Ask the process to stop. Best effort.
    fn terminate(&self, handle: &mut Self::Handle);

    /// Exit code once the process has been observed to exit.
    fn exit_code(&self, handle: &Self::Handle) -> Option<i32>;
}

/// Send SIGTERM to a process.
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    #[allow(unsafe_code)]
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn stdio(mode: OutputMode) -> Stdio {
    match mode {
        OutputMode::Null => Stdio::null(),
        OutputMode::Inherit => Stdio::inherit(),
    }
}

/// Handle to a child started by [`ChildSupervisor`].
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    program: String,
    status: Option<ExitStatus>,
}

impl ChildHandle {
    /// Program the child was started from.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Exit status, once observed.
    pub fn status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Terminate the child through `supervisor`, wait up to `grace` for it
    /// to exit, then kill it.
    pub async fn shutdown(&mut self, supervisor: &ChildSupervisor, grace: Duration) {
        if !supervisor.is_running(self) {
            return;
        }
        supervisor.terminate(self);

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.status = Some(status);
                info!(program = %self.program, %status, "Process stopped");
            }
            Ok(Err(err)) => {
                warn!(program = %self.program, error = %err, "Failed to reap process");
            }
            Err(_) => {
                warn!(program = %self.program, grace_ms = grace.as_millis() as u64, "Process ignored SIGTERM, killing");
                match self.child.kill().await {
                    Ok(()) => self.status = self.child.try_wait().ok().flatten(),
                    Err(err) => warn!(program = %self.program, error = %err, "Failed to kill process"),
                }
            }
        }
    }
}

/// Supervisor backed by `tokio::process`.
///
/// Children are killed if their handle is dropped while still running.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildSupervisor;

impl ChildSupervisor {
    /// Create a supervisor.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSupervisor for ChildSupervisor {
    type Handle = ChildHandle;

    fn start(
        &self,
        command: &WorkloadCommand,
        working_dir: &Path,
    ) -> Result<ChildHandle, LaunchError> {
        if command.program.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        if !working_dir.is_dir() {
            return Err(LaunchError::MissingWorkingDir {
                path: working_dir.to_path_buf(),
            });
        }

        let child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(stdio(command.output))
            .stderr(stdio(command.output))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: command.program.clone(),
                cwd: working_dir.to_path_buf(),
                source,
            })?;

        debug!(command = %command, cwd = %working_dir.display(), pid = ?child.id(), "Process spawned");

        Ok(ChildHandle {
            child,
            program: command.program.clone(),
            status: None,
        })
    }

    fn is_running(&self, handle: &mut ChildHandle) -> bool {
        if handle.status.is_some() {
            return false;
        }
        match handle.child.try_wait() {
            Ok(Some(status)) => {
                handle.status = Some(status);
                false
            }
            Ok(None) => true,
            Err(err) => {
                // The child can no longer be observed; treat it as gone.
                warn!(program = %handle.program, error = %err, "Failed to poll process");
                false
            }
        }
    }

    fn terminate(&self, handle: &mut ChildHandle) {
        if handle.status.is_some() {
            return;
        }
        let Some(pid) = handle.child.id() else {
            return;
        };
        if let Err(err) = send_sigterm(pid) {
            warn!(program = %handle.program, error = %err, "SIGTERM failed, killing");
            if let Err(err) = handle.child.start_kill() {
                warn!(program = %handle.program, error = %err, "Kill failed");
            }
        }
    }

    fn exit_code(&self, handle: &ChildHandle) -> Option<i32> {
        handle.status.and_then(|s| s.code())
    }
}
