//! Helper processes that must be up before the first target runs.

use anyhow::Context;
use lwcbench_benchmarks::{ChildHandle, ChildSupervisor, ProcessSupervisor};
use lwcbench_core::HelperProcess;
use std::path::Path;
use tracing::info;

/// Running helpers, stopped in reverse start order.
#[derive(Debug, Default)]
pub struct HelperSet {
    supervisor: ChildSupervisor,
    running: Vec<(HelperProcess, ChildHandle)>,
}

impl HelperSet {
    /// Start every helper in order, waiting its startup delay after each.
    ///
    /// If one fails to start, the helpers already running are stopped and
    /// the error is returned.
    pub async fn start(helpers: &[HelperProcess]) -> anyhow::Result<Self> {
        let mut set = HelperSet::default();

        for helper in helpers {
            let dir = helper.working_dir.as_deref().unwrap_or(Path::new("."));
            let handle = match set.supervisor.start(&helper.command(), dir) {
                Ok(handle) => handle,
                Err(err) => {
                    set.shutdown().await;
                    return Err(err).with_context(|| format!("failed to start helper `{}`", helper.name));
                }
            };
            info!(
                helper = %helper.name,
                program = %helper.program,
                startup_delay_ms = helper.startup_delay_ms,
                "Helper started"
            );
            set.running.push((helper.clone(), handle));
            tokio::time::sleep(helper.startup_delay()).await;
        }

        Ok(set)
    }

    /// Number of running helpers.
    pub fn len(&self) -> usize {
        self.running.len()
    }

    /// Whether no helper is running.
    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Stop all helpers.
    pub async fn shutdown(&mut self) {
        while let Some((helper, mut handle)) = self.running.pop() {
            info!(helper = %helper.name, "Stopping helper");
            handle.shutdown(&self.supervisor, helper.shutdown_grace()).await;
        }
    }
}
