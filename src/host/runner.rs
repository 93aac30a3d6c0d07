//! Runner implementation
//!
//! Drives example groups one at a time on the calling thread and tallies
//! what happened.

use tracing::{info, warn};

use crate::common::config::{Config, RunConfig};

use super::{ExampleGroup, ExecutionResult, Status};

/// Result of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    /// Errors raised by after-all hooks
    pub hook_errors: Vec<String>,
}

impl RunReport {
    /// Total number of examples that ran
    pub fn examples(&self) -> usize {
        self.passed + self.failed + self.pending
    }

    /// No example failed and no hook failed
    pub fn success(&self) -> bool {
        self.failed == 0 && self.hook_errors.is_empty()
    }

    pub fn merge(&mut self, other: RunReport) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.pending += other.pending;
        self.hook_errors.extend(other.hook_errors);
    }

    pub(crate) fn record(&mut self, description: &str, result: &ExecutionResult) {
        let message = result.message.as_deref().unwrap_or("");
        match result.status {
            Status::Passed => {
                self.passed += 1;
                info!(example = %description, "passed");
            }
            Status::Pending => {
                self.pending += 1;
                info!(example = %description, reason = %message, "pending");
            }
            Status::Failed => {
                self.failed += 1;
                warn!(example = %description, error = %message, "failed");
            }
            Status::NotRun => {}
        }
    }
}

/// Runs example groups according to the `[run]` config section
#[derive(Debug, Default, Clone)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.run.clone())
    }

    /// Run a single group (and its nested groups)
    pub fn run<C: 'static>(&self, group: &mut ExampleGroup<C>) -> RunReport {
        info!(group = %group.description, examples = group.size(), "running group");
        group.run()
    }

    /// Run groups in order
    ///
    /// With `fail_fast`, groups after the first unsuccessful one are left
    /// unrun.
    pub fn run_all<C: 'static>(&self, groups: &mut [ExampleGroup<C>]) -> RunReport {
        let mut report = RunReport::default();
        for group in groups.iter_mut() {
            let group_report = self.run(group);
            let failed = !group_report.success();
            report.merge(group_report);

            if failed && self.config.fail_fast {
                warn!(group = %group.description, "stopping after failed group");
                break;
            }
        }
        report
    }
}
