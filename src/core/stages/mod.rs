//! Stage builders: each one launches its jobs, then waits on them through the
//! reporter.
//!
//! - `build` - checkout, compile, cleanup
//! - `suites` - unit, TCP integration, pipe integration, system tests
//! - `commands` - remote command lines

pub mod build;
pub mod commands;
pub mod suites;

use std::path::Path;
use std::thread;

use crate::defaults::RunnerSettings;
use crate::error::{Error, Result};
use crate::jobs::{JobName, JobSet};
use crate::report::{self, PassPolicy};
use crate::scaffolding::Scaffolding;
use crate::ssh::Launcher;

pub use build::{checkout, cleanup, compile};
pub use suites::{
    integration_pipe, integration_tcp, system_rust, unit, PipeMode, SystemRustTest,
    INTEGRATION_STAGE,
};

/// What every stage builder needs: the run's facts, the runner settings and a
/// way to reach the hosts.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub scaffolding: &'a Scaffolding,
    pub settings: &'a RunnerSettings,
    pub launcher: &'a dyn Launcher,
}

impl<'a> StageContext<'a> {
    pub fn new(
        scaffolding: &'a Scaffolding,
        settings: &'a RunnerSettings,
        launcher: &'a dyn Launcher,
    ) -> Self {
        Self {
            scaffolding,
            settings,
            launcher,
        }
    }

    pub fn log_directory(&self) -> &Path {
        &self.scaffolding.log_directory
    }

    /// Launch `command` on `host` and add it to `jobs`. The name is checked
    /// before launching so a rejected job never starts.
    pub fn launch(&self, jobs: &mut JobSet, name: JobName, host: &str, command: &str) -> Result<()> {
        if jobs.contains(&name) {
            return Err(Error::job_name_collision(jobs.stage(), name.to_string()));
        }
        let job = self.launcher.launch(host, command);
        jobs.insert(name, job)
    }

    /// Sleep the inter-host delay so a server endpoint is up before its client.
    pub fn pause(&self) {
        let delay = self.scaffolding.delay;
        if !delay.is_zero() {
            log_status!("stage", "Waiting {:.2}s before starting the client", delay.as_secs_f64());
            thread::sleep(delay);
        }
    }

    pub fn report(&self, name: &str, jobs: &mut JobSet, policy: PassPolicy) -> bool {
        report::wait_and_report(name, self.log_directory(), jobs, policy)
    }
}
