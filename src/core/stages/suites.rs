//! Test stages: unit tests, the built-in integration tests and catalog-driven
//! system tests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::jobs::{JobName, JobSet, Role};
use crate::report::PassPolicy;

use super::{commands, StageContext};

/// Unit tests need a single endpoint, so they only run on the server.
pub fn unit(ctx: &StageContext) -> Result<bool> {
    let scaffolding = ctx.scaffolding;
    let stage = "unit-test";
    let mut jobs = JobSet::new(stage);

    let command = commands::run(scaffolding, &commands::unit_target(&scaffolding.libos));
    ctx.launch(
        &mut jobs,
        JobName::new(stage, Role::Server, &scaffolding.server.name),
        &scaffolding.server.name,
        &command,
    )?;

    Ok(ctx.report(stage, &mut jobs, PassPolicy::All))
}

/// Stage name of the integration tests run alongside the unit tests.
pub const INTEGRATION_STAGE: &str = "integration-test";

/// TCP test between the hosts. Each side binds its own port and dials the
/// other's, so both start together. `stage` names the jobs and their logs.
pub fn integration_tcp(ctx: &StageContext, stage: &str) -> Result<bool> {
    let scaffolding = ctx.scaffolding;
    let ports = &ctx.settings.ports;
    let server_args = format!(
        "--local-address {}:{} --remote-address {}:{}",
        scaffolding.server.addr, ports.tcp_server, scaffolding.client.addr, ports.tcp_client
    );
    let client_args = format!(
        "--local-address {}:{} --remote-address {}:{}",
        scaffolding.client.addr, ports.tcp_client, scaffolding.server.addr, ports.tcp_server
    );

    let mut jobs = JobSet::new(stage);
    ctx.launch(
        &mut jobs,
        JobName::new(stage, Role::Server, &scaffolding.server.name),
        &scaffolding.server.name,
        &commands::run(
            scaffolding,
            &commands::integration_target("tcp-test", &scaffolding.libos, &server_args),
        ),
    )?;
    ctx.launch(
        &mut jobs,
        JobName::new(stage, Role::Client, &scaffolding.client.name),
        &scaffolding.client.name,
        &commands::run(
            scaffolding,
            &commands::integration_target("tcp-test", &scaffolding.libos, &client_args),
        ),
    )?;

    Ok(ctx.report(stage, &mut jobs, PassPolicy::All))
}

/// Run mode of the shared-memory pipe test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipeMode {
    Standalone,
    PushWait,
    PopWait,
    PushWaitAsync,
    PopWaitAsync,
}

impl PipeMode {
    /// Every mode, in the order the pipeline runs them.
    pub const ALL: [PipeMode; 5] = [
        PipeMode::Standalone,
        PipeMode::PushWait,
        PipeMode::PopWait,
        PipeMode::PushWaitAsync,
        PipeMode::PopWaitAsync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipeMode::Standalone => "standalone",
            PipeMode::PushWait => "push-wait",
            PipeMode::PopWait => "pop-wait",
            PipeMode::PushWaitAsync => "push-wait-async",
            PipeMode::PopWaitAsync => "pop-wait-async",
        }
    }

    /// Standalone exercises the server end only.
    pub fn has_client(&self) -> bool {
        !matches!(self, PipeMode::Standalone)
    }
}

impl fmt::Display for PipeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PipeMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                Error::validation_invalid_argument(
                    "run_mode",
                    format!("Unknown pipe run mode '{}'", s),
                    None,
                    Some(PipeMode::ALL.iter().map(|m| m.as_str().to_string()).collect()),
                )
            })
    }
}

/// Pipe test in one run mode. The client opens the server's pipe, so it is
/// launched only after the inter-host delay.
pub fn integration_pipe(ctx: &StageContext, stage: &str, mode: PipeMode) -> Result<bool> {
    let scaffolding = ctx.scaffolding;
    let pipe_name = format!("{}:{}", scaffolding.server.addr, ctx.settings.ports.pipe);
    let server_args = format!("--peer server --pipe-name {} --run-mode {}", pipe_name, mode);
    let client_args = format!("--peer client --pipe-name {} --run-mode {}", pipe_name, mode);

    let report_name = format!("{}-{}", stage, mode);
    let mut jobs = JobSet::new(&report_name);

    ctx.launch(
        &mut jobs,
        JobName::new(stage, Role::Server, &scaffolding.server.name).with_mode(mode.as_str()),
        &scaffolding.server.name,
        &commands::run(
            scaffolding,
            &commands::integration_target("pipe-test", &scaffolding.libos, &server_args),
        ),
    )?;
    if mode.has_client() {
        ctx.pause();
        ctx.launch(
            &mut jobs,
            JobName::new(stage, Role::Client, &scaffolding.client.name).with_mode(mode.as_str()),
            &scaffolding.client.name,
            &commands::run(
                scaffolding,
                &commands::integration_target("pipe-test", &scaffolding.libos, &client_args),
            ),
        )?;
    }

    Ok(ctx.report(&report_name, &mut jobs, PassPolicy::All))
}

/// A `test-system-rust` target run as a server/client pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemRustTest {
    /// Name used for the stage and its log files.
    pub alias: String,
    /// Value passed as TEST= to make.
    pub test: String,
    pub server_args: String,
    pub client_args: String,
    pub policy: PassPolicy,
}

pub fn system_rust(ctx: &StageContext, test: &SystemRustTest) -> Result<bool> {
    let scaffolding = ctx.scaffolding;
    let libos = &scaffolding.libos;
    let mut jobs = JobSet::new(&test.alias);

    ctx.launch(
        &mut jobs,
        JobName::new(&test.alias, Role::Server, &scaffolding.server.name),
        &scaffolding.server.name,
        &commands::run(
            scaffolding,
            &commands::system_target(libos, &test.test, &test.server_args),
        ),
    )?;
    ctx.pause();
    ctx.launch(
        &mut jobs,
        JobName::new(&test.alias, Role::Client, &scaffolding.client.name),
        &scaffolding.client.name,
        &commands::run(
            scaffolding,
            &commands::system_target(libos, &test.test, &test.client_args),
        ),
    )?;

    Ok(ctx.report(&test.alias, &mut jobs, test.policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::RunnerSettings;
    use crate::ssh::ScriptedLauncher;
    use crate::stages::fixtures;
    use std::time::Duration;

    #[test]
    fn unit_runs_on_server_only() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), false);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new();
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(unit(&ctx).unwrap());

        let launches = launcher.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].host, "alpha");
        assert!(launches[0].command.contains("test-unit-rust LIBOS=catnap"));
    }

    #[test]
    fn tcp_args_are_mirrored() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), false);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new();
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(integration_tcp(&ctx, INTEGRATION_STAGE).unwrap());

        let launches = launcher.launches();
        assert_eq!(launches.len(), 2);
        assert!(launches[0].command.contains(
            "--local-address 10.0.0.1:12345 --remote-address 10.0.0.2:23456"
        ));
        assert!(launches[1].command.contains(
            "--local-address 10.0.0.2:23456 --remote-address 10.0.0.1:12345"
        ));
    }

    #[test]
    fn tcp_requires_both_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), false);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new().exit_on("beta", "tcp-test", 1);
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(!integration_tcp(&ctx, INTEGRATION_STAGE).unwrap());
    }

    #[test]
    fn standalone_never_launches_client() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catmem", dir.path(), false);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new();
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(integration_pipe(&ctx, INTEGRATION_STAGE, PipeMode::Standalone).unwrap());

        let launches = launcher.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].host, "alpha");
        assert!(dir
            .path()
            .join("integration-test-standalone-server-alpha.stdout.txt")
            .exists());
    }

    #[test]
    fn client_launch_waits_for_delay() {
        let dir = tempfile::tempdir().unwrap();
        let mut scaffolding = fixtures::scaffolding("catmem", dir.path(), false);
        scaffolding.delay = Duration::from_millis(50);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new();
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(integration_pipe(&ctx, INTEGRATION_STAGE, PipeMode::PushWait).unwrap());

        let launches = launcher.launches();
        assert_eq!(launches.len(), 2);
        assert_eq!(launches[1].host, "beta");
        assert!(launches[1].at.duration_since(launches[0].at) >= Duration::from_millis(50));
        assert!(launches[1]
            .command
            .contains("--peer client --pipe-name 10.0.0.1:12345 --run-mode push-wait"));
    }

    #[test]
    fn pipe_mode_parses_all_names() {
        for mode in PipeMode::ALL {
            assert_eq!(mode.as_str().parse::<PipeMode>().unwrap(), mode);
        }
        let err = "push".parse::<PipeMode>().unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn system_test_any_policy_tolerates_one_failure() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), false);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new().exit_on("beta", "udp-push-pop", 1);
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        let test = SystemRustTest {
            alias: "udp_push_pop".to_string(),
            test: "udp-push-pop".to_string(),
            server_args: "--peer server".to_string(),
            client_args: "--peer client".to_string(),
            policy: PassPolicy::Any,
        };
        assert!(system_rust(&ctx, &test).unwrap());

        let all = SystemRustTest {
            policy: PassPolicy::All,
            ..test
        };
        assert!(!system_rust(&ctx, &all).unwrap());
        assert!(dir.path().join("udp_push_pop-client-beta.stderr.txt").exists());
    }
}
