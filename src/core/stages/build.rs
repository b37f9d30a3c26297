//! Stages that prepare and restore the remote trees.

use crate::error::Result;
use crate::jobs::{JobName, JobSet, Role};
use crate::report::PassPolicy;

use super::{commands, StageContext};

/// Launch `command` on the server, and on the client unless both hosts share
/// one tree, then wait for both.
fn run_on_hosts(ctx: &StageContext, stage: &str, command: &str) -> Result<bool> {
    let scaffolding = ctx.scaffolding;
    let mut jobs = JobSet::new(stage);

    ctx.launch(
        &mut jobs,
        JobName::new(stage, Role::Server, &scaffolding.server.name),
        &scaffolding.server.name,
        command,
    )?;
    if !scaffolding.enable_nfs {
        ctx.launch(
            &mut jobs,
            JobName::new(stage, Role::Client, &scaffolding.client.name),
            &scaffolding.client.name,
            command,
        )?;
    }

    Ok(ctx.report(stage, &mut jobs, PassPolicy::All))
}

pub fn checkout(ctx: &StageContext) -> Result<bool> {
    run_on_hosts(ctx, "checkout", &commands::checkout(ctx.scaffolding))
}

pub fn compile(ctx: &StageContext) -> Result<bool> {
    let stage = format!("compile-{}", ctx.scaffolding.build_mode());
    run_on_hosts(ctx, &stage, &commands::compile(ctx.scaffolding, ctx.settings))
}

/// Reset the remote trees. Runs whatever happened before it.
pub fn cleanup(ctx: &StageContext) -> Result<bool> {
    run_on_hosts(ctx, "cleanup", &commands::cleanup(ctx.scaffolding, ctx.settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::RunnerSettings;
    use crate::stages::fixtures;
    use crate::ssh::ScriptedLauncher;

    #[test]
    fn checkout_runs_on_both_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), false);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new();
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(checkout(&ctx).unwrap());

        let hosts: Vec<String> = launcher.launches().into_iter().map(|l| l.host).collect();
        assert_eq!(hosts, vec!["alpha", "beta"]);
        assert!(dir.path().join("checkout-server-alpha.stdout.txt").exists());
        assert!(dir.path().join("checkout-client-beta.stderr.txt").exists());
    }

    #[test]
    fn shared_tree_skips_client() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), true);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new();
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(checkout(&ctx).unwrap());
        assert!(compile(&ctx).unwrap());
        assert!(cleanup(&ctx).unwrap());

        assert!(launcher.launches().iter().all(|l| l.host == "alpha"));
        assert_eq!(launcher.launches().len(), 3);
    }

    #[test]
    fn client_failure_fails_compile() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), false);
        let settings = RunnerSettings::default();
        let launcher = ScriptedLauncher::new().exit_on("beta", "make", 2);
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        assert!(!compile(&ctx).unwrap());
        assert!(dir.path().join("compile-debug-client-beta.stderr.txt").exists());
    }

    #[test]
    fn cleanup_uses_configured_branch() {
        let dir = tempfile::tempdir().unwrap();
        let scaffolding = fixtures::scaffolding("catnap", dir.path(), true);
        let settings = RunnerSettings {
            cleanup_branch: "main".to_string(),
            ..RunnerSettings::default()
        };
        let launcher = ScriptedLauncher::new();
        let ctx = StageContext::new(&scaffolding, &settings, &launcher);

        cleanup(&ctx).unwrap();
        assert!(launcher.launches()[0].command.contains("git checkout main"));
    }
}
