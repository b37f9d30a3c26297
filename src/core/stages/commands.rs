//! Remote command lines for each stage, run inside the repository checkout.

use crate::defaults::RunnerSettings;
use crate::scaffolding::Scaffolding;
use crate::utils::shell;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn sudo_prefix(is_sudo: bool) -> &'static str {
    if is_sudo {
        "sudo -E "
    } else {
        ""
    }
}

pub fn checkout(scaffolding: &Scaffolding) -> String {
    format!(
        "cd {} && git pull origin && git checkout {}",
        scaffolding.repository, scaffolding.branch
    )
}

pub fn compile(scaffolding: &Scaffolding, settings: &RunnerSettings) -> String {
    format!(
        "cd {} && make PROFILER={} DEBUG={} all LIBOS={}",
        scaffolding.repository,
        yes_no(settings.profiler),
        yes_no(scaffolding.is_debug),
        scaffolding.libos
    )
}

/// Run a make target, elevated when the libos needs it.
pub fn run(scaffolding: &Scaffolding, target: &str) -> String {
    format!(
        "cd {} && {}make CONFIG_PATH={} DEBUG={} {}",
        scaffolding.repository,
        sudo_prefix(scaffolding.is_sudo),
        scaffolding.config_path,
        yes_no(scaffolding.is_debug),
        target
    )
}

pub fn cleanup(scaffolding: &Scaffolding, settings: &RunnerSettings) -> String {
    format!(
        "cd {} && {}make clean && git checkout {} && git clean -fdx",
        scaffolding.repository,
        sudo_prefix(scaffolding.is_sudo),
        settings.cleanup_branch
    )
}

pub fn unit_target(libos: &str) -> String {
    format!("test-unit-rust LIBOS={}", libos)
}

pub fn integration_target(suite: &str, libos: &str, args: &str) -> String {
    format!(
        "test-integration-rust TEST_INTEGRATION={} LIBOS={} ARGS=\"{}\"",
        suite,
        libos,
        shell::escape_double_quote_content(args)
    )
}

pub fn system_target(libos: &str, test: &str, args: &str) -> String {
    format!(
        "test-system-rust LIBOS={} TEST={} ARGS=\"{}\"",
        libos,
        test,
        shell::escape_double_quote_content(args)
    )
}
