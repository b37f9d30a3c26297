use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use clap::Args;
use serde::Serialize;

use ci_runner::catalog::Catalog;
use ci_runner::pipeline::{self, PipelineOptions, PipelineStatus};
use ci_runner::scaffolding::{Scaffolding, ScaffoldingArgs};
use ci_runner::ssh::SshLauncher;
use ci_runner::stages::StageContext;
use ci_runner::system_test::{self, SystemTest, TestSelector};
use ci_runner::{defaults, logs, paths, Error};

use super::CmdResult;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Server host
    #[arg(long)]
    pub server: String,

    /// Client host
    #[arg(long)]
    pub client: String,

    /// Repository checkout on both hosts
    #[arg(long)]
    pub repository: String,

    /// Branch to test
    #[arg(long)]
    pub branch: String,

    /// LibOS to build and test (catnap, catmem, catnip, ...)
    #[arg(long)]
    pub libos: String,

    /// Build in debug mode
    #[arg(long)]
    pub debug: bool,

    /// Seconds to wait between starting a server and its client
    #[arg(long, default_value_t = 1.0)]
    pub delay: f64,

    /// Server and client share one checkout
    #[arg(long)]
    pub enable_nfs: bool,

    /// Run unit tests (and the libos's integration tests)
    #[arg(long)]
    pub test_unit: bool,

    /// Run one system test from the catalog, or `all`
    #[arg(long, value_name = "NAME|all")]
    pub test_system: Option<String>,

    /// Server address used by tests (defaults to --server)
    #[arg(long)]
    pub server_addr: Option<String>,

    /// Client address used by tests (defaults to --client)
    #[arg(long)]
    pub client_addr: Option<String>,

    /// CONFIG_PATH passed to make on the remote hosts
    #[arg(long, default_value = "$HOME/config.yaml")]
    pub config_path: String,

    /// Where the per-run log directory is created
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// System-test catalog
    #[arg(long, default_value = paths::DEFAULT_CATALOG)]
    pub catalog: String,

    /// Runner settings file (JSON)
    #[arg(long)]
    pub settings: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub passed: bool,
    pub libos: String,
    pub branch: String,
    pub build: String,
    pub server: String,
    pub client: String,
    pub log_directory: String,
    pub started_at: String,
    pub finished_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_tests: Vec<SystemTest>,
    pub stages: PipelineStatus,
}

pub fn validate(args: &RunArgs) -> ci_runner::Result<()> {
    delay(args)?;

    if args.test_system.is_some() {
        let mut missing = Vec::new();
        if args.server_addr.is_none() {
            missing.push("--server-addr".to_string());
        }
        if args.client_addr.is_none() {
            missing.push("--client-addr".to_string());
        }
        if !missing.is_empty() {
            return Err(Error::validation_missing_argument(missing)
                .with_hint("System tests need the addresses the endpoints bind to"));
        }
    }

    Ok(())
}

/// `--delay` as a `Duration`. Negative, non-finite and out-of-range values are
/// rejected.
fn delay(args: &RunArgs) -> ci_runner::Result<Duration> {
    Duration::try_from_secs_f64(args.delay).map_err(|_| {
        Error::validation_invalid_argument(
            "delay",
            format!("Delay must be a non-negative number of seconds, got {}", args.delay),
            None,
            None,
        )
    })
}

fn scaffolding_args(
    args: &RunArgs,
    delay: Duration,
    log_directory: PathBuf,
) -> ScaffoldingArgs {
    ScaffoldingArgs {
        libos: args.libos.clone(),
        server: args.server.clone(),
        server_addr: args.server_addr.clone(),
        client: args.client.clone(),
        client_addr: args.client_addr.clone(),
        repository: args.repository.clone(),
        branch: args.branch.clone(),
        is_debug: args.debug,
        enable_nfs: args.enable_nfs,
        delay,
        config_path: args.config_path.clone(),
        log_directory,
    }
}

/// Resolve the requested system tests before anything runs remotely.
fn resolve_system_tests(args: &RunArgs, scaffolding: &Scaffolding) -> ci_runner::Result<Vec<SystemTest>> {
    let Some(raw) = args.test_system.as_deref() else {
        return Ok(Vec::new());
    };
    let catalog_path = shellexpand::tilde(&args.catalog).to_string();
    let catalog = Catalog::load(Path::new(&catalog_path))?;
    system_test::select(&TestSelector::parse(raw), scaffolding, &catalog)
}

pub fn run(args: RunArgs) -> CmdResult<RunOutput> {
    validate(&args)?;
    let delay = delay(&args)?;
    let settings = defaults::load(args.settings.as_deref())?;

    let log_directory = args
        .output_dir
        .join(logs::directory_name(&args.libos, &args.branch, args.debug));
    let scaffolding = Scaffolding::new(scaffolding_args(&args, delay, log_directory), &settings);
    let system_tests = resolve_system_tests(&args, &scaffolding)?;

    logs::prepare(&args.output_dir, &args.libos, &args.branch, args.debug)?;

    let launcher = SshLauncher::from_settings(&settings.ssh);
    let ctx = StageContext::new(&scaffolding, &settings, &launcher);
    let options = PipelineOptions {
        test_unit: args.test_unit,
        system_tests,
    };

    let started_at = Local::now().to_rfc3339();
    let status = pipeline::run(&ctx, &options);
    let finished_at = Local::now().to_rfc3339();

    let passed = status.passed();
    let exit_code = if passed { 0 } else { 1 };

    Ok((
        RunOutput {
            passed,
            libos: scaffolding.libos.clone(),
            branch: scaffolding.branch.clone(),
            build: scaffolding.build_mode().to_string(),
            server: scaffolding.server.name.clone(),
            client: scaffolding.client.name.clone(),
            log_directory: scaffolding.log_directory.to_string_lossy().to_string(),
            started_at,
            finished_at,
            system_tests: options.system_tests,
            stages: status,
        },
        exit_code,
    ))
}
