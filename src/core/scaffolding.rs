//! Facts shared by every stage of one pipeline run.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::defaults::RunnerSettings;

/// Which built-in integration suite a libos runs alongside its unit tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationSuite {
    /// Synchronous sockets: one TCP test across both hosts.
    Tcp,
    /// Shared-memory pipes: the pipe test once per run mode.
    Pipe,
    None,
}

pub fn integration_suite(libos: &str) -> IntegrationSuite {
    match libos {
        "catnap" => IntegrationSuite::Tcp,
        "catmem" => IntegrationSuite::Pipe,
        _ => IntegrationSuite::None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Host {
    pub name: String,
    pub addr: String,
}

/// Immutable description of the run, built once and shared by reference.
#[derive(Debug, Clone, Serialize)]
pub struct Scaffolding {
    pub libos: String,
    pub server: Host,
    pub client: Host,
    pub repository: String,
    pub branch: String,
    pub is_debug: bool,
    pub is_sudo: bool,
    /// Server and client share one checked-out tree.
    pub enable_nfs: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub delay: Duration,
    pub config_path: String,
    pub log_directory: PathBuf,
}

fn serialize_secs<S: serde::Serializer>(delay: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(delay.as_secs_f64())
}

/// Inputs to [`Scaffolding::new`]; addresses default to the host names.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldingArgs {
    pub libos: String,
    pub server: String,
    pub server_addr: Option<String>,
    pub client: String,
    pub client_addr: Option<String>,
    pub repository: String,
    pub branch: String,
    pub is_debug: bool,
    pub enable_nfs: bool,
    pub delay: Duration,
    pub config_path: String,
    pub log_directory: PathBuf,
}

impl Scaffolding {
    pub fn new(args: ScaffoldingArgs, settings: &RunnerSettings) -> Self {
        let is_sudo = settings.requires_privilege(&args.libos);
        let server_addr = args.server_addr.unwrap_or_else(|| args.server.clone());
        let client_addr = args.client_addr.unwrap_or_else(|| args.client.clone());

        Self {
            libos: args.libos,
            server: Host {
                name: args.server,
                addr: server_addr,
            },
            client: Host {
                name: args.client,
                addr: client_addr,
            },
            repository: args.repository,
            branch: args.branch,
            is_debug: args.is_debug,
            is_sudo,
            enable_nfs: args.enable_nfs,
            delay: args.delay,
            config_path: args.config_path,
            log_directory: args.log_directory,
        }
    }

    pub fn integration_suite(&self) -> IntegrationSuite {
        integration_suite(&self.libos)
    }

    pub fn build_mode(&self) -> &'static str {
        if self.is_debug {
            "debug"
        } else {
            "release"
        }
    }
}
