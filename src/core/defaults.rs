use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

/// Runner settings loaded from ci-runner.json. Every field has a default, so a
/// missing file or a partial file both yield a usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Branch the remote trees are reset to by the cleanup stage.
    #[serde(default = "default_cleanup_branch")]
    pub cleanup_branch: String,

    /// Libos variants that need raw-socket or kernel-bypass access.
    #[serde(default = "default_privileged_libos")]
    pub privileged_libos: Vec<String>,

    #[serde(default = "default_profiler")]
    pub profiler: bool,

    #[serde(default)]
    pub ports: PortSettings,

    #[serde(default)]
    pub ssh: SshSettings,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            cleanup_branch: default_cleanup_branch(),
            privileged_libos: default_privileged_libos(),
            profiler: default_profiler(),
            ports: PortSettings::default(),
            ssh: SshSettings::default(),
        }
    }
}

impl RunnerSettings {
    pub fn requires_privilege(&self, libos: &str) -> bool {
        self.privileged_libos.iter().any(|candidate| candidate == libos)
    }

    fn validate(&self, source: &str) -> Result<()> {
        if self.cleanup_branch.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "cleanup_branch",
                Some(self.cleanup_branch.clone()),
                format!("must not be empty ({})", source),
            ));
        }
        if self.ports.tcp_server == self.ports.tcp_client {
            return Err(Error::config_invalid_value(
                "ports",
                Some(self.ports.tcp_server.to_string()),
                "tcp_server and tcp_client must differ",
            ));
        }
        Ok(())
    }
}

/// Ports used by the built-in integration tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSettings {
    #[serde(default = "default_tcp_server_port")]
    pub tcp_server: u16,

    #[serde(default = "default_tcp_client_port")]
    pub tcp_client: u16,

    #[serde(default = "default_pipe_port")]
    pub pipe: u16,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            tcp_server: default_tcp_server_port(),
            tcp_client: default_tcp_client_port(),
            pipe: default_pipe_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u32,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            identity_file: None,
            user: None,
            port: default_ssh_port(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_cleanup_branch() -> String {
    "dev".to_string()
}

fn default_privileged_libos() -> Vec<String> {
    vec![
        "catnip".to_string(),
        "catpowder".to_string(),
        "catloop".to_string(),
    ]
}

fn default_profiler() -> bool {
    true
}

fn default_tcp_server_port() -> u16 {
    12345
}

fn default_tcp_client_port() -> u16 {
    23456
}

fn default_pipe_port() -> u16 {
    12345
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout() -> u32 {
    10
}

/// Parse settings from a JSON document.
pub fn parse(content: &str, source: &str) -> Result<RunnerSettings> {
    let settings: RunnerSettings =
        serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))?;
    settings.validate(source)?;
    Ok(settings)
}

/// Load runner settings.
///
/// An explicit path must exist. Without one, ~/.config/ci-runner/ci-runner.json
/// is used when present and built-in defaults otherwise.
pub fn load(explicit: Option<&str>) -> Result<RunnerSettings> {
    if let Some(raw) = explicit {
        let expanded = shellexpand::tilde(raw).to_string();
        let content = io::read_file(Path::new(&expanded), "read runner settings")?;
        return parse(&content, &expanded);
    }

    let path = match paths::settings_json() {
        Ok(path) => path,
        Err(_) => return Ok(RunnerSettings::default()),
    };
    if !path.exists() {
        return Ok(RunnerSettings::default());
    }

    log_status!("settings", "Loading {}", path.display());
    let content = io::read_file(&path, "read runner settings")?;
    parse(&content, &path.to_string_lossy())
}
