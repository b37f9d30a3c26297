use std::process::{Child, Command, Stdio};

use crate::defaults::SshSettings;
use crate::utils::shell;

/// Captured result of a finished command. Streams are kept as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn from_exit(
        exit_code: i32,
        stdout: impl Into<Vec<u8>>,
        stderr: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn failed(stderr: impl Into<Vec<u8>>) -> Self {
        Self::from_exit(-1, Vec::new(), stderr)
    }
}

enum Process {
    Child(Child),
    /// Outcome known at launch time; handed out on wait.
    Deferred(CommandOutput),
}

/// One in-flight command on a remote host.
///
/// The exit code is only available after [`RemoteJob::wait`] has run.
pub struct RemoteJob {
    pub host: String,
    pub command: String,
    process: Option<Process>,
    output: Option<CommandOutput>,
}

impl RemoteJob {
    pub fn spawned(host: impl Into<String>, command: impl Into<String>, child: Child) -> Self {
        Self {
            host: host.into(),
            command: command.into(),
            process: Some(Process::Child(child)),
            output: None,
        }
    }

    /// A job whose outcome is already decided. Launch failures use this so
    /// they surface at wait time like any other non-zero exit.
    pub fn deferred(
        host: impl Into<String>,
        command: impl Into<String>,
        output: CommandOutput,
    ) -> Self {
        Self {
            host: host.into(),
            command: command.into(),
            process: Some(Process::Deferred(output)),
            output: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.process {
            Some(Process::Child(child)) => Some(child.id()),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.output.is_some()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.output.as_ref().map(|output| output.exit_code)
    }

    /// Block until the command exits and capture both streams. Waiting again
    /// returns the captured result.
    pub fn wait(&mut self) -> &CommandOutput {
        let process = &mut self.process;
        self.output.get_or_insert_with(|| match process.take() {
            Some(Process::Child(child)) => collect_output(child),
            Some(Process::Deferred(output)) => output,
            None => CommandOutput::failed("job has no process"),
        })
    }
}

fn collect_output(child: Child) -> CommandOutput {
    match child.wait_with_output() {
        Ok(out) => CommandOutput {
            stdout: out.stdout,
            stderr: out.stderr,
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput::failed(format!("Wait error: {}", e)),
    }
}

/// Starts commands on hosts without waiting for them.
pub trait Launcher {
    fn launch(&self, host: &str, command: &str) -> RemoteJob;
}

/// Launches commands through the system `ssh` binary.
pub struct SshLauncher {
    pub user: Option<String>,
    pub port: u16,
    pub identity_file: Option<String>,
    pub connect_timeout_secs: u32,
}

impl SshLauncher {
    pub fn from_settings(settings: &SshSettings) -> Self {
        let identity_file = settings
            .identity_file
            .as_ref()
            .filter(|path| !path.is_empty())
            .map(|path| shellexpand::tilde(path).to_string());

        Self {
            user: settings.user.clone(),
            port: settings.port,
            identity_file,
            connect_timeout_secs: settings.connect_timeout_secs,
        }
    }

    fn build_ssh_args(&self, host: &str, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Never prompt.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
        ]);

        match &self.user {
            Some(user) => args.push(format!("{}@{}", user, host)),
            None => args.push(host.to_string()),
        }

        args.push(shell::login_shell(command));
        args
    }

    fn spawn(&self, host: &str, command: &str) -> std::io::Result<Child> {
        let mut cmd = if is_local_host(host) {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        } else {
            let mut cmd = Command::new("ssh");
            cmd.args(self.build_ssh_args(host, command));
            cmd
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }
}

impl Launcher for SshLauncher {
    fn launch(&self, host: &str, command: &str) -> RemoteJob {
        if host.trim().is_empty() || command.trim().is_empty() {
            return RemoteJob::deferred(
                host,
                command,
                CommandOutput::failed("Host and command must not be empty"),
            );
        }

        log_status!("ssh", "{}: {}", host, command);
        match self.spawn(host, command) {
            Ok(child) => RemoteJob::spawned(host, command, child),
            Err(e) => RemoteJob::deferred(
                host,
                command,
                CommandOutput::failed(format!("SSH error: {}", e)),
            ),
        }
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}
