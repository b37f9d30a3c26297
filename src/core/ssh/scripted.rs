//! In-memory launcher that answers from a script instead of reaching a host.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::client::{CommandOutput, Launcher, RemoteJob};

/// Recorded launch
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub host: String,
    pub command: String,
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct Rule {
    host: Option<String>,
    needle: String,
    output: CommandOutput,
}

/// Launcher returning scripted outcomes.
///
/// Rules are matched in the order they were added: the first rule whose host
/// (when given) equals the launch host and whose needle occurs in the command
/// wins. Unmatched launches succeed with empty output.
#[derive(Clone, Default)]
pub struct ScriptedLauncher {
    rules: Vec<Rule>,
    launches: Arc<Mutex<Vec<LaunchRecord>>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, host: Option<&str>, needle: &str, output: CommandOutput) -> Self {
        self.rules.push(Rule {
            host: host.map(str::to_string),
            needle: needle.to_string(),
            output,
        });
        self
    }

    /// Commands on `host` containing `needle` exit with `exit_code`.
    pub fn exit_on(self, host: &str, needle: &str, exit_code: i32) -> Self {
        self.respond(
            Some(host),
            needle,
            CommandOutput::from_exit(exit_code, "", format!("scripted exit {}", exit_code)),
        )
    }

    /// Commands on any host containing `needle` exit with `exit_code`.
    pub fn exit_everywhere_on(self, needle: &str, exit_code: i32) -> Self {
        self.respond(
            None,
            needle,
            CommandOutput::from_exit(exit_code, "", format!("scripted exit {}", exit_code)),
        )
    }

    /// Get all recorded launches
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn launches_matching(&self, needle: &str) -> Vec<LaunchRecord> {
        self.launches()
            .into_iter()
            .filter(|record| record.command.contains(needle))
            .collect()
    }

    fn outcome(&self, host: &str, command: &str) -> CommandOutput {
        self.rules
            .iter()
            .find(|rule| {
                rule.host.as_deref().map_or(true, |h| h == host) && command.contains(&rule.needle)
            })
            .map(|rule| rule.output.clone())
            .unwrap_or_else(|| CommandOutput::from_exit(0, "", ""))
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, host: &str, command: &str) -> RemoteJob {
        self.launches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LaunchRecord {
                host: host.to_string(),
                command: command.to_string(),
                at: Instant::now(),
            });

        RemoteJob::deferred(host, command, self.outcome(host, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_launch_succeeds() {
        let launcher = ScriptedLauncher::new();
        let mut job = launcher.launch("alpha", "make all");
        assert_eq!(job.wait().exit_code, 0);
        assert_eq!(launcher.launches().len(), 1);
    }

    #[test]
    fn first_matching_rule_wins() {
        let launcher = ScriptedLauncher::new()
            .exit_on("alpha", "git pull", 1)
            .exit_everywhere_on("git", 2);

        assert_eq!(launcher.launch("alpha", "git pull origin").wait().exit_code, 1);
        assert_eq!(launcher.launch("beta", "git pull origin").wait().exit_code, 2);
        assert_eq!(launcher.launch("beta", "make").wait().exit_code, 0);
    }

    #[test]
    fn scripted_output_is_returned_verbatim() {
        let launcher = ScriptedLauncher::new().respond(
            None,
            "echo",
            CommandOutput::from_exit(0, "line one\nline two\n", "warn\n"),
        );
        let mut job = launcher.launch("alpha", "echo");
        let output = job.wait();
        assert_eq!(output.stdout, b"line one\nline two\n");
        assert_eq!(output.stderr, b"warn\n");
    }

    #[test]
    fn launches_matching_filters_by_command() {
        let launcher = ScriptedLauncher::new();
        launcher.launch("alpha", "make clean");
        launcher.launch("beta", "git pull");

        let matches = launcher.launches_matching("make");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].host, "alpha");
    }
}
