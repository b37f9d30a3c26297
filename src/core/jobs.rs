//! Jobs launched by one pipeline stage.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::ssh::RemoteJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Server => "server",
            Role::Client => "client",
        }
    }
}

/// Identity of one job: which stage launched it, in which sub-mode, for which
/// role, on which host. Rendered form is used as the log file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobName {
    pub stage: String,
    pub mode: Option<String>,
    pub role: Role,
    pub host: String,
}

impl JobName {
    pub fn new(stage: impl Into<String>, role: Role, host: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            mode: None,
            role,
            host: host.into(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stage)?;
        if let Some(mode) = &self.mode {
            write!(f, "-{}", mode)?;
        }
        write!(f, "-{}-{}", self.role.as_str(), self.host)
    }
}

/// Insertion-ordered jobs of a single stage.
pub struct JobSet {
    stage: String,
    jobs: Vec<(JobName, RemoteJob)>,
}

impl JobSet {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            jobs: Vec::new(),
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Add a launched job. Two jobs whose names render identically would write
    /// the same log files, so that is rejected.
    pub fn insert(&mut self, name: JobName, job: RemoteJob) -> Result<()> {
        if self.contains(&name) {
            return Err(Error::job_name_collision(&self.stage, name.to_string()));
        }
        self.jobs.push((name, job));
        Ok(())
    }

    pub fn contains(&self, name: &JobName) -> bool {
        let rendered = name.to_string();
        self.jobs.iter().any(|(existing, _)| existing.to_string() == rendered)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.jobs.iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Remove every job, in insertion order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, (JobName, RemoteJob)> {
        self.jobs.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::CommandOutput;

    fn job(host: &str) -> RemoteJob {
        RemoteJob::deferred(host, "true", CommandOutput::from_exit(0, "", ""))
    }

    #[test]
    fn job_name_renders_stage_role_host() {
        let name = JobName::new("compile-debug", Role::Server, "alpha");
        assert_eq!(name.to_string(), "compile-debug-server-alpha");
    }

    #[test]
    fn job_name_renders_mode_before_role() {
        let name = JobName::new("integration-test", Role::Client, "beta").with_mode("pop-wait");
        assert_eq!(name.to_string(), "integration-test-pop-wait-client-beta");
    }

    #[test]
    fn insert_keeps_order() {
        let mut jobs = JobSet::new("checkout");
        jobs.insert(JobName::new("checkout", Role::Server, "alpha"), job("alpha"))
            .unwrap();
        jobs.insert(JobName::new("checkout", Role::Client, "beta"), job("beta"))
            .unwrap();

        assert_eq!(
            jobs.names(),
            vec!["checkout-server-alpha", "checkout-client-beta"]
        );
    }

    #[test]
    fn insert_rejects_duplicate_name() {
        let mut jobs = JobSet::new("checkout");
        let name = JobName::new("checkout", Role::Server, "alpha");
        jobs.insert(name.clone(), job("alpha")).unwrap();

        let err = jobs.insert(name, job("alpha")).unwrap_err();
        assert_eq!(err.code.as_str(), "job.name_collision");
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn same_host_in_both_roles_is_not_a_collision() {
        let mut jobs = JobSet::new("checkout");
        jobs.insert(JobName::new("checkout", Role::Server, "alpha"), job("alpha"))
            .unwrap();
        jobs.insert(JobName::new("checkout", Role::Client, "alpha"), job("alpha"))
            .unwrap();
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn drain_empties_the_set() {
        let mut jobs = JobSet::new("checkout");
        jobs.insert(JobName::new("checkout", Role::Server, "alpha"), job("alpha"))
            .unwrap();

        assert_eq!(jobs.drain().count(), 1);
        assert!(jobs.is_empty());
    }
}
