//! Waiting on a stage's jobs and turning their exit codes into one verdict.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::jobs::JobSet;
use crate::utils::io;

/// How the exit codes of a stage combine into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassPolicy {
    /// Every job must exit 0.
    All,
    /// At least one job must exit 0.
    Any,
}

impl PassPolicy {
    pub fn from_all_pass(all_pass: bool) -> Self {
        if all_pass {
            PassPolicy::All
        } else {
            PassPolicy::Any
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub job: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub statuses: Vec<JobStatus>,
    pub duration_ms: f64,
}

/// Wait for every job in insertion order, writing each job's streams to
/// `<log_dir>/<job>.stdout.txt` and `<log_dir>/<job>.stderr.txt`.
///
/// Leaves `jobs` empty.
pub fn wait_jobs(log_dir: &Path, jobs: &mut JobSet) -> StageResult {
    let started = Instant::now();
    let mut statuses = Vec::with_capacity(jobs.len());

    for (name, mut job) in jobs.drain() {
        let job_name = name.to_string();
        let pid = job.pid();
        let output = job.wait();

        write_log(log_dir, &job_name, "stdout", &output.stdout);
        write_log(log_dir, &job_name, "stderr", &output.stderr);

        statuses.push(JobStatus {
            job: job_name,
            pid,
            exit_code: output.exit_code,
        });
    }

    StageResult {
        statuses,
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}

fn write_log(log_dir: &Path, job_name: &str, stream: &str, content: &[u8]) {
    let path = log_dir.join(format!("{}.{}.txt", job_name, stream));
    if let Err(err) = io::write_file(&path, content, "write job log") {
        log_status!("report", "Could not write {}: {}", path.display(), err.details);
    }
}

/// Reduce exit codes under `policy`. An empty slice never passes.
pub fn reduce(statuses: &[JobStatus], policy: PassPolicy) -> bool {
    if statuses.is_empty() {
        return false;
    }
    match policy {
        PassPolicy::All => statuses.iter().all(|s| s.exit_code == 0),
        PassPolicy::Any => statuses.iter().any(|s| s.exit_code == 0),
    }
}

pub fn format_verdict(passed: bool, duration_ms: f64, name: &str) -> String {
    format!(
        "[{}] in {:9.2} ms {}",
        if passed { "PASSED" } else { "FAILED" },
        duration_ms,
        name
    )
}

/// Wait for a stage, print its verdict line to stderr and return whether it
/// passed. Stdout is left to the JSON result.
pub fn wait_and_report(name: &str, log_dir: &Path, jobs: &mut JobSet, policy: PassPolicy) -> bool {
    if jobs.is_empty() {
        log_status!("report", "Stage '{}' launched no jobs", name);
    }

    let result = wait_jobs(log_dir, jobs);
    let passed = reduce(&result.statuses, policy);
    eprintln!("{}", format_verdict(passed, result.duration_ms, name));
    passed
}
