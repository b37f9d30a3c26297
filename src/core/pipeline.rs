//! Pipeline driver: runs the stages in order, gating each on the ones before
//! it, and collects every verdict.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::Result;
use crate::scaffolding::IntegrationSuite;
use crate::stages::{self, PipeMode, StageContext, INTEGRATION_STAGE};
use crate::system_test::SystemTest;

/// Stage verdicts in the order they were first recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStatus {
    entries: Vec<(String, bool)>,
}

impl PipelineStatus {
    /// Record a verdict. Recording a key again replaces its value in place.
    pub fn record(&mut self, key: impl Into<String>, passed: bool) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = passed,
            None => self.entries.push((key, passed)),
        }
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, passed)| *passed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// True when no recorded stage failed.
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|(_, passed)| *passed)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(key, passed)| (key.as_str(), *passed))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PipelineStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, passed) in &self.entries {
            map.serialize_entry(key, passed)?;
        }
        map.end()
    }
}

/// What to run beyond checkout, compile and cleanup.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub test_unit: bool,
    /// Already resolved against the catalog.
    pub system_tests: Vec<SystemTest>,
}

pub fn pipe_mode_key(mode: PipeMode) -> String {
    format!("integration_tests_{}", mode.as_str().replace('-', "_"))
}

pub fn system_test_key(test: &SystemTest) -> String {
    format!("test_{}", test.name())
}

/// A stage that could not even be launched counts as failed.
fn attempt(stage: &str, outcome: Result<bool>) -> bool {
    match outcome {
        Ok(passed) => passed,
        Err(err) => {
            log_status!("pipeline", "Stage {} aborted: {}", stage, err);
            false
        }
    }
}

fn run_unit_tests(ctx: &StageContext, status: &mut PipelineStatus) {
    status.record("unit_tests", attempt("unit_tests", stages::unit(ctx)));

    match ctx.scaffolding.integration_suite() {
        IntegrationSuite::Tcp => {
            let outcome = stages::integration_tcp(ctx, INTEGRATION_STAGE);
            let passed = attempt("integration_tests", outcome);
            status.record("integration_tests", passed);
        }
        IntegrationSuite::Pipe => {
            let mut all_passed = true;
            for mode in PipeMode::ALL {
                let key = pipe_mode_key(mode);
                let outcome = stages::integration_pipe(ctx, INTEGRATION_STAGE, mode);
                let passed = attempt(&key, outcome);
                status.record(key, passed);
                all_passed &= passed;
            }
            status.record("integration_tests", all_passed);
        }
        IntegrationSuite::None => {}
    }
}

/// Run the whole pipeline. Cleanup always runs, whatever happened before it.
pub fn run(ctx: &StageContext, options: &PipelineOptions) -> PipelineStatus {
    let mut status = PipelineStatus::default();

    let checkout = attempt("checkout", stages::checkout(ctx));
    status.record("checkout", checkout);

    if checkout {
        let compile = attempt("compile", stages::compile(ctx));
        status.record("compile", compile);

        if compile {
            if options.test_unit {
                run_unit_tests(ctx, &mut status);
            }
            for test in &options.system_tests {
                let key = system_test_key(test);
                let passed = attempt(&key, test.execute(ctx));
                status.record(key, passed);
            }
        } else {
            log_status!("pipeline", "Compile failed, skipping tests");
        }
    } else {
        log_status!("pipeline", "Checkout failed, skipping compile and tests");
    }

    status.record("cleanup", attempt("cleanup", stages::cleanup(ctx)));
    status
}
