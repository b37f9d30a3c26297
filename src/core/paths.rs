use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base ci-runner config directory (~/.config/ci-runner/)
pub fn ci_runner() -> Result<PathBuf> {
    let home = env::var("HOME").map_err(|_| {
        Error::internal_unexpected("HOME environment variable not set".to_string())
    })?;
    Ok(PathBuf::from(home).join(".config").join("ci-runner"))
}

/// Global ci-runner.json settings file path
pub fn settings_json() -> Result<PathBuf> {
    Ok(ci_runner()?.join("ci-runner.json"))
}

/// Test catalog location, relative to the directory the runner is started from
pub const DEFAULT_CATALOG: &str = "tools/ci/config/ci_map.yaml";
