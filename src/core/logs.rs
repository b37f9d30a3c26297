//! Per-run log directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Directory name for a run: `<libos>-<branch>-<debug|release>`, with path
/// separators in the branch flattened.
pub fn directory_name(libos: &str, branch: &str, is_debug: bool) -> String {
    format!(
        "{}-{}-{}",
        libos,
        branch,
        if is_debug { "debug" } else { "release" }
    )
    .replace(['/', '\\'], "_")
}

/// Create an empty log directory, moving the previous run's logs to
/// `<dir>.old`. Only one old generation is kept.
pub fn prepare(output_dir: &Path, libos: &str, branch: &str, is_debug: bool) -> Result<PathBuf> {
    let log_dir = output_dir.join(directory_name(libos, branch, is_debug));

    if log_dir.is_dir() {
        let old_dir = PathBuf::from(format!("{}.old", log_dir.display()));
        if old_dir.is_dir() {
            fs::remove_dir_all(&old_dir).map_err(|e| {
                Error::internal_io(e.to_string(), Some(format!("remove {}", old_dir.display())))
            })?;
        }
        fs::rename(&log_dir, &old_dir).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("rotate {}", log_dir.display())))
        })?;
        log_status!("logs", "Previous logs moved to {}", old_dir.display());
    }

    fs::create_dir_all(&log_dir).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("create {}", log_dir.display())))
    })?;

    Ok(log_dir)
}
