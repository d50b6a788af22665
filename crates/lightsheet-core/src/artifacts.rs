use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Result of removing a temp working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    AlreadyAbsent,
    /// Removal failed; the job is unaffected.
    Failed(String),
}

/// Create `dir` and its parents. Succeeds when it already exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name().ok_or_else(|| PipelineError::InvalidInput {
        path: path.to_path_buf(),
        reason: "project path has no file name".into(),
    })
}

/// Copy the canonical project into `temp_root` so destructive stages never
/// touch the original. Returns the staged path.
pub fn stage_project(project: &Path, temp_root: &Path) -> Result<PathBuf> {
    ensure_dir(temp_root)?;
    let staged = temp_root.join(file_name(project)?);
    std::fs::copy(project, &staged)?;
    info!(from = %project.display(), to = %staged.display(), "Staged project");
    Ok(staged)
}

/// Copy the canonical project to `destination`, creating its directory.
pub fn promote_project(project: &Path, destination: &Path) -> Result<()> {
    if let Some(dir) = destination.parent() {
        ensure_dir(dir)?;
    }
    std::fs::copy(project, destination)?;
    debug!(from = %project.display(), to = %destination.display(), "Promoted project");
    Ok(())
}

/// Remove a temp working directory tree. Never fails: errors are logged and
/// returned as [`CleanupOutcome::Failed`].
pub fn cleanup_temp(temp_root: &Path) -> CleanupOutcome {
    if !temp_root.exists() {
        debug!(dir = %temp_root.display(), "Temp directory already removed");
        return CleanupOutcome::AlreadyAbsent;
    }
    match std::fs::remove_dir_all(temp_root) {
        Ok(()) => {
            info!(dir = %temp_root.display(), "Removed temp directory");
            CleanupOutcome::Removed
        }
        Err(e) => {
            warn!(dir = %temp_root.display(), error = %e, "Could not remove temp directory");
            CleanupOutcome::Failed(e.to_string())
        }
    }
}
