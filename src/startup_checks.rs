//! Startup requirement validation for psmaps.
//!
//! This module checks privileges and the process filesystem before any
//! collection starts.

use nix::unistd::geteuid;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path) -> Result<(), ValidationError> {
    debug!("Validating runtime requirements...");

    check_user_privileges();
    check_proc_root(proc_root)?;

    debug!("All runtime requirements validated");
    Ok(())
}

/// Non-root users only see their own processes' memory maps.
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("Not running as root - processes of other users will be skipped");
    } else {
        info!("Running as root (uid=0)");
    }
}

/// The process root must be a listable directory.
fn check_proc_root(proc_root: &Path) -> Result<(), ValidationError> {
    match fs::metadata(proc_root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            error!("{} is not a directory", proc_root.display());
            return Err(ValidationError::ProcRootMissing(proc_root.to_path_buf()));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!("{} not found - is procfs mounted?", proc_root.display());
            return Err(ValidationError::ProcRootMissing(proc_root.to_path_buf()));
        }
        Err(e) => {
            return Err(ValidationError::ProcRootUnreadable(
                proc_root.to_path_buf(),
                e.to_string(),
            ));
        }
    }

    if let Err(e) = fs::read_dir(proc_root) {
        error!("Cannot list {}: {}", proc_root.display(), e);
        return Err(ValidationError::ProcRootUnreadable(
            proc_root.to_path_buf(),
            e.to_string(),
        ));
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("process root {0} does not exist or is not a directory")]
    ProcRootMissing(PathBuf),

    #[error("process root {0} is not readable: {1}")]
    ProcRootUnreadable(PathBuf, String),
}
