//! Process ownership: the uid owning `/proc/<pid>` and its user name.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use nix::unistd::{Uid, User};
use tracing::debug;

use crate::cache::OwnerCache;
use crate::error::CollectError;

/// Owner of one process. `username` is empty when the uid has no name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOwner {
    pub pid: u32,
    pub uid: u32,
    pub username: String,
}

impl ProcessOwner {
    /// User name, or the numeric uid when name resolution failed.
    pub fn display_name(&self) -> String {
        if self.username.is_empty() {
            self.uid.to_string()
        } else {
            self.username.clone()
        }
    }
}

/// Reads the uid owning the process directory.
pub fn read_owner_uid(proc_root: &Path, pid: u32) -> Result<u32, CollectError> {
    let path = proc_root.join(pid.to_string());
    let meta = fs::metadata(&path).map_err(|e| CollectError::from_io(pid, path, e))?;
    Ok(meta.uid())
}

/// Name service lookup for a uid. Failures are logged and yield `None`.
pub fn lookup_username(uid: u32) -> Option<String> {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Some(user.name),
        Ok(None) => {
            debug!("No user name for uid {}", uid);
            None
        }
        Err(e) => {
            debug!("User lookup for uid {} failed: {}", uid, e);
            None
        }
    }
}

/// Resolves the owner of a process through the shared name cache.
pub fn resolve_owner(
    proc_root: &Path,
    pid: u32,
    cache: &OwnerCache,
) -> Result<ProcessOwner, CollectError> {
    let uid = read_owner_uid(proc_root, pid)?;
    let username = cache.resolve_with(uid, lookup_username);
    Ok(ProcessOwner { pid, uid, username })
}
