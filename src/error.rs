//! Error types for per-process collection.
//!
//! Every reader turns one pid into a typed result or one of these failures.
//! Only [`CollectError::MalformedInput`] is fatal for a run; everything else
//! means "no data for this pid from this source".

use std::io;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::process::DataSource;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Process exited, is a kernel thread, or is not readable by the caller.
    #[error("pid {pid} is not accessible")]
    NotAccessible { pid: u32 },

    /// Kernel-exposed data is not in the shape we parse.
    #[error("malformed {source_name} for pid {pid}: {reason}")]
    MalformedInput {
        pid: u32,
        source_name: DataSource,
        reason: String,
    },

    /// The source read succeeded but produced nothing usable.
    #[error("read zero-length {source_name} for pid {pid}")]
    EmptyResult { pid: u32, source_name: DataSource },

    #[error("error reading {}: {err}", path.display())]
    Io {
        pid: u32,
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// The reader task ended without delivering a result (it panicked).
    #[error("{source_name} reader for pid {pid} ended without a result")]
    TaskLost { pid: u32, source_name: DataSource },
}

impl CollectError {
    /// Maps a failed procfs read onto the error taxonomy.
    ///
    /// Missing entries, permission errors and `ESRCH` are the expected ways a
    /// process disappears from under us or hides its maps.
    pub fn from_io(pid: u32, path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                CollectError::NotAccessible { pid }
            }
            _ if err.raw_os_error() == Some(libc::ESRCH) => CollectError::NotAccessible { pid },
            _ => CollectError::Io { pid, path, err },
        }
    }

    pub fn pid(&self) -> u32 {
        match self {
            CollectError::NotAccessible { pid }
            | CollectError::MalformedInput { pid, .. }
            | CollectError::EmptyResult { pid, .. }
            | CollectError::Io { pid, .. }
            | CollectError::TaskLost { pid, .. } => *pid,
        }
    }

    /// True when the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollectError::MalformedInput { .. })
    }

    /// Logs a per-pid failure at the level it deserves. Expected failures
    /// stay at debug so they never reach a default terminal.
    pub fn log_skip(&self, source: DataSource) {
        match self {
            CollectError::NotAccessible { .. } | CollectError::EmptyResult { .. } => {
                debug!("Skipping {} for pid {}: {}", source, self.pid(), self);
            }
            _ => {
                warn!("Skipping {} for pid {}: {}", source, self.pid(), self);
            }
        }
    }
}
