//! Per-process readers for the three data sources merged into each row.
//!
//! This module provides:
//! - `memory`: `/proc/<pid>/smaps_rollup` reading and parsing
//! - `owner`: owning uid and user name of `/proc/<pid>`
//! - `cmdline`: `/proc/<pid>/cmdline` decoding
//! - `scanner`: pid discovery and argument parsing

use std::fmt;

pub mod cmdline;
pub mod memory;
pub mod owner;
pub mod scanner;

// Re-export commonly used types
pub use cmdline::{decode_cmdline, read_cmdline};
pub use memory::{
    parse_kb_value, parse_smaps_rollup, read_memory_rollup, MemoryRollup, RollupHeader,
    STAT_PRIVATE_CLEAN, STAT_PRIVATE_DIRTY, STAT_PSS, STAT_RSS,
};
pub use owner::{lookup_username, read_owner_uid, resolve_owner, ProcessOwner};
pub use scanner::{collect_pids, parse_pid_args};

/// Default mount point of the process namespace.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// The three independent per-pid sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Rollup,
    Owner,
    CommandLine,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataSource::Rollup => "smaps_rollup",
            DataSource::Owner => "owner",
            DataSource::CommandLine => "cmdline",
        };
        f.write_str(name)
    }
}
