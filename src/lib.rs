//! psmaps: per-process memory usage (USS, PSS, RSS) for Linux.
//!
//! For every requested pid three sources are read concurrently:
//! `/proc/<pid>/smaps_rollup`, the owner of `/proc/<pid>`, and
//! `/proc/<pid>/cmdline`. Results are merged by pid, ordered, and rendered
//! as a table.
//!
//! # Usage
//!
//! ```no_run
//! use psmaps::{collect_pids, merge_rows, sort_rollups, Collector, SortKey};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pids = collect_pids(std::path::Path::new("/proc"))?;
//! let mut reduction = Collector::new("/proc").collect(&pids).await?;
//!
//! sort_rollups(
//!     &mut reduction.rollups,
//!     &reduction.owners,
//!     &reduction.cmdlines,
//!     &SortKey::Pss,
//!     true,
//! );
//! for row in merge_rows(&reduction.rollups, &reduction.owners, &reduction.cmdlines) {
//!     println!("{} {} {}", row.pid, row.user, row.pss);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod collector;
pub mod error;
pub mod process;
pub mod render;
pub mod sort;

// Re-export main types for convenience
pub use cache::OwnerCache;
pub use collector::{Collector, ReduceStrategy, Reduction};
pub use error::CollectError;
pub use process::{collect_pids, parse_pid_args, MemoryRollup, ProcessOwner, DEFAULT_PROC_ROOT};
pub use render::{format_kib, merge_rows, render_table, terminal_width, Row, TableOptions};
pub use sort::{sort_rollups, SortKey, UnknownSortKey, ALLOWED_SORT_KEYS};
