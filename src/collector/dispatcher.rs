//! Fan-out of per-pid reads.

use std::path::PathBuf;
use std::sync::Arc;

use ahash::AHashSet as HashSet;
use tokio::sync::{oneshot, Semaphore};
use tokio::task;
use tracing::{debug, warn};

use crate::cache::OwnerCache;
use crate::error::CollectError;
use crate::process::{
    read_cmdline, read_memory_rollup, resolve_owner, DataSource, MemoryRollup, ProcessOwner,
};

/// Everything a reader task needs, cheap to clone into each task.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub proc_root: PathBuf,
    pub owners: Arc<OwnerCache>,
    pub limit: Option<Arc<Semaphore>>,
}

/// Outstanding receivers for one data source, in submission order.
#[derive(Debug)]
pub struct PendingSet<T> {
    pub source: DataSource,
    pub entries: Vec<(u32, oneshot::Receiver<Result<T, CollectError>>)>,
}

impl<T> PendingSet<T> {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, pid: u32, rx: oneshot::Receiver<Result<T, CollectError>>) {
        self.entries.push((pid, rx));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Receivers for all three sources of a dispatched pid set.
#[derive(Debug)]
pub struct Dispatched {
    pub rollups: PendingSet<MemoryRollup>,
    pub owners: PendingSet<ProcessOwner>,
    pub cmdlines: PendingSet<String>,
}

impl Dispatched {
    pub fn empty() -> Self {
        Self {
            rollups: PendingSet::new(DataSource::Rollup),
            owners: PendingSet::new(DataSource::Owner),
            cmdlines: PendingSet::new(DataSource::CommandLine),
        }
    }
}

/// Spawns one task per pid per source and returns at once.
///
/// Duplicate pids are dispatched once, keeping first-seen order.
pub fn dispatch(pids: &[u32], ctx: &DispatchContext) -> Dispatched {
    let mut dispatched = Dispatched::empty();
    let mut seen = HashSet::with_capacity(pids.len());

    for &pid in pids {
        if !seen.insert(pid) {
            debug!("Ignoring duplicate pid {}", pid);
            continue;
        }

        let root = ctx.proc_root.clone();
        dispatched.rollups.push(
            pid,
            spawn_unit(pid, DataSource::Rollup, ctx.limit.clone(), move || {
                read_memory_rollup(&root, pid)
            }),
        );

        let root = ctx.proc_root.clone();
        let owners = Arc::clone(&ctx.owners);
        dispatched.owners.push(
            pid,
            spawn_unit(pid, DataSource::Owner, ctx.limit.clone(), move || {
                resolve_owner(&root, pid, &owners)
            }),
        );

        let root = ctx.proc_root.clone();
        dispatched.cmdlines.push(
            pid,
            spawn_unit(pid, DataSource::CommandLine, ctx.limit.clone(), move || {
                read_cmdline(&root, pid)
            }),
        );
    }

    debug!("Dispatched {} pids across 3 sources", seen.len());
    dispatched
}

/// Runs one blocking read on the blocking pool and sends its result once.
fn spawn_unit<T, F>(
    pid: u32,
    source: DataSource,
    limit: Option<Arc<Semaphore>>,
    read: F,
) -> oneshot::Receiver<Result<T, CollectError>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollectError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        // Acquire only fails on a closed semaphore; this one is never closed.
        let _permit = match limit {
            Some(sem) => sem.acquire_owned().await.ok(),
            None => None,
        };

        let result = match task::spawn_blocking(read).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{} reader for pid {} failed: {}", source, pid, e);
                Err(CollectError::TaskLost {
                    pid,
                    source_name: source,
                })
            }
        };

        if tx.send(result).is_err() {
            debug!("{} result for pid {} dropped: receiver gone", source, pid);
        }
    });

    rx
}
