//! Concurrent per-process collection.
//!
//! `dispatcher` fans each pid out to one task per data source, every task
//! delivering exactly one result over its own oneshot channel. `reducer`
//! drains those channels into the maps the sort and render steps consume.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, instrument};

use crate::cache::OwnerCache;
use crate::error::CollectError;
use crate::process::DEFAULT_PROC_ROOT;

pub mod dispatcher;
pub mod reducer;

pub use dispatcher::{dispatch, DispatchContext, Dispatched, PendingSet};
pub use reducer::{reduce, ReduceStrategy, Reduction};

/// Entry point tying dispatch and reduction together.
#[derive(Debug, Clone)]
pub struct Collector {
    ctx: DispatchContext,
    strategy: ReduceStrategy,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl Collector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            ctx: DispatchContext {
                proc_root: proc_root.into(),
                owners: OwnerCache::shared(),
                limit: None,
            },
            strategy: ReduceStrategy::default(),
        }
    }

    pub fn with_owner_cache(mut self, owners: Arc<OwnerCache>) -> Self {
        self.ctx.owners = owners;
        self
    }

    /// Caps the number of reads in flight. `None` or `Some(0)` is unbounded.
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.ctx.limit = max.filter(|&n| n > 0).map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    pub fn with_strategy(mut self, strategy: ReduceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> ReduceStrategy {
        self.strategy
    }

    /// Launches all reader tasks without waiting for them.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, pids: &[u32]) -> Dispatched {
        dispatch(pids, &self.ctx)
    }

    /// Collects rollup, owner and command line for every pid.
    ///
    /// Per-pid failures are absorbed. The only error returned is a fatal
    /// malformed rollup, and only after every dispatched task was drained.
    #[instrument(skip_all, fields(pids = pids.len(), strategy = ?self.strategy))]
    pub async fn collect(&self, pids: &[u32]) -> Result<Reduction, CollectError> {
        let dispatched = self.dispatch(pids);
        let reduction = reduce(dispatched, self.strategy).await?;
        info!(
            "Collected {} rollups, {} owners, {} command lines",
            reduction.rollups.len(),
            reduction.owners.len(),
            reduction.cmdlines.len()
        );
        Ok(reduction)
    }
}
