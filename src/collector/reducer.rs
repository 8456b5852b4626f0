//! Fan-in of per-pid results into keyed collections.
//!
//! Two draining strategies produce the same maps:
//! - `Sequential` awaits each pid's receiver in submission order.
//! - `Multiplexed` waits on all pending receivers at once and handles
//!   whichever completes first, so a slow pid never holds up fast ones.
//!
//! Both consume every receiver exactly once before returning.

use std::fmt;
use std::str::FromStr;

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::collector::dispatcher::{Dispatched, PendingSet};
use crate::error::CollectError;
use crate::process::{DataSource, MemoryRollup, ProcessOwner};

/// How the reducer waits on outstanding results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReduceStrategy {
    Sequential,
    #[default]
    Multiplexed,
}

impl fmt::Display for ReduceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReduceStrategy::Sequential => f.write_str("sequential"),
            ReduceStrategy::Multiplexed => f.write_str("multiplexed"),
        }
    }
}

impl FromStr for ReduceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ReduceStrategy::Sequential),
            "multiplexed" => Ok(ReduceStrategy::Multiplexed),
            other => Err(format!(
                "unknown reducer '{}', expected 'sequential' or 'multiplexed'",
                other
            )),
        }
    }
}

/// Reducer output. `rollups` is the authoritative row set; the two maps
/// are lookups joined by pid.
#[derive(Debug, Default)]
pub struct Reduction {
    pub rollups: Vec<MemoryRollup>,
    pub owners: HashMap<u32, ProcessOwner>,
    pub cmdlines: HashMap<u32, String>,
}

/// Drains all three sources concurrently.
///
/// Failed entries are dropped; rollups with no stats are dropped. A fatal
/// error is returned only after every receiver has been consumed.
pub async fn reduce(
    dispatched: Dispatched,
    strategy: ReduceStrategy,
) -> Result<Reduction, CollectError> {
    let Dispatched {
        rollups,
        owners,
        cmdlines,
    } = dispatched;

    let (rollups, owners, cmdlines) = tokio::join!(
        drain(rollups, strategy),
        drain(owners, strategy),
        drain(cmdlines, strategy),
    );

    let mut fatal = None;
    let mut reduction = Reduction::default();

    for (pid, rollup) in take_results(rollups, &mut fatal) {
        if rollup.is_empty() {
            debug!("Dropping pid {}: rollup has no stats", pid);
            continue;
        }
        reduction.rollups.push(rollup);
    }
    reduction.owners = take_results(owners, &mut fatal).into_iter().collect();
    reduction.cmdlines = take_results(cmdlines, &mut fatal).into_iter().collect();

    match fatal {
        Some(err) => Err(err),
        None => Ok(reduction),
    }
}

/// Successful values plus the first fatal error seen while draining.
struct Drained<T> {
    source: DataSource,
    values: Vec<(u32, T)>,
    fatal: Option<CollectError>,
}

fn take_results<T>(drained: Drained<T>, fatal: &mut Option<CollectError>) -> Vec<(u32, T)> {
    if let Some(err) = drained.fatal {
        error!("Fatal {} error: {}", drained.source, err);
        if fatal.is_none() {
            *fatal = Some(err);
        }
    }
    drained.values
}

async fn drain<T: Send + 'static>(pending: PendingSet<T>, strategy: ReduceStrategy) -> Drained<T> {
    let mut drained = Drained {
        source: pending.source,
        values: Vec::with_capacity(pending.len()),
        fatal: None,
    };

    match strategy {
        ReduceStrategy::Sequential => {
            for (pid, rx) in pending.entries {
                let received = rx.await;
                accept(&mut drained, pid, received);
            }
        }
        ReduceStrategy::Multiplexed => {
            let mut waiting = JoinSet::new();
            for (pid, rx) in pending.entries {
                waiting.spawn(async move { (pid, rx.await) });
            }
            while let Some(joined) = waiting.join_next().await {
                match joined {
                    Ok((pid, received)) => accept(&mut drained, pid, received),
                    Err(e) => warn!("Waiting on a {} result failed: {}", drained.source, e),
                }
            }
        }
    }

    drained
}

fn accept<T>(
    drained: &mut Drained<T>,
    pid: u32,
    received: Result<Result<T, CollectError>, oneshot::error::RecvError>,
) {
    let result = received.unwrap_or_else(|_| {
        Err(CollectError::TaskLost {
            pid,
            source_name: drained.source,
        })
    });

    match result {
        Ok(value) => drained.values.push((pid, value)),
        Err(err) if err.is_fatal() => {
            if drained.fatal.is_none() {
                drained.fatal = Some(err);
            }
        }
        Err(err) => err.log_skip(drained.source),
    }
}
