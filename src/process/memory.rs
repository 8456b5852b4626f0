//! Memory rollup parsing for `/proc/<pid>/smaps_rollup`.
//!
//! The rollup file is one header line followed by `Key:   value kB` lines:
//!
//! ```text
//! 55d4c2a3e000-7ffd1b3f6000 ---p 00000000 00:00 0     [rollup]
//! Rss:                3960 kB
//! Pss:                1230 kB
//! Private_Clean:       120 kB
//! Private_Dirty:       988 kB
//! ```
//!
//! Stat names are lower-cased. Every stat present is kept; only `rss`, `pss`,
//! `private_clean` and `private_dirty` are interpreted downstream.

use std::fmt;
use std::fs;
use std::path::Path;

use ahash::AHashMap as HashMap;
use tracing::{debug, warn};

use crate::error::CollectError;
use crate::process::DataSource;

pub const SMAPS_ROLLUP_FILE: &str = "smaps_rollup";

pub const STAT_RSS: &str = "rss";
pub const STAT_PSS: &str = "pss";
pub const STAT_PRIVATE_CLEAN: &str = "private_clean";
pub const STAT_PRIVATE_DIRTY: &str = "private_dirty";

/// Address range from the rollup header. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupHeader {
    pub start: u64,
    pub end: u64,
}

/// Parsed rollup for one process. Values are in kilobytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRollup {
    pub pid: u32,
    pub header: RollupHeader,
    pub stats: HashMap<String, u64>,
}

impl MemoryRollup {
    pub fn new(pid: u32, header: RollupHeader) -> Self {
        Self {
            pid,
            header,
            stats: HashMap::new(),
        }
    }

    /// Builder-style stat insertion, mostly useful for fixtures.
    pub fn with_stat(mut self, name: &str, kb: u64) -> Self {
        self.stats.insert(name.to_ascii_lowercase(), kb);
        self
    }

    /// Looks up a stat by lower-cased name. `None` means unknown, not zero.
    pub fn stat(&self, name: &str) -> Option<u64> {
        self.stats.get(name).copied()
    }

    pub fn rss(&self) -> u64 {
        self.stat(STAT_RSS).unwrap_or(0)
    }

    pub fn pss(&self) -> u64 {
        self.stat(STAT_PSS).unwrap_or(0)
    }

    /// Unique set size: private clean plus private dirty pages, saturating
    /// at `u64::MAX`.
    pub fn uss(&self) -> u64 {
        self.stat(STAT_PRIVATE_CLEAN)
            .unwrap_or(0)
            .saturating_add(self.stat(STAT_PRIVATE_DIRTY).unwrap_or(0))
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

/// Writes the rollup back in smaps_rollup layout, stats ordered by name.
impl fmt::Display for MemoryRollup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:x}-{:x} ---p 00000000 00:00 0 [rollup]",
            self.header.start, self.header.end
        )?;
        let mut stats: Vec<(&String, &u64)> = self.stats.iter().collect();
        stats.sort();
        for (name, kb) in stats {
            writeln!(f, "{}: {} kB", name, kb)?;
        }
        Ok(())
    }
}

/// Reads and parses the rollup of one process.
pub fn read_memory_rollup(proc_root: &Path, pid: u32) -> Result<MemoryRollup, CollectError> {
    let path = proc_root.join(pid.to_string()).join(SMAPS_ROLLUP_FILE);
    let contents =
        fs::read_to_string(&path).map_err(|e| CollectError::from_io(pid, path.clone(), e))?;

    // Kernel threads expose an empty rollup rather than an error.
    if contents.trim().is_empty() {
        return Err(CollectError::EmptyResult {
            pid,
            source_name: DataSource::Rollup,
        });
    }

    parse_smaps_rollup(pid, &contents)
}

/// Parses rollup text. A malformed header is fatal; malformed stat lines
/// are skipped one at a time.
pub fn parse_smaps_rollup(pid: u32, contents: &str) -> Result<MemoryRollup, CollectError> {
    let mut lines = contents.lines();
    let header = match lines.next() {
        Some(line) => parse_header_line(pid, line)?,
        None => return Ok(MemoryRollup::new(pid, RollupHeader::default())),
    };

    let mut rollup = MemoryRollup::new(pid, header);
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Some((name, kb)) = parse_stat_line(pid, line) {
            rollup.stats.insert(name, kb);
        }
    }

    Ok(rollup)
}

fn parse_header_line(pid: u32, line: &str) -> Result<RollupHeader, CollectError> {
    let malformed = |reason: String| CollectError::MalformedInput {
        pid,
        source_name: DataSource::Rollup,
        reason,
    };

    let range = line.split_whitespace().next().unwrap_or("");
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| malformed(format!("header without address range: {:?}", line)))?;

    let start = u64::from_str_radix(start, 16)
        .map_err(|e| malformed(format!("bad range start {:?}: {}", start, e)))?;
    let end = u64::from_str_radix(end, 16)
        .map_err(|e| malformed(format!("bad range end {:?}: {}", end, e)))?;

    Ok(RollupHeader { start, end })
}

fn parse_stat_line(pid: u32, line: &str) -> Option<(String, u64)> {
    let Some((key, value)) = line.split_once(':') else {
        debug!("pid {}: ignoring rollup line without colon: {:?}", pid, line);
        return None;
    };

    match parse_kb_value(value) {
        Some(kb) => Some((key.trim().to_ascii_lowercase(), kb)),
        None => {
            warn!("pid {}: ignoring non-integer rollup stat {:?}", pid, line);
            None
        }
    }
}

/// Parses kilobyte values from smaps lines (first token after the colon).
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}
