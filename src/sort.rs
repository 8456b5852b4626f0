//! Ordering of collected rollups.
//!
//! Keys are resolved once into [`SortKey`], each variant reading one typed
//! value from a rollup or from the owner/command line maps. Reversal is
//! applied inside the comparator so equal rows keep their input order in
//! both directions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ahash::AHashMap as HashMap;

use crate::process::{MemoryRollup, ProcessOwner};

/// Key names accepted from users, lower case.
pub const ALLOWED_SORT_KEYS: [&str; 6] = ["pid", "rss", "pss", "uss", "user", "command"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Pid,
    Uss,
    Pss,
    Rss,
    User,
    Command,
    /// Any other rollup stat by lower-cased name; missing compares as zero.
    Stat(String),
}

impl SortKey {
    pub fn stat(name: &str) -> Self {
        SortKey::Stat(name.to_ascii_lowercase())
    }

    pub fn name(&self) -> &str {
        match self {
            SortKey::Pid => "pid",
            SortKey::Uss => "uss",
            SortKey::Pss => "pss",
            SortKey::Rss => "rss",
            SortKey::User => "user",
            SortKey::Command => "command",
            SortKey::Stat(name) => name,
        }
    }
}

/// Parses one of [`ALLOWED_SORT_KEYS`], ignoring case.
impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pid" => Ok(SortKey::Pid),
            "uss" => Ok(SortKey::Uss),
            "pss" => Ok(SortKey::Pss),
            "rss" => Ok(SortKey::Rss),
            "user" => Ok(SortKey::User),
            "command" => Ok(SortKey::Command),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compares two rollups by `key`, ascending.
pub fn compare(
    key: &SortKey,
    a: &MemoryRollup,
    b: &MemoryRollup,
    owners: &HashMap<u32, ProcessOwner>,
    cmdlines: &HashMap<u32, String>,
) -> Ordering {
    let username = |pid: u32| owners.get(&pid).map_or("", |o| o.username.as_str());
    let command = |pid: u32| cmdlines.get(&pid).map_or("", String::as_str);

    match key {
        SortKey::Pid => a.pid.cmp(&b.pid),
        SortKey::Uss => a.uss().cmp(&b.uss()),
        SortKey::Pss => a.pss().cmp(&b.pss()),
        SortKey::Rss => a.rss().cmp(&b.rss()),
        SortKey::User => username(a.pid).cmp(username(b.pid)),
        SortKey::Command => command(a.pid).cmp(command(b.pid)),
        SortKey::Stat(name) => {
            let value = |r: &MemoryRollup| r.stat(name).unwrap_or(0);
            value(a).cmp(&value(b))
        }
    }
}

/// Stable in-place sort of rollups.
pub fn sort_rollups(
    rollups: &mut [MemoryRollup],
    owners: &HashMap<u32, ProcessOwner>,
    cmdlines: &HashMap<u32, String>,
    key: &SortKey,
    reverse: bool,
) {
    rollups.sort_by(|a, b| {
        let ord = compare(key, a, b, owners, cmdlines);
        if reverse {
            ord.reverse()
        } else {
            ord
        }
    });
}
