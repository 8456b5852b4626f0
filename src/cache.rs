//! Shared uid -> user name cache.
//!
//! Every owner lookup task reads through this cache. Entries are never
//! evicted.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock as StdRwLock};
use tracing::{trace, warn};

static SHARED_OWNER_CACHE: Lazy<Arc<OwnerCache>> = Lazy::new(|| Arc::new(OwnerCache::new()));

/// Read-mostly uid -> name map guarded by a reader/writer lock.
#[derive(Debug, Default)]
pub struct OwnerCache {
    names: StdRwLock<HashMap<u32, String>>,
}

impl OwnerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache instance.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_OWNER_CACHE)
    }

    pub fn get(&self, uid: u32) -> Option<String> {
        self.names.read().ok()?.get(&uid).cloned()
    }

    pub fn insert(&self, uid: u32, name: String) {
        match self.names.write() {
            Ok(mut names) => {
                names.insert(uid, name);
            }
            Err(_) => warn!("Owner cache lock poisoned, not caching uid {}", uid),
        }
    }

    pub fn len(&self) -> usize {
        self.names.read().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached name for `uid`, calling `lookup` on a miss.
    ///
    /// The lookup runs with no lock held. Two concurrent misses for the same
    /// uid may both look it up; the later insert wins, which is harmless
    /// since both resolve the same name. Failed lookups are not cached and
    /// yield an empty string.
    pub fn resolve_with<F>(&self, uid: u32, lookup: F) -> String
    where
        F: FnOnce(u32) -> Option<String>,
    {
        if let Some(name) = self.get(uid) {
            trace!("Owner cache hit for uid {}", uid);
            return name;
        }

        match lookup(uid) {
            Some(name) => {
                self.insert(uid, name.clone());
                name
            }
            None => String::new(),
        }
    }
}
