use std::num::NonZeroUsize;

use lru::LruCache;
use serde::Serialize;
use tracing::trace;

use super::node::Node;

/// Counters describing cache effectiveness.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Configured capacity (0 or 1 means disabled).
    pub capacity: usize,
    /// Nodes currently cached.
    pub len: usize,
    /// Lookups served from memory.
    pub hits: u64,
    /// Lookups that had to go to disk.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
}

/// Bounded LRU map from node offset to hydrated node.
///
/// Entries are clean snapshots: every mutation is written to disk before the
/// cache is refreshed, so an evicted entry never needs a write-back.
pub struct PageCache<K> {
    entries: Option<LruCache<u64, Node<K>>>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Clone> PageCache<K> {
    /// Cache holding up to `capacity` nodes; `capacity <= 1` disables it.
    pub fn new(capacity: usize) -> Self {
        let entries = NonZeroUsize::new(capacity)
            .filter(|cap| cap.get() > 1)
            .map(LruCache::new);
        Self {
            entries,
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Whether lookups can ever hit.
    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Returns a copy of the node at `offset`, marking it most recently used.
    pub fn get(&mut self, offset: u64) -> Option<Node<K>> {
        let found = self
            .entries
            .as_mut()
            .and_then(|entries| entries.get(&offset).cloned());
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Stores `node` as most recently used, evicting the oldest entry if full.
    pub fn insert(&mut self, offset: u64, node: Node<K>) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        if let Some((evicted, _)) = entries.push(offset, node) {
            if evicted != offset {
                self.evictions += 1;
                trace!(evicted, inserted = offset, "cache.evict");
            }
        }
    }

    /// Drops every cached node.
    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    /// Number of cached nodes.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            len: self.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}
