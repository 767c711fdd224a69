use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::Serialize;

/// Snapshot of tree statistics at a point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeStatsSnapshot {
    /// Point lookups performed
    pub searches: u64,
    /// Insert calls
    pub inserts: u64,
    /// Inserts that stored a new key
    pub new_keys: u64,
    /// Inserts that only bumped an existing frequency
    pub increments: u64,
    /// Leaf splits performed
    pub leaf_splits: u64,
    /// Internal node splits performed
    pub internal_splits: u64,
    /// Splits of the root, each adding one level
    pub root_splits: u64,
    /// Node blocks read from disk
    pub node_reads: u64,
    /// Node blocks written to disk
    pub node_writes: u64,
}

/// Operation counters for one tree instance.
#[derive(Default, Debug)]
pub struct TreeStats {
    searches: AtomicU64,
    inserts: AtomicU64,
    new_keys: AtomicU64,
    increments: AtomicU64,
    leaf_splits: AtomicU64,
    internal_splits: AtomicU64,
    root_splits: AtomicU64,
    node_reads: AtomicU64,
    node_writes: AtomicU64,
}

impl TreeStats {
    pub(crate) fn inc_searches(&self) {
        self.searches.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_inserts(&self) {
        self.inserts.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_new_keys(&self) {
        self.new_keys.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_increments(&self) {
        self.increments.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_splits(&self, leaf: bool) {
        let counter = if leaf {
            &self.leaf_splits
        } else {
            &self.internal_splits
        };
        counter.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_root_splits(&self) {
        self.root_splits.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_node_reads(&self) {
        self.node_reads.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_node_writes(&self) {
        self.node_writes.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Creates a snapshot of all current statistics.
    pub fn snapshot(&self) -> TreeStatsSnapshot {
        TreeStatsSnapshot {
            searches: self.searches.load(AtomicOrdering::Relaxed),
            inserts: self.inserts.load(AtomicOrdering::Relaxed),
            new_keys: self.new_keys.load(AtomicOrdering::Relaxed),
            increments: self.increments.load(AtomicOrdering::Relaxed),
            leaf_splits: self.leaf_splits.load(AtomicOrdering::Relaxed),
            internal_splits: self.internal_splits.load(AtomicOrdering::Relaxed),
            root_splits: self.root_splits.load(AtomicOrdering::Relaxed),
            node_reads: self.node_reads.load(AtomicOrdering::Relaxed),
            node_writes: self.node_writes.load(AtomicOrdering::Relaxed),
        }
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "genebank::btree::stats",
            searches = snapshot.searches,
            inserts = snapshot.inserts,
            new_keys = snapshot.new_keys,
            increments = snapshot.increments,
            leaf_splits = snapshot.leaf_splits,
            internal_splits = snapshot.internal_splits,
            root_splits = snapshot.root_splits,
            node_reads = snapshot.node_reads,
            node_writes = snapshot.node_writes,
            "btree stats snapshot"
        );
    }
}
