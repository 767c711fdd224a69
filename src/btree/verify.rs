use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use super::node::KeyRecord;
use super::tree::BTree;
use crate::error::{IndexError, Result};
use crate::key::FixedKey;

/// Outcome of a structural check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    /// True when no findings were recorded.
    pub success: bool,
    /// Nodes reached from the root.
    pub nodes_visited: u64,
    /// Keys seen across all nodes.
    pub distinct_keys: u64,
    /// Sum of all frequencies.
    pub total_occurrences: u64,
    /// Depth of the leaves, if they agree.
    pub leaf_depth: Option<usize>,
    /// Human-readable problems, empty on success.
    pub findings: Vec<String>,
}

struct Walk<K> {
    visited: HashSet<u64>,
    leaf_depth: Option<usize>,
    previous: Option<K>,
    report: VerifyReport,
}

impl<K: FixedKey> Walk<K> {
    fn finding(&mut self, message: String) {
        warn!(finding = %message, "btree.verify.finding");
        self.report.findings.push(message);
    }

    fn record(&mut self, offset: u64, record: &KeyRecord<K>) {
        if record.frequency == 0 {
            self.finding(format!("key {} in @{offset} has frequency 0", record.key));
        }
        if let Some(previous) = &self.previous {
            if previous >= &record.key {
                let message = format!("key {} in @{offset} does not follow {previous}", record.key);
                self.finding(message);
            }
        }
        self.report.distinct_keys += 1;
        self.report.total_occurrences += u64::from(record.frequency);
        self.previous = Some(record.key.clone());
    }
}

impl<K: FixedKey> BTree<K> {
    /// Walks every reachable node and checks the B-tree invariants.
    ///
    /// Structural problems become findings; only I/O failures are errors.
    pub fn verify(&mut self) -> Result<VerifyReport> {
        // every node is written through, so the file is checked rather than memory
        self.root = None;
        self.cache.clear();
        let mut walk = Walk {
            visited: HashSet::new(),
            leaf_depth: None,
            previous: None,
            report: VerifyReport::default(),
        };
        let root = self.header.root_offset;
        self.verify_node(root, 0, &mut walk)?;

        let allocated = u64::from(self.header.node_count);
        if walk.report.nodes_visited > allocated {
            let message = format!(
                "{} nodes reachable but only {allocated} allocated",
                walk.report.nodes_visited
            );
            walk.finding(message);
        }
        let mut report = walk.report;
        report.leaf_depth = walk.leaf_depth;
        report.success = report.findings.is_empty();
        info!(
            success = report.success,
            nodes = report.nodes_visited,
            keys = report.distinct_keys,
            findings = report.findings.len(),
            "btree.verify"
        );
        Ok(report)
    }

    fn verify_node(&mut self, offset: u64, depth: usize, walk: &mut Walk<K>) -> Result<()> {
        if !walk.visited.insert(offset) {
            walk.finding(format!("node @{offset} is reachable more than once"));
            return Ok(());
        }
        match self.layout.index_of(offset) {
            Some(index) if index < u64::from(self.header.node_count) => {}
            _ => {
                walk.finding(format!("child pointer @{offset} is not an allocated node"));
                return Ok(());
            }
        }
        let node = match self.load(offset) {
            Ok(node) => node,
            Err(IndexError::Corruption(message)) => {
                walk.finding(message);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        walk.report.nodes_visited += 1;

        let is_root = offset == self.header.root_offset;
        if !is_root && node.len() < self.layout.min_keys() {
            walk.finding(format!(
                "node @{offset} holds {} keys, minimum is {}",
                node.len(),
                self.layout.min_keys()
            ));
        }

        if node.is_leaf() {
            match walk.leaf_depth {
                None => walk.leaf_depth = Some(depth),
                Some(expected) if expected != depth => walk.finding(format!(
                    "leaf @{offset} at depth {depth}, other leaves at {expected}"
                )),
                Some(_) => {}
            }
            for record in node.keys() {
                walk.record(offset, record);
            }
            return Ok(());
        }

        // In-order walk: each key must exceed everything visited before it.
        for (idx, record) in node.keys().iter().enumerate() {
            self.verify_node(node.child(idx)?, depth + 1, walk)?;
            walk.record(offset, record);
        }
        self.verify_node(node.child(node.len())?, depth + 1, walk)
    }
}
