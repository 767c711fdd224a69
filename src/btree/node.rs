use super::layout::NodeLayout;
use crate::error::{IndexError, Result};
use crate::key::FixedKey;

/// A stored key and the number of times it has been inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRecord<K> {
    /// The indexed key.
    pub key: K,
    /// Occurrence count; at least 1 for every stored key.
    pub frequency: u32,
}

impl<K> KeyRecord<K> {
    /// Record for the first occurrence of `key`.
    pub fn new(key: K) -> Self {
        Self { key, frequency: 1 }
    }
}

/// One B-tree page.
///
/// A node is identified by its file offset, assigned once at allocation.
/// Children are referenced by offset only; hydrated nodes are snapshots of
/// the on-disk block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node<K> {
    offset: u64,
    leaf: bool,
    keys: Vec<KeyRecord<K>>,
    children: Vec<u64>,
}

impl<K: FixedKey> Node<K> {
    /// Empty leaf at `offset`.
    pub fn new_leaf(offset: u64) -> Self {
        Self::empty(offset, true)
    }

    /// Empty internal node at `offset`.
    pub fn new_internal(offset: u64) -> Self {
        Self::empty(offset, false)
    }

    fn empty(offset: u64, leaf: bool) -> Self {
        Self {
            offset,
            leaf,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        offset: u64,
        leaf: bool,
        keys: Vec<KeyRecord<K>>,
        children: Vec<u64>,
    ) -> Self {
        Self {
            offset,
            leaf,
            keys,
            children,
        }
    }

    /// File offset of this node's block.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True for leaves.
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Number of key records (`n`).
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the node holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key records in ascending order.
    pub fn keys(&self) -> &[KeyRecord<K>] {
        &self.keys
    }

    /// Child offsets; empty for leaves, `n + 1` entries otherwise.
    pub fn children(&self) -> &[u64] {
        &self.children
    }

    /// True when the node holds `2d - 1` keys.
    pub fn is_full(&self, layout: &NodeLayout) -> bool {
        self.keys.len() >= layout.max_keys()
    }

    /// Binary search over this node's own keys.
    ///
    /// `Ok(i)` is the slot holding `key`; `Err(i)` is the number of keys
    /// smaller than `key`, which is also the child to descend into.
    pub fn search(&self, key: &K) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by(|record| record.key.cmp(key))
    }

    /// Whether `key` is stored in this node (not its subtree).
    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    /// Offset of child `idx`.
    pub fn child(&self, idx: usize) -> Result<u64> {
        self.children.get(idx).copied().ok_or_else(|| {
            IndexError::corruption(format!(
                "node {} has no child {idx} ({} keys, leaf={})",
                self.offset,
                self.keys.len(),
                self.leaf
            ))
        })
    }

    /// Increments the frequency of record `idx`, returning the new count.
    pub(crate) fn bump(&mut self, idx: usize) -> u32 {
        let record = &mut self.keys[idx];
        record.frequency = record.frequency.saturating_add(1);
        record.frequency
    }

    /// Inserts a fresh record at `idx`, shifting larger keys right.
    pub(crate) fn insert_record(&mut self, idx: usize, record: KeyRecord<K>) {
        self.keys.insert(idx, record);
    }

    pub(crate) fn push_child(&mut self, offset: u64) {
        self.children.push(offset);
    }

    /// Removes the median and upper half of a full node.
    ///
    /// Keeps keys `[0, d-1)` (and children `[0, d)`) in place and returns the
    /// median at `d - 1`, the upper keys `[d, 2d-1)` and, for internal nodes,
    /// the upper children `[d, 2d)`.
    pub(crate) fn split_off_upper(
        &mut self,
        degree: usize,
    ) -> Result<(KeyRecord<K>, Vec<KeyRecord<K>>, Vec<u64>)> {
        if self.keys.len() != 2 * degree - 1 {
            return Err(IndexError::corruption(format!(
                "split of node {} with {} keys (degree {degree})",
                self.offset,
                self.keys.len()
            )));
        }
        let upper_keys = self.keys.split_off(degree);
        let median = self
            .keys
            .pop()
            .ok_or_else(|| IndexError::corruption("split of empty node"))?;
        let upper_children = if self.leaf {
            Vec::new()
        } else {
            self.children.split_off(degree)
        };
        Ok((median, upper_keys, upper_children))
    }

    /// Parent side of a split: `right` becomes child `idx + 1` and `median`
    /// key `idx`.
    pub(crate) fn adopt(&mut self, idx: usize, median: KeyRecord<K>, right: u64) {
        self.children.insert(idx + 1, right);
        self.keys.insert(idx, median);
    }
}
