use std::cmp::Ordering;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::cache::{CacheStats, PageCache};
use super::codec::NodeCodec;
use super::header::Header;
use super::layout::{optimal_degree, NodeLayout, DEFAULT_PAGE_BUDGET, HEADER_LEN};
use super::node::{KeyRecord, Node};
use super::stats::{TreeStats, TreeStatsSnapshot};
use crate::error::{IndexError, Result};
use crate::key::FixedKey;
use crate::primitives::io::{FileIo, StdFileIo};

/// Default number of hydrated nodes kept in memory (caching disabled).
pub const DEFAULT_CACHE_SIZE: usize = 0;

/// Options for creating or opening a tree.
#[derive(Clone, Debug, Default)]
pub struct TreeOptions {
    /// Minimum degree of a new tree. 0 picks the largest degree whose node
    /// fits a 4 KiB page. An existing file always keeps its own degree.
    pub degree: u32,
    /// Maximum hydrated nodes kept in the LRU cache; 0 or 1 disables it.
    pub cache_size: usize,
}

impl TreeOptions {
    /// Options with an explicit degree and cache size.
    pub fn new(degree: u32, cache_size: usize) -> Self {
        Self { degree, cache_size }
    }
}

/// Summary of a tree, suitable for printing or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct TreeReport {
    /// Backing file.
    pub path: String,
    /// Minimum degree.
    pub degree: u32,
    /// Encoded key length in bytes.
    pub key_len: usize,
    /// Bytes per node block.
    pub node_len: usize,
    /// Node blocks allocated.
    pub node_count: u32,
    /// Offset of the root block.
    pub root_offset: u64,
    /// Backing file size in bytes.
    pub file_len: u64,
    /// Levels from root to leaves.
    pub height: usize,
    /// Distinct keys stored.
    pub distinct_keys: u64,
    /// Sum of all frequencies.
    pub total_occurrences: u64,
    /// Page cache counters.
    pub cache: CacheStats,
    /// Operation counters.
    pub ops: TreeStatsSnapshot,
}

/// Disk-resident B-tree mapping fixed-width keys to occurrence counts.
///
/// Nodes are fixed-size blocks in one append-only file and refer to each
/// other by byte offset. The tree owns the file handle and keeps the root
/// hydrated; every other node is resolved through the [`PageCache`] and read
/// from disk on a miss. Each mutation is written through synchronously.
pub struct BTree<K: FixedKey> {
    pub(super) io: Arc<dyn FileIo>,
    pub(super) path: PathBuf,
    pub(super) layout: NodeLayout,
    pub(super) codec: NodeCodec,
    pub(super) header: Header,
    pub(super) root: Option<Node<K>>,
    pub(super) cache: PageCache<K>,
    pub(super) stats: TreeStats,
    writable: bool,
}

impl<K: FixedKey> BTree<K> {
    /// Creates (or truncates) `path` and writes an empty tree into it.
    pub fn create(path: impl AsRef<Path>, options: TreeOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let degree = match options.degree {
            0 => optimal_degree(K::ENCODED_LEN, DEFAULT_PAGE_BUDGET),
            d => d,
        };
        let layout = NodeLayout::for_key::<K>(degree)?;
        let io: Arc<dyn FileIo> = Arc::new(StdFileIo::create(&path)?);
        let header = Header::new(degree);
        io.write_at(0, &header.encode())?;

        let mut tree = Self {
            io,
            path,
            layout,
            codec: NodeCodec::new(layout),
            header,
            root: None,
            cache: PageCache::new(options.cache_size),
            stats: TreeStats::default(),
            writable: true,
        };
        let offset = tree.allocate()?;
        debug_assert_eq!(offset, HEADER_LEN);
        tree.header.root_offset = offset;
        tree.save(&Node::new_leaf(offset))?;
        info!(
            path = %tree.path.display(),
            degree,
            node_len = layout.node_len(),
            cache_size = options.cache_size,
            cache_enabled = tree.cache.is_enabled(),
            "btree.create"
        );
        Ok(tree)
    }

    /// Opens an existing tree. The root is hydrated on first access.
    pub fn open(path: impl AsRef<Path>, options: TreeOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let io = StdFileIo::open_existing(&path)?;
        Self::open_with(Arc::new(io), path, options, true)
    }

    /// Opens an existing tree for queries only.
    ///
    /// The file is opened without write access. [`insert`](Self::insert)
    /// fails with [`IndexError::ReadOnly`] and `flush`/`close` write nothing.
    pub fn open_read_only(path: impl AsRef<Path>, options: TreeOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let io = StdFileIo::open_read_only(&path)?;
        Self::open_with(Arc::new(io), path, options, false)
    }

    fn open_with(
        io: Arc<dyn FileIo>,
        path: PathBuf,
        options: TreeOptions,
        writable: bool,
    ) -> Result<Self> {
        let file_len = io.len()?;
        if file_len < HEADER_LEN {
            return Err(IndexError::corruption(format!(
                "{} is {file_len} bytes, shorter than the header",
                path.display()
            )));
        }
        let mut buf = [0u8; Header::LEN];
        io.read_at(0, &mut buf)?;
        let header = Header::decode(&buf)?;
        let layout = NodeLayout::for_key::<K>(header.degree).map_err(|_| {
            IndexError::corruption(format!("header degree {} is unusable", header.degree))
        })?;
        header.validate(&layout, file_len)?;
        if options.degree != 0 && options.degree != header.degree {
            warn!(
                requested = options.degree,
                stored = header.degree,
                "btree.open.degree_ignored"
            );
        }
        let cache = PageCache::new(options.cache_size);
        info!(
            path = %path.display(),
            degree = header.degree,
            root = header.root_offset,
            node_count = header.node_count,
            writable,
            cache_enabled = cache.is_enabled(),
            "btree.open"
        );
        Ok(Self {
            io,
            path,
            layout,
            codec: NodeCodec::new(layout),
            header,
            root: None,
            cache,
            stats: TreeStats::default(),
            writable,
        })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False for trees opened with [`open_read_only`](Self::open_read_only).
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Node geometry.
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Minimum degree.
    pub fn degree(&self) -> u32 {
        self.header.degree
    }

    /// Nodes allocated so far.
    pub fn node_count(&self) -> u32 {
        self.header.node_count
    }

    /// Offset of the current root.
    pub fn root_offset(&self) -> u64 {
        self.header.root_offset
    }

    /// Page cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Operation counters.
    pub fn stats(&self) -> TreeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the frequency stored for `key`, or `None` if it was never inserted.
    pub fn search(&mut self, key: &K) -> Result<Option<u32>> {
        self.stats.inc_searches();
        let mut offset = self.header.root_offset;
        for _ in 0..=self.descent_limit() {
            let node = self.load(offset)?;
            match node.search(key) {
                Ok(idx) => return Ok(Some(node.keys()[idx].frequency)),
                Err(_) if node.is_leaf() => return Ok(None),
                Err(idx) => offset = node.child(idx)?,
            }
        }
        Err(self.descent_overflow())
    }

    /// Records one occurrence of `key`, returning its frequency afterwards.
    ///
    /// A key already present anywhere in the tree only has its frequency
    /// incremented; it is never stored twice.
    pub fn insert(&mut self, key: K) -> Result<u32> {
        if !self.writable {
            return Err(IndexError::ReadOnly(self.path.clone()));
        }
        self.stats.inc_inserts();
        let mut root = self.load(self.header.root_offset)?;
        if root.is_full(&self.layout) && !root.contains(&key) {
            root = self.grow_root(root)?;
        }
        self.insert_non_full(root, key)
    }

    /// Visits every record in ascending key order.
    pub fn for_each<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&KeyRecord<K>) -> Result<()>,
    {
        let root = self.header.root_offset;
        self.walk_in_order(root, 0, &mut visit)
    }

    /// Collects every record in ascending key order.
    pub fn records(&mut self) -> Result<Vec<KeyRecord<K>>> {
        let mut records = Vec::new();
        self.for_each(|record| {
            records.push(record.clone());
            Ok(())
        })?;
        Ok(records)
    }

    /// Writes `<frequency> <key>` for every record, in key order.
    pub fn dump<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.for_each(|record| {
            writeln!(out, "{} {}", record.frequency, record.key)?;
            Ok(())
        })
    }

    /// Writes one line per node with its offset, kind, parent link and keys.
    pub fn dump_shape<W: Write>(&mut self, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "degree={} node_len={} nodes={} root=@{}",
            self.header.degree,
            self.layout.node_len(),
            self.header.node_count,
            self.header.root_offset
        )?;
        let root = self.header.root_offset;
        self.write_shape(root, None, 0, out)
    }

    /// Number of levels, counting the root.
    pub fn height(&mut self) -> Result<usize> {
        let mut node = self.load(self.header.root_offset)?;
        let mut height = 1usize;
        while !node.is_leaf() {
            if height as u64 > self.descent_limit() {
                return Err(self.descent_overflow());
            }
            node = self.load(node.child(0)?)?;
            height += 1;
        }
        Ok(height)
    }

    /// Collects counters and shape information.
    pub fn report(&mut self) -> Result<TreeReport> {
        let mut distinct_keys = 0u64;
        let mut total_occurrences = 0u64;
        self.for_each(|record| {
            distinct_keys += 1;
            total_occurrences += u64::from(record.frequency);
            Ok(())
        })?;
        Ok(TreeReport {
            path: self.path.display().to_string(),
            degree: self.header.degree,
            key_len: self.layout.key_len(),
            node_len: self.layout.node_len(),
            node_count: self.header.node_count,
            root_offset: self.header.root_offset,
            file_len: self.io.len()?,
            height: self.height()?,
            distinct_keys,
            total_occurrences,
            cache: self.cache.stats(),
            ops: self.stats.snapshot(),
        })
    }

    /// Persists the root and the header, then syncs the file.
    ///
    /// A read-only tree has nothing to persist.
    pub fn flush(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }
        if let Some(root) = self.root.as_ref() {
            self.codec.write(self.io.as_ref(), root)?;
            self.stats.inc_node_writes();
        }
        self.io.write_at(0, &self.header.encode())?;
        self.io.sync_all()?;
        debug!(
            root = self.header.root_offset,
            node_count = self.header.node_count,
            "btree.flush"
        );
        Ok(())
    }

    /// Flushes and releases the file.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.stats.emit_tracing();
        info!(
            path = %self.path.display(),
            root = self.header.root_offset,
            node_count = self.header.node_count,
            "btree.close"
        );
        Ok(())
    }

    fn insert_non_full(&mut self, mut node: Node<K>, key: K) -> Result<u32> {
        for _ in 0..=self.descent_limit() {
            let idx = match node.search(&key) {
                Ok(idx) => {
                    let frequency = node.bump(idx);
                    self.save(&node)?;
                    self.stats.inc_increments();
                    return Ok(frequency);
                }
                Err(idx) if node.is_leaf() => {
                    node.insert_record(idx, KeyRecord::new(key));
                    self.save(&node)?;
                    self.stats.inc_new_keys();
                    return Ok(1);
                }
                Err(idx) => idx,
            };

            let child = self.load(node.child(idx)?)?;
            node = if child.is_full(&self.layout) && !child.contains(&key) {
                let (left, right) = self.split_child(&mut node, idx, child)?;
                match key.cmp(&node.keys()[idx].key) {
                    Ordering::Less => left,
                    Ordering::Greater => right,
                    Ordering::Equal => node,
                }
            } else {
                child
            };
        }
        Err(self.descent_overflow())
    }

    /// Puts a new root above `old_root` and splits it; the tree grows one level.
    fn grow_root(&mut self, old_root: Node<K>) -> Result<Node<K>> {
        let mut new_root = Node::new_internal(self.allocate()?);
        new_root.push_child(old_root.offset());
        self.header.root_offset = new_root.offset();
        self.root = None;
        self.split_child(&mut new_root, 0, old_root)?;
        self.stats.inc_root_splits();
        debug!(
            root = new_root.offset(),
            node_count = self.header.node_count,
            "btree.root_split"
        );
        Ok(new_root)
    }

    /// Splits the full `child` found at `parent.children[idx]`.
    ///
    /// Returns the shrunken child and its new right sibling, both persisted
    /// together with the parent.
    fn split_child(
        &mut self,
        parent: &mut Node<K>,
        idx: usize,
        mut child: Node<K>,
    ) -> Result<(Node<K>, Node<K>)> {
        debug_assert_eq!(parent.children().get(idx), Some(&child.offset()));
        let (median, upper_keys, upper_children) = child.split_off_upper(self.layout.degree())?;
        let sibling = Node::from_parts(
            self.allocate()?,
            child.is_leaf(),
            upper_keys,
            upper_children,
        );
        parent.adopt(idx, median, sibling.offset());

        self.save(&child)?;
        self.save(&sibling)?;
        self.save(parent)?;
        self.stats.inc_splits(child.is_leaf());
        debug!(
            parent = parent.offset(),
            left = child.offset(),
            right = sibling.offset(),
            leaf = child.is_leaf(),
            "btree.split_child"
        );
        Ok((child, sibling))
    }

    /// Bump-allocates the next block offset.
    fn allocate(&mut self) -> Result<u64> {
        let offset = self.layout.offset_for(self.header.node_count)?;
        self.header.node_count = self
            .header
            .node_count
            .checked_add(1)
            .ok_or_else(|| IndexError::corruption("node count exhausted"))?;
        Ok(offset)
    }

    /// Resolves the node at `offset`: root slot, then cache, then disk.
    pub(super) fn load(&mut self, offset: u64) -> Result<Node<K>> {
        if offset == self.header.root_offset {
            if let Some(root) = &self.root {
                return Ok(root.clone());
            }
        } else if let Some(node) = self.cache.get(offset) {
            return Ok(node);
        }
        let node: Node<K> = self.codec.read(self.io.as_ref(), offset)?;
        self.stats.inc_node_reads();
        self.remember(node.clone());
        Ok(node)
    }

    /// Writes `node` to its block and refreshes the in-memory copy.
    fn save(&mut self, node: &Node<K>) -> Result<()> {
        self.codec.write(self.io.as_ref(), node)?;
        self.stats.inc_node_writes();
        self.remember(node.clone());
        Ok(())
    }

    fn remember(&mut self, node: Node<K>) {
        if node.offset() == self.header.root_offset {
            self.root = Some(node);
        } else {
            self.cache.insert(node.offset(), node);
        }
    }

    /// No valid path is longer than the number of allocated nodes.
    pub(super) fn descent_limit(&self) -> u64 {
        u64::from(self.header.node_count)
    }

    pub(super) fn descent_overflow(&self) -> IndexError {
        IndexError::corruption(format!(
            "descent from root {} exceeded {} levels",
            self.header.root_offset, self.header.node_count
        ))
    }

    fn walk_in_order(
        &mut self,
        offset: u64,
        depth: u64,
        visit: &mut dyn FnMut(&KeyRecord<K>) -> Result<()>,
    ) -> Result<()> {
        if depth > self.descent_limit() {
            return Err(self.descent_overflow());
        }
        let node = self.load(offset)?;
        if node.is_leaf() {
            for record in node.keys() {
                visit(record)?;
            }
            return Ok(());
        }
        for (idx, record) in node.keys().iter().enumerate() {
            self.walk_in_order(node.child(idx)?, depth + 1, visit)?;
            visit(record)?;
        }
        self.walk_in_order(node.child(node.len())?, depth + 1, visit)
    }

    fn write_shape<W: Write>(
        &mut self,
        offset: u64,
        parent: Option<(u64, usize)>,
        depth: usize,
        out: &mut W,
    ) -> Result<()> {
        if depth as u64 > self.descent_limit() {
            return Err(self.descent_overflow());
        }
        let node = self.load(offset)?;
        let link = match parent {
            None => "root".to_string(),
            Some((parent, idx)) => format!("child {idx} of @{parent}"),
        };
        let keys: Vec<String> = node
            .keys()
            .iter()
            .map(|record| format!("{}x{}", record.key, record.frequency))
            .collect();
        writeln!(
            out,
            "{:indent$}@{} {} ({}) n={} keys=[{}]",
            "",
            offset,
            if node.is_leaf() { "leaf" } else { "internal" },
            link,
            node.len(),
            keys.join(", "),
            indent = depth * 2
        )?;
        for (idx, &child) in node.children().iter().enumerate() {
            self.write_shape(child, Some((offset, idx)), depth + 1, out)?;
        }
        Ok(())
    }
}
