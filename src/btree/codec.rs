use super::layout::{NodeLayout, CHILD_PTR_LEN, FREQUENCY_LEN, NODE_PREFIX_LEN};
use super::node::{KeyRecord, Node};
use crate::error::{IndexError, Result};
use crate::key::FixedKey;
use crate::primitives::io::FileIo;

/// Converts nodes to and from their fixed-size on-disk blocks.
///
/// Block layout (integers little-endian):
///
/// ```text
/// [0, 8)    offset of the block itself
/// [8, 12)   key count n
/// [12]      leaf flag (0/1)
/// [13, ..)  2d-1 record slots: encoded key + u32 frequency
/// [.., end) 2d child slots: u64 offsets, first n+1 valid for internal nodes
/// ```
///
/// Unused slots are padded so the block is always written in full.
#[derive(Clone, Copy, Debug)]
pub struct NodeCodec {
    layout: NodeLayout,
}

impl NodeCodec {
    /// Codec for blocks of `layout`.
    pub fn new(layout: NodeLayout) -> Self {
        Self { layout }
    }

    /// Serializes `node` into `buf`, which must be exactly one block long.
    pub fn encode<K: FixedKey>(&self, node: &Node<K>, buf: &mut [u8]) -> Result<()> {
        let layout = &self.layout;
        if buf.len() != layout.node_len() {
            return Err(IndexError::corruption(format!(
                "node buffer is {} bytes, layout needs {}",
                buf.len(),
                layout.node_len()
            )));
        }
        let n = node.len();
        if n > layout.max_keys() {
            return Err(IndexError::corruption(format!(
                "node {} holds {n} keys, limit is {}",
                node.offset(),
                layout.max_keys()
            )));
        }
        let expected_children = if node.is_leaf() { 0 } else { n + 1 };
        if node.children().len() != expected_children {
            return Err(IndexError::corruption(format!(
                "node {} has {} children for {n} keys (leaf={})",
                node.offset(),
                node.children().len(),
                node.is_leaf()
            )));
        }

        buf[0..8].copy_from_slice(&node.offset().to_le_bytes());
        buf[8..12].copy_from_slice(&(n as u32).to_le_bytes());
        buf[12] = u8::from(node.is_leaf());

        let key_len = layout.key_len();
        let padding = KeyRecord::new(K::zero());
        let records = node.keys().iter().chain(std::iter::repeat(&padding));
        for (slot, record) in records.take(layout.max_keys()).enumerate() {
            let start = NODE_PREFIX_LEN + slot * layout.record_len();
            let (key_buf, rest) = buf[start..start + layout.record_len()].split_at_mut(key_len);
            record.key.encode_into(key_buf);
            let frequency = if slot < n { record.frequency } else { 0 };
            rest[..FREQUENCY_LEN].copy_from_slice(&frequency.to_le_bytes());
        }

        let children_start = layout.children_start();
        buf[children_start..].fill(0);
        for (slot, child) in node.children().iter().enumerate() {
            let start = children_start + slot * CHILD_PTR_LEN;
            buf[start..start + CHILD_PTR_LEN].copy_from_slice(&child.to_le_bytes());
        }
        Ok(())
    }

    /// Parses the block read from `offset`.
    pub fn decode<K: FixedKey>(&self, offset: u64, buf: &[u8]) -> Result<Node<K>> {
        let layout = &self.layout;
        if buf.len() != layout.node_len() {
            return Err(IndexError::corruption(format!(
                "node block at {offset} is {} bytes, layout needs {}",
                buf.len(),
                layout.node_len()
            )));
        }
        let stored_offset = read_u64(buf, 0);
        if stored_offset != offset {
            return Err(IndexError::corruption(format!(
                "block at {offset} claims offset {stored_offset}"
            )));
        }
        let n = read_u32(buf, 8) as usize;
        if n > layout.max_keys() {
            return Err(IndexError::corruption(format!(
                "node {offset} claims {n} keys, limit is {}",
                layout.max_keys()
            )));
        }
        let leaf = match buf[12] {
            0 => false,
            1 => true,
            other => {
                return Err(IndexError::corruption(format!(
                    "node {offset} has leaf flag {other}"
                )))
            }
        };

        let key_len = layout.key_len();
        let mut keys = Vec::with_capacity(layout.max_keys());
        for slot in 0..n {
            let start = NODE_PREFIX_LEN + slot * layout.record_len();
            let key = K::decode_from(&buf[start..start + key_len])?;
            let frequency = read_u32(buf, start + key_len);
            keys.push(KeyRecord { key, frequency });
        }

        let mut children = Vec::new();
        if !leaf {
            children.reserve(layout.max_children());
            let children_start = layout.children_start();
            for slot in 0..=n {
                children.push(read_u64(buf, children_start + slot * CHILD_PTR_LEN));
            }
        }
        Ok(Node::from_parts(offset, leaf, keys, children))
    }

    /// Reads and decodes the node at `offset`.
    pub fn read<K: FixedKey>(&self, io: &dyn FileIo, offset: u64) -> Result<Node<K>> {
        let mut buf = vec![0u8; self.layout.node_len()];
        io.read_at(offset, &mut buf)?;
        self.decode(offset, &buf)
    }

    /// Encodes and writes `node` at its own offset.
    pub fn write<K: FixedKey>(&self, io: &dyn FileIo, node: &Node<K>) -> Result<()> {
        let mut buf = vec![0u8; self.layout.node_len()];
        self.encode(node, &mut buf)?;
        io.write_at(node.offset(), &buf)
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}
