use std::ops::Range;

use super::layout::{NodeLayout, HEADER_LEN};
use crate::error::{IndexError, Result};

/// Bytes of the header rewritten with the current root on close.
pub const ROOT_OFFSET_RANGE: Range<usize> = 4..12;

/// The 16-byte file header.
///
/// Layout (little-endian): degree `u32` at `[0, 4)`, root offset `u64` at
/// `[4, 12)`, node count `u32` at `[12, 16)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Minimum degree of the tree.
    pub degree: u32,
    /// Offset of the current root node.
    pub root_offset: u64,
    /// Number of node blocks ever allocated.
    pub node_count: u32,
}

impl Header {
    /// Encoded size in bytes.
    pub const LEN: usize = HEADER_LEN as usize;

    /// Header of a freshly created file: the root will be the first block.
    pub fn new(degree: u32) -> Self {
        Self {
            degree,
            root_offset: HEADER_LEN,
            node_count: 0,
        }
    }

    /// Serializes the header.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.degree.to_le_bytes());
        buf[ROOT_OFFSET_RANGE].copy_from_slice(&self.root_offset.to_le_bytes());
        buf[12..16].copy_from_slice(&self.node_count.to_le_bytes());
        buf
    }

    /// Parses a header, rejecting a zero degree.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LEN {
            return Err(IndexError::corruption("header shorter than 16 bytes"));
        }
        let degree = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let mut root = [0u8; 8];
        root.copy_from_slice(&data[ROOT_OFFSET_RANGE]);
        let node_count = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
        if degree == 0 {
            return Err(IndexError::corruption("header records degree 0"));
        }
        Ok(Self {
            degree,
            root_offset: u64::from_le_bytes(root),
            node_count,
        })
    }

    /// Checks the header against the node layout and the file length.
    pub fn validate(&self, layout: &NodeLayout, file_len: u64) -> Result<()> {
        if self.node_count == 0 {
            return Err(IndexError::corruption("header records no nodes"));
        }
        let end = layout.offset_for(self.node_count)?;
        if file_len < end {
            return Err(IndexError::corruption(format!(
                "file holds {file_len} bytes but {} nodes need {end}",
                self.node_count
            )));
        }
        match layout.index_of(self.root_offset) {
            Some(index) if index < u64::from(self.node_count) => Ok(()),
            _ => Err(IndexError::corruption(format!(
                "root offset {} is not an allocated node",
                self.root_offset
            ))),
        }
    }
}
