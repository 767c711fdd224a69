use serde::Serialize;

use crate::error::{IndexError, Result};
use crate::key::FixedKey;

/// Bytes reserved at the start of the file for the header.
pub const HEADER_LEN: u64 = 16;

/// Page budget used to pick a degree when none is requested.
pub const DEFAULT_PAGE_BUDGET: usize = 4096;

/// offset (8) + key count (4) + leaf flag (1)
pub(crate) const NODE_PREFIX_LEN: usize = 13;
pub(crate) const CHILD_PTR_LEN: usize = 8;
pub(crate) const FREQUENCY_LEN: usize = 4;

/// Fixed geometry of every node block in one index file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NodeLayout {
    degree: usize,
    key_len: usize,
    node_len: usize,
}

impl NodeLayout {
    /// Computes the layout for `degree` and an encoded key of `key_len` bytes.
    pub fn new(degree: u32, key_len: usize) -> Result<Self> {
        if degree == 0 {
            return Err(IndexError::InvalidDegree(0));
        }
        let invalid = || IndexError::InvalidDegree(i64::from(degree));
        let d = degree as usize;
        let max_keys = d
            .checked_mul(2)
            .and_then(|v| v.checked_sub(1))
            .ok_or_else(invalid)?;
        u32::try_from(max_keys).map_err(|_| invalid())?;
        let record_len = key_len.checked_add(FREQUENCY_LEN).ok_or_else(invalid)?;
        let node_len = max_keys
            .checked_mul(record_len)
            .and_then(|records| {
                d.checked_mul(2)
                    .and_then(|children| children.checked_mul(CHILD_PTR_LEN))
                    .and_then(|children| records.checked_add(children))
            })
            .and_then(|body| body.checked_add(NODE_PREFIX_LEN))
            .ok_or_else(invalid)?;
        if u32::try_from(node_len).is_err() {
            return Err(invalid());
        }
        Ok(Self {
            degree: d,
            key_len,
            node_len,
        })
    }

    /// Layout for keys of type `K`.
    pub fn for_key<K: FixedKey>(degree: u32) -> Result<Self> {
        Self::new(degree, K::ENCODED_LEN)
    }

    /// Minimum degree `d`.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Encoded key length in bytes.
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Maximum keys per node (`2d - 1`).
    pub fn max_keys(&self) -> usize {
        2 * self.degree - 1
    }

    /// Minimum keys in any non-root node (`d - 1`).
    pub fn min_keys(&self) -> usize {
        self.degree - 1
    }

    /// Child pointer slots per node (`2d`).
    pub fn max_children(&self) -> usize {
        2 * self.degree
    }

    /// Bytes per key record: encoded key followed by the frequency.
    pub fn record_len(&self) -> usize {
        self.key_len + FREQUENCY_LEN
    }

    /// Total bytes of one node block.
    pub fn node_len(&self) -> usize {
        self.node_len
    }

    /// Byte position of the first child pointer inside a block.
    pub(crate) fn children_start(&self) -> usize {
        NODE_PREFIX_LEN + self.max_keys() * self.record_len()
    }

    /// File offset of the node allocated `index`-th.
    pub fn offset_for(&self, index: u32) -> Result<u64> {
        (self.node_len as u64)
            .checked_mul(u64::from(index))
            .and_then(|body| body.checked_add(HEADER_LEN))
            .ok_or_else(|| IndexError::corruption("node offset overflow"))
    }

    /// Allocation index of the block at `offset`, if `offset` is a block boundary.
    pub fn index_of(&self, offset: u64) -> Option<u64> {
        let rel = offset.checked_sub(HEADER_LEN)?;
        let len = self.node_len as u64;
        (rel % len == 0).then_some(rel / len)
    }
}

/// Largest degree whose node block fits in `page_budget` bytes.
///
/// Never returns less than 1.
pub fn optimal_degree(key_len: usize, page_budget: usize) -> u32 {
    // node_len(d) = 13 + (2d - 1) * r + 16d = (13 - r) + d * (2r + 16)
    let record_len = key_len + FREQUENCY_LEN;
    let per_degree = 2 * record_len + 2 * CHILD_PTR_LEN;
    let budget = (page_budget + record_len).saturating_sub(NODE_PREFIX_LEN);
    u32::try_from(budget / per_degree)
        .unwrap_or(u32::MAX)
        .max(1)
}

/// Turns a user-supplied degree into a usable one.
///
/// Negative values are rejected; 0 selects [`optimal_degree`] for a 4 KiB page.
pub fn resolve_degree(raw: i64, key_len: usize) -> Result<u32> {
    match raw {
        0 => Ok(optimal_degree(key_len, DEFAULT_PAGE_BUDGET)),
        r if r < 0 => Err(IndexError::InvalidDegree(r)),
        r => u32::try_from(r).map_err(|_| IndexError::InvalidDegree(r)),
    }
}
