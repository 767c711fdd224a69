//! Disk-resident B-tree keyed by fixed-width keys with occurrence counts.
//!
//! The file starts with a 16-byte [`Header`] followed by equally sized node
//! blocks ([`NodeLayout`]) appended in allocation order. Nodes never move and
//! are never freed, so a node's byte offset is its identity.

mod cache;
mod codec;
mod header;
mod layout;
mod node;
mod stats;
mod tree;
mod verify;

pub use cache::{CacheStats, PageCache};
pub use codec::NodeCodec;
pub use header::{Header, ROOT_OFFSET_RANGE};
pub use layout::{optimal_degree, resolve_degree, NodeLayout, DEFAULT_PAGE_BUDGET, HEADER_LEN};
pub use node::{KeyRecord, Node};
pub use stats::{TreeStats, TreeStatsSnapshot};
pub use tree::{BTree, TreeOptions, TreeReport, DEFAULT_CACHE_SIZE};
pub use verify::VerifyReport;
