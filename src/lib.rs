//! Genebank: a disk-resident B-tree index of DNA k-mer frequencies.
//!
//! Keys are fixed-width packed sequences pulled out of GenBank flat files.
//! Each distinct key is stored once, together with the number of times it
//! was seen. Nodes live in a single append-only file and are addressed by
//! their byte offset; a bounded LRU cache keeps hot nodes hydrated.

#![warn(missing_docs)]

pub mod btree;
pub mod cli;
pub mod error;
pub mod genebank;
pub mod key;
pub mod primitives;

pub use btree::{BTree, TreeOptions};
pub use error::{IndexError, Result};
pub use key::{FixedKey, Sequence};
