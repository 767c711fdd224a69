//! Read-only views of an existing index.

use std::io::Write;
use std::path::Path;

use super::{require_file, CliError};
use crate::btree::{BTree, TreeOptions, TreeReport, VerifyReport};
use crate::key::Sequence;

fn open(path: &Path) -> Result<BTree<Sequence>, CliError> {
    require_file(path)?;
    Ok(BTree::open_read_only(path, TreeOptions::default())?)
}

/// Writes the in-order `<frequency> <key>` listing, or the node shape.
pub fn run_dump<W: Write>(path: &Path, shape: bool, out: &mut W) -> Result<(), CliError> {
    let mut tree = open(path)?;
    if shape {
        tree.dump_shape(out)?;
    } else {
        tree.dump(out)?;
    }
    Ok(())
}

/// Collects a [`TreeReport`].
pub fn run_stats(path: &Path) -> Result<TreeReport, CliError> {
    Ok(open(path)?.report()?)
}

/// Checks the structural invariants of the index.
pub fn run_verify(path: &Path) -> Result<VerifyReport, CliError> {
    Ok(open(path)?.verify()?)
}
