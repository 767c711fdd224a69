use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use super::{require_file, CliError};
use crate::btree::{BTree, CacheStats, TreeOptions};
use crate::genebank::read_queries;
use crate::key::Sequence;

/// Configuration for querying an index.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Index file built by `create`.
    pub btree_path: PathBuf,
    /// One sequence per line.
    pub query_path: PathBuf,
    /// Nodes kept in the LRU cache; 0 or 1 disables it.
    pub cache_size: usize,
}

/// Summary of a search run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Non-blank query lines read.
    pub queries: u64,
    /// Queries found in the index.
    pub hits: u64,
    /// Queries absent from the index.
    pub misses: u64,
    /// Lines that are not valid sequences.
    pub skipped: u64,
    /// Page cache counters at the end of the run.
    pub cache: CacheStats,
    /// Wall time in milliseconds.
    pub elapsed_ms: u64,
}

/// A query found in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Canonical lowercase key.
    pub key: String,
    /// Occurrences recorded at build time.
    pub frequency: u32,
}

/// Looks up every query and writes `<key>: <frequency>` for each hit.
///
/// Misses produce no output. Lines that do not parse as a sequence are
/// logged and skipped.
pub fn run_search<W: Write>(cfg: &SearchConfig, out: &mut W) -> Result<SearchReport, CliError> {
    run_search_with(cfg, |hit| {
        writeln!(out, "{}: {}", hit.key, hit.frequency)?;
        Ok(())
    })
}

/// Looks up every query in order, handing each hit to `on_hit`.
///
/// The index is opened read-only and is never written.
pub fn run_search_with<F>(cfg: &SearchConfig, mut on_hit: F) -> Result<SearchReport, CliError>
where
    F: FnMut(SearchHit) -> Result<(), CliError>,
{
    let started = Instant::now();
    require_file(&cfg.btree_path)?;
    require_file(&cfg.query_path)?;

    let queries = read_queries(BufReader::new(File::open(&cfg.query_path)?))?;
    let mut tree: BTree<Sequence> =
        BTree::open_read_only(&cfg.btree_path, TreeOptions::new(0, cfg.cache_size))?;
    info!(
        btree = %cfg.btree_path.display(),
        queries = queries.len(),
        cache_size = cfg.cache_size,
        "search.start"
    );

    let mut report = SearchReport {
        queries: queries.len() as u64,
        hits: 0,
        misses: 0,
        skipped: 0,
        cache: CacheStats::default(),
        elapsed_ms: 0,
    };
    for (line, query) in queries.iter().enumerate() {
        let key: Sequence = match query.parse() {
            Ok(key) => key,
            Err(err) => {
                warn!(line = line + 1, query = %query, error = %err, "search.skip_query");
                report.skipped += 1;
                continue;
            }
        };
        match tree.search(&key)? {
            Some(frequency) => {
                on_hit(SearchHit {
                    key: key.to_string(),
                    frequency,
                })?;
                report.hits += 1;
            }
            None => report.misses += 1,
        }
    }
    report.cache = tree.cache_stats();
    tree.close()?;
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        hits = report.hits,
        misses = report.misses,
        skipped = report.skipped,
        elapsed_ms = report.elapsed_ms,
        "search.complete"
    );
    Ok(report)
}
