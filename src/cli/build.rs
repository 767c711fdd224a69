use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use super::{require_file, CliError};
use crate::btree::{resolve_degree, BTree, TreeOptions};
use crate::genebank::{KmerExtractor, ScanStats};
use crate::key::{FixedKey, Sequence};

const PROGRESS_INTERVAL: u64 = 1 << 16;

/// Configuration for building an index from a GenBank file.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Requested degree; 0 picks the page-sized optimum.
    pub degree: i64,
    /// GenBank flat file to scan.
    pub gbk_path: PathBuf,
    /// Bases per key.
    pub key_len: i64,
    /// Nodes kept in the LRU cache; 0 or 1 disables it.
    pub cache_size: usize,
    /// Index file to write. Defaults to [`default_output_path`].
    pub output: Option<PathBuf>,
    /// Optional text dump of `<frequency> <key>` lines.
    pub dump: Option<PathBuf>,
}

/// Summary of a finished build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Index file written.
    pub output: PathBuf,
    /// Dump file written, if requested.
    pub dump: Option<PathBuf>,
    /// Degree actually used.
    pub degree: u32,
    /// Bases per key.
    pub key_len: usize,
    /// Keys inserted, counting repeats.
    pub kmers: u64,
    /// Distinct keys stored.
    pub distinct_keys: u64,
    /// Nodes allocated.
    pub node_count: u32,
    /// Tree height.
    pub height: usize,
    /// Bank file counters.
    pub scan: ScanStats,
    /// Wall time in milliseconds.
    pub elapsed_ms: u64,
}

/// `<gbk>.btree.data.<k>.<degree>`, next to the bank file.
pub fn default_output_path(gbk_path: &Path, key_len: usize, degree: u32) -> PathBuf {
    let mut name = gbk_path.as_os_str().to_owned();
    name.push(format!(".btree.data.{key_len}.{degree}"));
    PathBuf::from(name)
}

/// Builds an index; see [`run_build_with_progress`].
pub fn run_build(cfg: &BuildConfig) -> Result<BuildReport, CliError> {
    run_build_with_progress(cfg, |_| {})
}

/// Scans `cfg.gbk_path` and inserts every k-mer into a fresh index.
///
/// Degree and key length are validated before any file is touched.
/// `progress` receives the running key count periodically.
pub fn run_build_with_progress<P>(
    cfg: &BuildConfig,
    mut progress: P,
) -> Result<BuildReport, CliError>
where
    P: FnMut(u64),
{
    let started = Instant::now();
    let degree = resolve_degree(cfg.degree, Sequence::ENCODED_LEN)?;
    let mut extractor = KmerExtractor::new(cfg.key_len)?;
    let key_len = extractor.k();
    require_file(&cfg.gbk_path)?;

    let reader = BufReader::new(File::open(&cfg.gbk_path)?);
    let output = cfg
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cfg.gbk_path, key_len, degree));
    info!(
        gbk = %cfg.gbk_path.display(),
        output = %output.display(),
        degree,
        key_len,
        cache_size = cfg.cache_size,
        "build.start"
    );

    let options = TreeOptions::new(degree, cfg.cache_size);
    let mut tree: BTree<Sequence> = BTree::create(&output, options)?;
    let mut inserted = 0u64;
    let scan = extractor.scan(reader, |key| {
        tree.insert(key)?;
        inserted += 1;
        if inserted % PROGRESS_INTERVAL == 0 {
            progress(inserted);
        }
        Ok(())
    })?;

    if let Some(dump) = &cfg.dump {
        let mut out = BufWriter::new(File::create(dump)?);
        tree.dump(&mut out)?;
        out.flush()?;
    }
    let summary = tree.report()?;
    tree.close()?;

    let report = BuildReport {
        output,
        dump: cfg.dump.clone(),
        degree,
        key_len,
        kmers: scan.kmers,
        distinct_keys: summary.distinct_keys,
        node_count: summary.node_count,
        height: summary.height,
        scan,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        output = %report.output.display(),
        kmers = report.kmers,
        distinct = report.distinct_keys,
        nodes = report.node_count,
        elapsed_ms = report.elapsed_ms,
        "build.complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: &Path, degree: i64, key_len: i64) -> BuildConfig {
        BuildConfig {
            degree,
            gbk_path: dir.join("test0.gbk"),
            key_len,
            cache_size: 0,
            output: None,
            dump: None,
        }
    }

    #[test]
    fn default_output_appends_length_and_degree() {
        assert_eq!(
            default_output_path(Path::new("data/test0.gbk"), 6, 2),
            PathBuf::from("data/test0.gbk.btree.data.6.2")
        );
    }

    #[test]
    fn validates_degree_then_key_length_before_reading() {
        let dir = tempdir().unwrap();
        let err = run_build(&config(dir.path(), -1, 40)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let err = run_build(&config(dir.path(), 2, 0)).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        let err = run_build(&config(dir.path(), 2, 3)).unwrap_err();
        assert_eq!(err.exit_code(), 404);
    }

    #[test]
    fn builds_index_next_to_bank_file() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), 2, 3);
        std::fs::write(&cfg.gbk_path, "LOCUS x\nORIGIN\n  1 acgtn acg\n//\n").unwrap();
        let report = run_build(&cfg).unwrap();
        assert_eq!(report.output, dir.path().join("test0.gbk.btree.data.3.2"));
        assert!(report.output.is_file());
        assert_eq!(report.kmers, 3);
        assert_eq!(report.distinct_keys, 2);

        let mut tree: BTree<Sequence> =
            BTree::open(&report.output, TreeOptions::default()).unwrap();
        assert_eq!(tree.search(&"acg".parse().unwrap()).unwrap(), Some(2));
        assert_eq!(tree.search(&"cgt".parse().unwrap()).unwrap(), Some(1));
    }
}
