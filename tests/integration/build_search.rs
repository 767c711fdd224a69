#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use genebank::btree::{BTree, TreeOptions};
use genebank::cli::{run_build, run_search, BuildConfig, SearchConfig};
use genebank::genebank::extract_kmers;
use genebank::Sequence;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/test0.gbk")
}

fn frequencies(path: &Path, k: i64) -> Result<BTreeMap<Sequence, u32>, Box<dyn std::error::Error>> {
    let mut model = BTreeMap::new();
    for key in extract_kmers(BufReader::new(File::open(path)?), k)? {
        *model.entry(key).or_insert(0) += 1;
    }
    Ok(model)
}

fn build(gbk: &Path, output: &Path, degree: i64, k: i64, cache_size: usize) -> BuildConfig {
    BuildConfig {
        degree,
        gbk_path: gbk.to_path_buf(),
        key_len: k,
        cache_size,
        output: Some(output.to_path_buf()),
        dump: None,
    }
}

#[test]
fn index_holds_every_kmer_with_its_count() -> TestResult {
    let dir = tempdir()?;
    for (degree, k) in [(2, 1), (2, 6), (3, 11), (0, 31)] {
        let output = dir.path().join(format!("index.{degree}.{k}"));
        let report = run_build(&build(&fixture(), &output, degree, k, 0))?;
        let model = frequencies(&fixture(), k)?;
        assert_eq!(report.distinct_keys, model.len() as u64);
        let occurrences: u64 = model.values().map(|f| u64::from(*f)).sum();
        assert_eq!(report.kmers, occurrences);

        let mut tree: BTree<Sequence> = BTree::open(&output, TreeOptions::default())?;
        let stored: Vec<(Sequence, u32)> = tree
            .records()?
            .into_iter()
            .map(|r| (r.key, r.frequency))
            .collect();
        let expected: Vec<(Sequence, u32)> = model.into_iter().collect();
        assert_eq!(stored, expected, "degree {degree}, k {k}");
        assert!(tree.verify()?.success);
    }
    Ok(())
}

#[test]
fn single_base_keys_count_each_base() -> TestResult {
    let dir = tempdir()?;
    let output = dir.path().join("bases");
    run_build(&build(&fixture(), &output, 2, 1, 0))?;
    let mut tree: BTree<Sequence> = BTree::open(&output, TreeOptions::default())?;
    let total: u32 = ["a", "c", "g", "t"]
        .iter()
        .map(|b| tree.search(&b.parse().unwrap()).unwrap().unwrap_or(0))
        .sum();
    let model = frequencies(&fixture(), 1)?;
    let occurrences: u64 = model.values().map(|f| u64::from(*f)).sum();
    assert_eq!(u64::from(total), occurrences);
    Ok(())
}

#[test]
fn default_output_lands_next_to_bank_file() -> TestResult {
    let dir = tempdir()?;
    let gbk = dir.path().join("test0.gbk");
    fs::copy(fixture(), &gbk)?;
    let report = run_build(&BuildConfig {
        degree: 4,
        gbk_path: gbk.clone(),
        key_len: 5,
        cache_size: 16,
        output: None,
        dump: Some(dir.path().join("dump")),
    })?;
    assert_eq!(report.output, dir.path().join("test0.gbk.btree.data.5.4"));
    assert!(report.output.is_file());

    let dump = fs::read_to_string(dir.path().join("dump"))?;
    let expected: String = frequencies(&gbk, 5)?
        .iter()
        .map(|(key, frequency)| format!("{frequency} {key}\n"))
        .collect();
    assert_eq!(dump, expected);
    Ok(())
}

#[test]
fn cache_size_does_not_change_the_index() -> TestResult {
    let dir = tempdir()?;
    let mut images = Vec::new();
    for cache_size in [0, 2, 64, 10_000] {
        let output = dir.path().join(format!("cached.{cache_size}"));
        run_build(&build(&fixture(), &output, 2, 7, cache_size))?;
        images.push(fs::read(&output)?);
    }
    assert!(images.windows(2).all(|w| w[0] == w[1]));
    Ok(())
}

#[test]
fn search_reports_hits_in_query_order() -> TestResult {
    let dir = tempdir()?;
    let index = dir.path().join("index");
    run_build(&build(&fixture(), &index, 3, 4, 0))?;
    let model = frequencies(&fixture(), 4)?;

    let present: Vec<&Sequence> = model.keys().rev().take(5).collect();
    let mut queries = String::new();
    let mut expected = String::new();
    for key in &present {
        queries.push_str(&key.to_string().to_uppercase());
        queries.push('\n');
        expected.push_str(&format!("{key}: {}\n", model[*key]));
    }
    let mut absent = 0;
    for q in ["acga", "cgcg", "tatc"] {
        if !model.contains_key(&q.parse::<Sequence>()?) {
            absent += 1;
            queries.push_str(q);
            queries.push('\n');
        }
    }
    queries.push_str("nnnn\n");
    let query_path = dir.path().join("queries");
    fs::write(&query_path, queries)?;

    let mut out = Vec::new();
    let report = run_search(
        &SearchConfig {
            btree_path: index,
            query_path,
            cache_size: 8,
        },
        &mut out,
    )?;
    assert_eq!(String::from_utf8(out)?, expected);
    assert_eq!(report.hits, present.len() as u64);
    assert_eq!(report.misses, absent as u64);
    assert_eq!(report.skipped, 1);
    Ok(())
}
