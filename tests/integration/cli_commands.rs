#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use genebank::genebank::extract_kmers;
use genebank::Sequence;
use serde_json::Value;
use tempfile::TempDir;

/// Shells see the low byte of the exit status.
const NOT_FOUND_STATUS: i32 = if cfg!(windows) { 404 } else { 404 & 0xff };

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/test0.gbk")
}

fn genebank(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("genebank");
    cmd.env("GENEBANK_CONFIG", dir.path().join("no-config.toml"))
        .env_remove("RUST_LOG")
        .current_dir(dir.path());
    cmd
}

fn build_index(dir: &TempDir, degree: &str, length: &str) -> PathBuf {
    let output = dir.path().join(format!("index.{degree}.{length}"));
    genebank(dir)
        .args(["--quiet", "create", degree])
        .arg(fixture())
        .arg(length)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
    output
}

fn model(k: i64) -> BTreeMap<Sequence, u32> {
    let file = File::open(fixture()).expect("fixture");
    let mut counts = BTreeMap::new();
    for key in extract_kmers(BufReader::new(file), k).expect("scan fixture") {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[test]
fn create_then_search_prints_frequencies() {
    let dir = TempDir::new().expect("tempdir");
    let index = build_index(&dir, "2", "3");
    let counts = model(3);

    let queries: Vec<&Sequence> = counts.keys().take(4).collect();
    let mut query_text: String = queries.iter().map(|k| format!("{k}\n")).collect();
    query_text.push_str("nnn\n");
    let query_path = dir.path().join("queries.txt");
    fs::write(&query_path, query_text).expect("write queries");

    let expected: String = queries
        .iter()
        .map(|k| format!("{k}: {}\n", counts[*k]))
        .collect();
    genebank(&dir)
        .arg("search")
        .arg(&index)
        .arg(&query_path)
        .args(["--cache-size", "16"])
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn create_uses_default_output_name_and_dump() {
    let dir = TempDir::new().expect("tempdir");
    let gbk = dir.path().join("test0.gbk");
    fs::copy(fixture(), &gbk).expect("copy fixture");
    genebank(&dir)
        .args(["--quiet", "create", "2"])
        .arg(&gbk)
        .args(["6", "--dump"])
        .assert()
        .success();
    assert!(dir.path().join("test0.gbk.btree.data.6.2").is_file());

    let dump = fs::read_to_string(dir.path().join("dump")).expect("dump written");
    let expected: String = model(6)
        .iter()
        .map(|(key, frequency)| format!("{frequency} {key}\n"))
        .collect();
    assert_eq!(dump, expected);
}

#[test]
fn invalid_degree_exits_with_3() {
    let dir = TempDir::new().expect("tempdir");
    genebank(&dir)
        .args(["create", "-1"])
        .arg(fixture())
        .arg("4")
        .assert()
        .code(3);
}

#[test]
fn invalid_key_length_exits_with_4() {
    let dir = TempDir::new().expect("tempdir");
    for length in ["0", "32"] {
        genebank(&dir)
            .args(["create", "2"])
            .arg(fixture())
            .arg(length)
            .assert()
            .code(4);
    }
}

#[test]
fn missing_inputs_exit_with_not_found() {
    let dir = TempDir::new().expect("tempdir");
    genebank(&dir)
        .args(["create", "2", "absent.gbk", "4"])
        .assert()
        .code(NOT_FOUND_STATUS);
    genebank(&dir)
        .args(["search", "absent.btree", "absent.txt"])
        .assert()
        .code(NOT_FOUND_STATUS);
}

#[test]
fn bad_invocation_exits_with_1_and_help_with_0() {
    let dir = TempDir::new().expect("tempdir");
    genebank(&dir).args(["create", "2"]).assert().code(1);
    genebank(&dir)
        .args(["create", "two", "x.gbk", "4"])
        .assert()
        .code(1);
    genebank(&dir).arg("--help").assert().success();
    genebank(&dir).arg("--version").assert().success();
}

#[test]
fn stats_and_verify_emit_json() {
    let dir = TempDir::new().expect("tempdir");
    let index = build_index(&dir, "3", "5");

    let output = genebank(&dir)
        .args(["--format", "json", "stats"])
        .arg(&index)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["degree"], 3);
    assert_eq!(json["distinct_keys"], model(5).len() as u64);

    let output = genebank(&dir)
        .args(["--format", "json", "verify"])
        .arg(&index)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["success"], true);
    assert!(json["findings"].as_array().is_some_and(|f| f.is_empty()));
}

#[test]
fn dump_lists_keys_and_shape() {
    let dir = TempDir::new().expect("tempdir");
    let index = build_index(&dir, "2", "2");
    let expected: String = model(2)
        .iter()
        .map(|(key, frequency)| format!("{frequency} {key}\n"))
        .collect();
    genebank(&dir)
        .arg("dump")
        .arg(&index)
        .assert()
        .success()
        .stdout(expected);

    let shape = genebank(&dir)
        .args(["dump", "--shape"])
        .arg(&index)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let shape = String::from_utf8(shape).expect("utf8");
    assert!(shape.starts_with("degree=2 "));
    assert!(shape.contains("(root)"));
}

#[test]
fn config_file_sets_default_format() {
    let dir = TempDir::new().expect("tempdir");
    let index = build_index(&dir, "2", "4");
    let config = dir.path().join("cli.toml");
    fs::write(&config, "[defaults]\nformat = \"json\"\ncache_size = 8\n").expect("config");

    let output = genebank(&dir)
        .env("GENEBANK_CONFIG", &config)
        .arg("stats")
        .arg(&index)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["degree"], 2);
}

#[test]
fn corrupted_index_fails_verify() {
    let dir = TempDir::new().expect("tempdir");
    let index = build_index(&dir, "2", "4");
    let mut bytes = fs::read(&index).expect("read index");
    // first node block: overwrite its self offset
    bytes[16..24].copy_from_slice(&u64::MAX.to_le_bytes());
    fs::write(&index, bytes).expect("write index");

    genebank(&dir).arg("verify").arg(&index).assert().code(2);
}

#[test]
fn json_search_lists_hits_without_touching_the_index() {
    let dir = TempDir::new().expect("tempdir");
    let index = build_index(&dir, "3", "4");
    let counts = model(4);
    let (key, frequency) = counts.iter().next_back().expect("fixture has 4-mers");
    let query_path = dir.path().join("queries.txt");
    fs::write(&query_path, format!("{key}\nzzzz\n")).expect("write queries");
    let before = fs::read(&index).expect("read index");

    let output = genebank(&dir)
        .args(["--format", "json", "search"])
        .arg(&index)
        .arg(&query_path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["hits"][0]["key"], key.to_string());
    assert_eq!(json["hits"][0]["frequency"], *frequency);
    assert_eq!(json["report"]["hits"], 1);
    assert_eq!(json["report"]["skipped"], 1);
    assert_eq!(fs::read(&index).expect("read index"), before);
}
