#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;

use genebank::btree::{BTree, Header, TreeOptions, HEADER_LEN};
use genebank::{IndexError, Sequence};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

fn random_sequence(rng: &mut ChaCha8Rng, len: usize) -> Sequence {
    let bases: Vec<u8> = (0..len).map(|_| b"acgt"[rng.gen_range(0..4)]).collect();
    Sequence::from_bases(&bases).expect("generated bases are valid")
}

#[test]
fn sequences_survive_close_and_reopen() -> Result<(), IndexError> {
    let dir = tempdir()?;
    let path = dir.path().join("kmers.btree");
    let mut rng = ChaCha8Rng::seed_from_u64(0x6E6E);
    let mut model: BTreeMap<Sequence, u32> = BTreeMap::new();

    let mut tree = BTree::create(&path, TreeOptions::new(3, 32))?;
    for _ in 0..4_000 {
        // short keys so repeats are common
        let key = random_sequence(&mut rng, 6);
        *model.entry(key).or_insert(0) += 1;
        tree.insert(key)?;
    }
    let node_count = tree.node_count();
    let node_len = tree.layout().node_len() as u64;
    tree.close()?;

    assert_eq!(
        fs::metadata(&path)?.len(),
        HEADER_LEN + u64::from(node_count) * node_len
    );

    let mut tree: BTree<Sequence> = BTree::open(&path, TreeOptions::new(0, 0))?;
    for (key, frequency) in &model {
        assert_eq!(tree.search(key)?, Some(*frequency), "key {key}");
    }
    for _ in 0..200 {
        let probe = random_sequence(&mut rng, 7);
        assert_eq!(tree.search(&probe)?, None);
    }
    let report = tree.verify()?;
    assert!(report.success, "findings: {:?}", report.findings);
    assert_eq!(report.distinct_keys, model.len() as u64);
    Ok(())
}

#[test]
fn header_tracks_root_after_growth() -> Result<(), IndexError> {
    let dir = tempdir()?;
    let path = dir.path().join("header.btree");
    let mut tree = BTree::create(&path, TreeOptions::new(2, 0))?;
    let first_root = tree.root_offset();
    assert_eq!(first_root, HEADER_LEN);
    for key in 0u64..64 {
        tree.insert(key)?;
    }
    let root = tree.root_offset();
    assert_ne!(root, first_root);
    tree.flush()?;

    let header = Header::decode(&fs::read(&path)?)?;
    assert_eq!(header.degree, 2);
    assert_eq!(header.root_offset, root);
    assert_eq!(header.node_count, tree.node_count());
    Ok(())
}

#[test]
fn dropping_without_close_keeps_previous_header() -> Result<(), IndexError> {
    let dir = tempdir()?;
    let path = dir.path().join("dropped.btree");
    let mut tree = BTree::create(&path, TreeOptions::new(2, 0))?;
    tree.insert(1u64)?;
    tree.close()?;
    let before = fs::read(&path)?[..16].to_vec();

    let mut tree: BTree<u64> = BTree::open(&path, TreeOptions::default())?;
    for key in 2..50 {
        tree.insert(key)?;
    }
    drop(tree);
    assert_eq!(&fs::read(&path)?[..16], before.as_slice());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn reopened_tree_answers_like_the_original(
        keys in prop::collection::vec("[acgt]{1,8}", 1..200),
        degree in 2u32..8,
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prop.btree");
        let mut model: BTreeMap<Sequence, u32> = BTreeMap::new();
        let mut tree = BTree::create(&path, TreeOptions::new(degree, 4)).unwrap();
        for literal in &keys {
            let key: Sequence = literal.parse().unwrap();
            *model.entry(key).or_insert(0) += 1;
            tree.insert(key).unwrap();
        }
        tree.close().unwrap();

        let mut tree: BTree<Sequence> = BTree::open(&path, TreeOptions::default()).unwrap();
        let stored: Vec<(Sequence, u32)> = tree
            .records()
            .unwrap()
            .into_iter()
            .map(|r| (r.key, r.frequency))
            .collect();
        let expected: Vec<(Sequence, u32)> = model.into_iter().collect();
        prop_assert_eq!(stored, expected);
    }
}
