//! Micro benchmarks for the on-disk k-mer B-tree.
#![forbid(unsafe_code)]
#![allow(missing_docs)]

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use genebank::btree::{BTree, TreeOptions};
use genebank::Sequence;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

const INSERT_COUNT: u64 = 16_384;
const LOOKUP_SAMPLES: usize = 4_096;
const KEY_LEN: usize = 12;

fn micro_btree(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/btree");
    group.sample_size(20);

    let keys = random_keys(INSERT_COUNT as usize, 0xBEEF_F00D);
    for (degree, cache_size) in [(2, 0), (16, 0), (16, 256), (0, 256)] {
        group.throughput(Throughput::Elements(INSERT_COUNT));
        group.bench_function(
            BenchmarkId::new("random_insert", format!("d{degree}_c{cache_size}")),
            |b| {
                b.iter_batched(
                    || FreshTree::new(degree, cache_size),
                    |mut tree| {
                        tree.insert_keys(&keys);
                        black_box(tree.tree.node_count());
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    for cache_size in [0, 1024] {
        let mut loaded = LoadedTree::new(&keys, cache_size);
        group.throughput(Throughput::Elements(LOOKUP_SAMPLES as u64));
        group.bench_function(BenchmarkId::new("point_lookup", cache_size), |b| {
            b.iter(|| loaded.point_lookup(LOOKUP_SAMPLES));
        });
    }

    group.finish();
}

fn random_keys(count: usize, seed: u64) -> Vec<Sequence> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| random_sequence(&mut rng)).collect()
}

fn random_sequence(rng: &mut ChaCha8Rng) -> Sequence {
    let bases: Vec<u8> = (0..KEY_LEN).map(|_| b"acgt"[rng.gen_range(0..4)]).collect();
    Sequence::from_bases(&bases).expect("valid bases")
}

struct FreshTree {
    _tmpdir: TempDir,
    tree: BTree<Sequence>,
}

impl FreshTree {
    fn new(degree: u32, cache_size: usize) -> Self {
        let tmpdir = tempfile::tempdir().expect("tmpdir");
        let path = tmpdir.path().join("bench.btree");
        let tree = BTree::create(&path, TreeOptions::new(degree, cache_size)).expect("tree");
        Self {
            _tmpdir: tmpdir,
            tree,
        }
    }

    fn insert_keys(&mut self, keys: &[Sequence]) {
        for key in keys {
            self.tree.insert(*key).expect("insert");
        }
    }
}

struct LoadedTree {
    fresh: FreshTree,
    keys: Vec<Sequence>,
    rng: ChaCha8Rng,
}

impl LoadedTree {
    fn new(keys: &[Sequence], cache_size: usize) -> Self {
        let mut fresh = FreshTree::new(16, cache_size);
        fresh.insert_keys(keys);
        Self {
            fresh,
            keys: keys.to_vec(),
            rng: ChaCha8Rng::seed_from_u64(0xFEED_FACE),
        }
    }

    fn point_lookup(&mut self, samples: usize) {
        for _ in 0..samples {
            // half hits, half random probes that are almost always misses
            let key = if self.rng.gen_bool(0.5) {
                self.keys[self.rng.gen_range(0..self.keys.len())]
            } else {
                random_sequence(&mut self.rng)
            };
            black_box(self.fresh.tree.search(&key).expect("search"));
        }
    }
}

criterion_group!(benches, micro_btree);
criterion_main!(benches);
