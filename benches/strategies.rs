//! Compares the four balancing strategies on keyed churn and on positional
//! cut/reverse/reinsert churn.
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use std::convert::TryInto;

use splitmerge::{Avl, RedBlack, Splay, Treap, Tree};

/// The number of operations per iteration
const NUM_OPS: usize = 4096;

criterion_group!(benches, keyed_churn, positional_churn);
criterion_main!(benches);

fn keyed_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("Keyed insert/erase churn");
    for i in (8..=16).step_by(4) {
        let num_keys = 1u32 << i;
        group.throughput(Throughput::Elements(NUM_OPS.try_into().unwrap()));

        macro_rules! bench_keyed {
            ($name:expr, $strategy:expr) => {
                group.bench_function(BenchmarkId::new($name, num_keys), |b| {
                    let mut rng = StdRng::seed_from_u64(0);
                    let mut tree = Tree::<_, u32, u32>::with_strategy($strategy);
                    for key in 0..num_keys {
                        tree.insert(key.wrapping_mul(0x9e3779b9), key);
                    }
                    let keys: Vec<u32> = (0..NUM_OPS)
                        .map(|_| rng.gen_range(0..num_keys).wrapping_mul(0x9e3779b9))
                        .collect();
                    b.iter(|| {
                        for key in keys.iter() {
                            if tree.erase(key).is_none() {
                                tree.insert(*key, 0);
                            }
                        }
                    });
                });
            };
        }

        bench_keyed!("Avl", Avl);
        bench_keyed!("RedBlack", RedBlack);
        bench_keyed!("Splay", Splay);
        bench_keyed!("Treap", Treap::seed_from_u64(0));
    }
    group.finish();
}

fn positional_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("Positional reverse_range churn");
    for i in (8..=16).step_by(4) {
        let len = 1usize << i;
        group.throughput(Throughput::Elements(NUM_OPS.try_into().unwrap()));

        macro_rules! bench_positional {
            ($name:expr, $strategy:expr) => {
                group.bench_function(BenchmarkId::new($name, len), |b| {
                    let mut rng = StdRng::seed_from_u64(0);
                    let mut tree = Tree::<_, (), usize>::with_strategy($strategy);
                    for value in 0..len {
                        tree.push_back(value);
                    }
                    let ranges: Vec<(usize, usize)> = (0..NUM_OPS)
                        .map(|_| {
                            let l = rng.gen_range(0..len);
                            (l, rng.gen_range(l..len))
                        })
                        .collect();
                    b.iter(|| {
                        for &(l, r) in ranges.iter() {
                            tree.reverse_range(l, r);
                        }
                    });
                });
            };
        }

        bench_positional!("Avl", Avl);
        bench_positional!("RedBlack", RedBlack);
        bench_positional!("Splay", Splay);
        bench_positional!("Treap", Treap::seed_from_u64(0));
    }
    group.finish();
}
