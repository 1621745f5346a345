use quickcheck_macros::quickcheck;
use rand::prelude::*;
use std::collections::BTreeMap;

use super::*;

/// Construct a strategy value for a test. Only the treap uses the seed.
trait TestStrategy: Strategy {
    fn seeded(seed: u64) -> Self;
}

impl TestStrategy for Avl {
    fn seeded(_: u64) -> Self {
        Avl
    }
}

impl TestStrategy for RedBlack {
    fn seeded(_: u64) -> Self {
        RedBlack
    }
}

impl TestStrategy for Splay {
    fn seeded(_: u64) -> Self {
        Splay
    }
}

impl TestStrategy for Treap {
    fn seeded(seed: u64) -> Self {
        Treap::seed_from_u64(seed)
    }
}

fn values<S: Strategy, K, V: Clone>(tree: &mut Tree<S, K, V>) -> Vec<V> {
    tree.iter().map(|(_, v)| v.clone()).collect()
}

fn seq_from<S: TestStrategy>(values: &[i32]) -> Tree<S, (), i32> {
    let mut tree = Tree::with_strategy(S::seeded(0));
    for &value in values {
        let len = tree.len();
        tree.insert_kth(len, value);
    }
    tree
}

macro_rules! gen_strategy_test {
    ($modname:ident, $ty:ty) => {
        mod $modname {
            use super::*;

            #[test]
            fn keyed_simple() {
                keyed::simple::<$ty>();
            }

            #[test]
            fn keyed_neighbors() {
                keyed::neighbors::<$ty>();
            }

            #[test]
            fn keyed_split_merge_round_trip() {
                keyed::split_merge_round_trip::<$ty>();
            }

            #[test]
            fn keyed_big() {
                keyed::big::<$ty>();
            }

            #[test]
            fn implicit_simple() {
                implicit::simple::<$ty>();
            }

            #[test]
            fn implicit_cut() {
                implicit::cut::<$ty>();
            }

            #[test]
            fn implicit_cut_round_trip() {
                implicit::cut_round_trip::<$ty>();
            }

            #[test]
            fn implicit_big() {
                implicit::big::<$ty>();
            }

            #[test]
            #[should_panic]
            fn implicit_insert_out_of_range() {
                let mut tree = seq_from::<$ty>(&[1, 2, 3]);
                tree.insert_kth(4, 0);
            }

            #[test]
            #[should_panic]
            fn implicit_cut_out_of_range() {
                let mut tree = seq_from::<$ty>(&[1, 2, 3]);
                let _ = tree.cut_subsegment(1, 3);
            }

            #[test]
            #[should_panic(expected = "belongs to another forest")]
            fn implicit_foreign_segment() {
                let mut source = seq_from::<$ty>(&[0, 1, 2, 3, 4, 5, 6, 7]);
                let mut target = seq_from::<$ty>(&[100, 101, 102, 103, 104, 105, 106, 107]);
                let segment = source.cut_subsegment(2, 3);
                target.insert_subsegment(0, segment);
            }

            #[test]
            #[should_panic(expected = "belongs to another forest")]
            fn implicit_foreign_append() {
                let mut source = seq_from::<$ty>(&[0, 1, 2, 3]);
                let mut target = seq_from::<$ty>(&[100, 101]);
                let tail = source.split_off_kth(1);
                target.append(tail);
            }

            #[test]
            fn reverse_simple() {
                reverse::simple::<$ty>();
            }

            #[test]
            fn reverse_big() {
                reverse::big::<$ty>();
            }
        }
    };
}

gen_strategy_test!(avl, Avl);
gen_strategy_test!(rbtree, RedBlack);
gen_strategy_test!(splay, Splay);
gen_strategy_test!(treap, Treap);

mod keyed {
    use super::*;

    pub(super) fn simple<S: TestStrategy>() {
        let mut tree = Tree::<S, i32, i32>::with_strategy(S::seeded(0));
        for key in [6, -1, 0, 1, 3, 10, 15] {
            assert!(tree.insert(key, 0));
        }
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.get_min(), Some((&-1, &0)));

        assert_eq!(tree.erase(&-1), Some((-1, 0)));
        assert_eq!(tree.get_min(), Some((&0, &0)));
        assert_eq!(tree.erase(&-1), None);
        assert_eq!(tree.len(), 6);
        tree.validate_ordered().unwrap();
    }

    pub(super) fn neighbors<S: TestStrategy>() {
        let mut tree = Tree::<S, i32, &str>::with_strategy(S::seeded(1));
        assert_eq!(tree.get_min(), None);
        assert_eq!(tree.next(&0), None);
        assert_eq!(tree.order_of_key(&0), 0);

        tree.extend([(10, "ten"), (20, "twenty"), (30, "thirty")]);
        assert!(!tree.insert(20, "again"));
        assert_eq!(tree.find(&20), Some((&20, &"twenty")));

        assert_eq!(tree.next(&10), Some((&20, &"twenty")));
        assert_eq!(tree.next(&15), Some((&20, &"twenty")));
        assert_eq!(tree.next(&30), None);
        assert_eq!(tree.prev(&20), Some((&10, &"ten")));
        assert_eq!(tree.prev(&10), None);
        assert_eq!(tree.prev(&100), Some((&30, &"thirty")));

        assert_eq!(tree.order_of_key(&5), 0);
        assert_eq!(tree.order_of_key(&20), 1);
        assert_eq!(tree.order_of_key(&25), 2);
        assert_eq!(tree.order_of_key(&99), 3);

        assert!(tree.exists(&30));
        assert!(!tree.exists(&31));
        assert_eq!(tree.get_kth(2), Some((&30, &"thirty")));
        assert_eq!(tree.get_kth(3), None);

        *tree.find_mut(&30).unwrap() = "THIRTY";
        assert_eq!(tree.erase_kth(2), Some((30, "THIRTY")));
        assert_eq!(tree.erase_kth(2), None);
        tree.validate_ordered().unwrap();
    }

    pub(super) fn split_merge_round_trip<S: TestStrategy>() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut tree = Tree::<S, u32, u32>::with_strategy(S::seeded(2));
        for i in 0..2000 {
            tree.insert(rng.gen_range(0..10_000), i);
        }
        let before: Vec<(u32, u32)> = tree.iter().map(|(&k, &v)| (k, v)).collect();

        for _ in 0..50 {
            let key = rng.gen_range(0..10_000);
            let right = tree.split_off(&key);
            tree.validate_ordered().unwrap();
            tree.forest().validate_ordered(&right).unwrap();
            assert_eq!(tree.len(), before.iter().filter(|&&(k, _)| k < key).count());
            tree.append(right);
        }

        let after: Vec<(u32, u32)> = tree.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(before, after);
        tree.validate_ordered().unwrap();
    }

    pub(super) fn big<S: TestStrategy>() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = Tree::<S, u32, u32>::with_strategy(S::seeded(3));
        let mut map = BTreeMap::new();

        for i in 0..20_000 {
            let key = rng.gen_range(0..1000);
            if map.contains_key(&key) {
                assert!(tree.exists(&key));
                assert_eq!(tree.erase(&key), map.remove_entry(&key));
            } else {
                assert!(tree.insert(key, i));
                map.insert(key, i);
            }

            if i % 1000 == 0 {
                log::debug!("i = {}, len = {}", i, map.len());
                tree.validate_ordered().unwrap();
            }
        }

        let keys: Vec<u32> = map.keys().copied().collect();
        for key in keys {
            if rng.gen_range(0..10) < 3 {
                assert!(tree.exists(&key));
                map.remove(&key);
                tree.erase(&key);
            }
        }

        for (k, (&key, &value)) in map.iter().enumerate() {
            assert_eq!(tree.find(&key), Some((&key, &value)));
            assert_eq!(tree.order_of_key(&key), k);
            assert_eq!(tree.get_kth(k), Some((&key, &value)));
        }
        for needle in 0..1001 {
            let want = map.range(needle + 1..).next();
            assert_eq!(tree.next(&needle), want);
            let want = map.range(..needle).next_back();
            assert_eq!(tree.prev(&needle), want);
        }

        tree.validate_ordered().unwrap();
        let got: Vec<(u32, u32)> = tree.iter().map(|(&k, &v)| (k, v)).collect();
        let expected: Vec<(u32, u32)> = map.into_iter().collect();
        assert_eq!(got, expected);

        // Tear down through ranks
        while !tree.is_empty() {
            let k = rng.gen_range(0..tree.len());
            let key = *tree.get_kth(k).unwrap().0;
            assert!(tree.erase(&key).is_some());
        }
        assert!(tree.forest().is_empty());
    }
}

mod implicit {
    use super::*;

    pub(super) fn simple<S: TestStrategy>() {
        let mut tree = seq_from::<S>(&[6, -1, 0, -1, 0, 10, 15]);
        assert_eq!(tree.get_kth(0), Some((&(), &6)));
        assert_eq!(tree.get_kth(1), Some((&(), &-1)));

        assert_eq!(tree.erase_kth(0), Some(((), 6)));
        assert_eq!(tree.get_kth(0), Some((&(), &-1)));
        assert_eq!(tree.get_kth(3), Some((&(), &0)));

        tree.insert_kth(3, 100);
        assert_eq!(tree.get_kth(3), Some((&(), &100)));
        assert_eq!(tree.get_kth(4), Some((&(), &0)));

        *tree.get_kth_mut(3).unwrap() = 101;
        assert_eq!(values(&mut tree), vec![-1, 0, -1, 101, 0, 10, 15]);
        tree.validate().unwrap();

        let nodes = tree.get_traversal();
        let traversed: Vec<i32> = nodes.iter().map(|node| *node.value()).collect();
        assert_eq!(traversed, vec![-1, 0, -1, 101, 0, 10, 15]);
        assert!(nodes.iter().all(|node| node.size() >= 1));
        assert_eq!(nodes.iter().map(|node| node.size()).max(), Some(7));
        assert!(nodes.iter().any(|node| node.size() == 1));
    }

    pub(super) fn cut<S: TestStrategy>() {
        let mut tree = seq_from::<S>(&[6, -1, 0, -1, 0, 10, 15]);

        let segment = tree.cut_subsegment(2, 5);
        assert_eq!(tree.segment_len(&segment), 4);
        assert_eq!(tree.get_kth(2), Some((&(), &15)));
        tree.validate().unwrap();
        tree.forest().validate(&segment).unwrap();

        tree.insert_subsegment(2, segment);
        assert_eq!(tree.get_kth(2), Some((&(), &0)));
        assert_eq!(tree.get_kth(3), Some((&(), &-1)));
        assert_eq!(values(&mut tree), vec![6, -1, 0, -1, 0, 10, 15]);
        tree.validate().unwrap();
    }

    pub(super) fn cut_round_trip<S: TestStrategy>() {
        let mut rng = StdRng::seed_from_u64(4);
        let original: Vec<i32> = (0..500).collect();
        let mut tree = seq_from::<S>(&original);

        for _ in 0..200 {
            let l = rng.gen_range(0..original.len());
            let r = rng.gen_range(l..original.len());
            let segment = tree.cut_subsegment(l, r);
            assert_eq!(tree.segment_len(&segment), r - l + 1);
            assert_eq!(tree.len(), original.len() - (r - l + 1));
            tree.insert_subsegment(l, segment);
        }
        tree.validate().unwrap();
        assert_eq!(values(&mut tree), original);

        // Detach a tail and drop it
        let tail = tree.split_off_kth(100);
        assert_eq!(tree.segment_len(&tail), 400);
        tree.dispose(tail);
        assert_eq!(tree.forest().len(), 100);
        assert_eq!(values(&mut tree), original[..100]);
    }

    pub(super) fn big<S: TestStrategy>() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = Tree::<S, (), u32>::with_strategy(S::seeded(5));
        let mut expected: Vec<u32> = Vec::new();

        for i in 0..20_000 {
            if rng.gen_range(0..3) <= 1 {
                let value = rng.gen();
                let pos = rng.gen_range(0..=expected.len());
                tree.insert_kth(pos, value);
                expected.insert(pos, value);
            } else if !expected.is_empty() {
                let pos = rng.gen_range(0..expected.len());
                assert_eq!(tree.erase_kth(pos), Some(((), expected.remove(pos))));
            }

            if i % 1000 == 0 {
                tree.validate().unwrap();
            }
        }

        tree.validate().unwrap();
        for (i, value) in expected.iter().enumerate() {
            assert_eq!(tree.get_kth(i), Some((&(), value)));
        }
    }
}

mod reverse {
    use super::*;

    pub(super) fn simple<S: TestStrategy>() {
        let mut tree = seq_from::<S>(&[6, -1, 0, -1, 0, 10, 15]);

        tree.reverse_range(2, 5);
        assert_eq!(tree.get_kth(2), Some((&(), &10)));
        assert_eq!(tree.get_kth(3), Some((&(), &0)));

        tree.reverse_range(4, 5);
        assert_eq!(tree.get_kth(5), Some((&(), &-1)));

        tree.reverse_range(0, 6);
        tree.insert_kth(0, 100);
        assert_eq!(tree.get_kth(0), Some((&(), &100)));
        assert_eq!(tree.get_kth(1), Some((&(), &15)));
        tree.validate().unwrap();

        tree.reverse();
        assert_eq!(values(&mut tree), vec![6, -1, 10, 0, 0, -1, 15, 100]);
        tree.validate().unwrap();
    }

    pub(super) fn big<S: TestStrategy>() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = Tree::<S, (), u32>::with_strategy(S::seeded(6));
        let mut expected: Vec<u32> = Vec::new();

        for i in 0..10_000 {
            let kind = rng.gen_range(0..5);
            if kind <= 1 || expected.len() <= 1 {
                let value = rng.gen_range(0..1000);
                let pos = rng.gen_range(0..=expected.len());
                tree.insert_kth(pos, value);
                expected.insert(pos, value);
            } else if kind == 2 {
                let pos = rng.gen_range(0..expected.len());
                assert_eq!(tree.erase_kth(pos), Some(((), expected.remove(pos))));
            } else {
                let l = rng.gen_range(0..expected.len() - 1);
                let r = rng.gen_range(l..expected.len());
                tree.reverse_range(l, r);
                expected[l..=r].reverse();
            }

            if i % 500 == 0 {
                tree.validate().unwrap();
            }
        }

        tree.validate().unwrap();
        assert_eq!(values(&mut tree), expected);
    }
}

/// The four strategies, driven in lockstep.
struct Lockstep<K, V> {
    avl: Tree<Avl, K, V>,
    rbtree: Tree<RedBlack, K, V>,
    splay: Tree<Splay, K, V>,
    treap: Tree<Treap, K, V>,
}

impl<K, V> Lockstep<K, V> {
    fn new(seed: u64) -> Self {
        Self {
            avl: Tree::with_strategy(Avl),
            rbtree: Tree::with_strategy(RedBlack),
            splay: Tree::with_strategy(Splay),
            treap: Tree::with_strategy(Treap::seed_from_u64(seed)),
        }
    }
}

/// Apply the same operation to every tree of a [`Lockstep`] and return the
/// four results.
macro_rules! lockstep {
    ($trees:expr, |$tree:ident| $body:expr) => {{
        let trees = &mut $trees;
        [
            {
                let $tree = &mut trees.avl;
                $body
            },
            {
                let $tree = &mut trees.rbtree;
                $body
            },
            {
                let $tree = &mut trees.splay;
                $body
            },
            {
                let $tree = &mut trees.treap;
                $body
            },
        ]
    }};
}

fn assert_all_eq<T: PartialEq + std::fmt::Debug>(results: [T; 4]) {
    let [avl, rest @ ..] = results;
    for other in rest {
        assert_eq!(avl, other);
    }
}

#[quickcheck]
fn qc_keyed_strategies_agree(seed: u64, cmds: Vec<u8>) {
    let mut trees = Lockstep::<u8, usize>::new(seed);
    let mut cmds = cmds.into_iter();

    log::info!("seed = {}, cmds = {:?}", seed, cmds);

    let mut i = 0;
    while let Some(cmd) = cmds.next() {
        let Some(arg) = cmds.next() else { break };
        i += 1;
        match cmd % 6 {
            0 => assert_all_eq(lockstep!(trees, |t| t.erase(&arg))),
            1 => assert_all_eq(lockstep!(trees, |t| t.erase_kth(arg as usize % 16))),
            2 => assert_all_eq(lockstep!(trees, |t| t.order_of_key(&arg))),
            3 => assert_all_eq(lockstep!(trees, |t| t.next(&arg).map(|(&k, &v)| (k, v)))),
            4 => assert_all_eq(lockstep!(trees, |t| t.prev(&arg).map(|(&k, &v)| (k, v)))),
            _ => assert_all_eq(lockstep!(trees, |t| t.insert(arg, i))),
        }

        assert_all_eq(lockstep!(trees, |t| t.validate_ordered()));
        assert_all_eq(lockstep!(trees, |t| t
            .iter()
            .map(|(&k, &v)| (k, v))
            .collect::<Vec<_>>()));
    }
}

#[quickcheck]
fn qc_implicit_strategies_agree(seed: u64, cmds: Vec<u8>) {
    let mut trees = Lockstep::<(), u8>::new(seed);
    let mut cmds = cmds.into_iter();

    log::info!("seed = {}, cmds = {:?}", seed, cmds);

    while let Some(cmd) = cmds.next() {
        let Some(arg) = cmds.next() else { break };
        let len = trees.avl.len();
        match cmd % 4 {
            0 => {
                let k = arg as usize % (len + 1);
                lockstep!(trees, |t| t.insert_kth(k, arg));
            }
            1 => assert_all_eq(lockstep!(trees, |t| t.erase_kth(arg as usize))),
            2 if len > 0 => {
                let l = arg as usize % len;
                let r = l + (cmd as usize / 4) % (len - l);
                lockstep!(trees, |t| t.reverse_range(l, r));
            }
            _ => {
                lockstep!(trees, |t| t.push_back(arg));
            }
        }

        assert_all_eq(lockstep!(trees, |t| t.validate()));
        assert_all_eq(lockstep!(trees, |t| values(t)));
    }
}
