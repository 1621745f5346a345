//! Order statistic [splay tree][1] engine
//!
//! [1]: https://en.wikipedia.org/wiki/Splay_tree
//!
//! Every access brings the accessed node to the root with a top-down splay.
//! Splay trees have no depth bound, so nothing in here recurses.
use std::mem::take;

use super::{sealed, Forest, InvariantError, Link, NodeId, Strategy, Subtree};

/// The splay strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct Splay;

impl sealed::Sealed for Splay {}

impl Strategy for Splay {
    type Aug = ();

    #[inline]
    fn fresh(&mut self) {}

    fn merge<K, V>(forest: &mut Forest<Self, K, V>, mut left: Subtree, right: Subtree) -> Subtree {
        if left.0.is_none() {
            return right;
        }
        let last = forest.size_of(left.0) - 1;
        let max = splay_kth(forest, &mut left, last);
        debug_assert_eq!(forest.child(max, true), None);
        forest.set_child(max, true, right.0);
        forest.update(max);
        left
    }

    fn split_k<K, V>(forest: &mut Forest<Self, K, V>, mut root: Subtree, k: usize) -> (Subtree, Subtree) {
        if k == 0 {
            return (Subtree::EMPTY, root);
        }
        if k >= forest.size_of(root.0) {
            return (root, Subtree::EMPTY);
        }
        let first_right = splay_kth(forest, &mut root, k);
        let left = forest.child(first_right, false);
        forest.set_child(first_right, false, None);
        forest.update(first_right);
        (Subtree(left), root)
    }

    fn insert<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, node: NodeId) -> bool {
        let k = forest.rank_of_node(root.0, node);
        if k < forest.size_of(root.0) {
            let succ = splay_kth(forest, root, k);
            if forest.key(succ) == forest.key(node) {
                forest.free(node);
                return false;
            }
        }
        let (left, right) = Self::split_k(forest, take(root), k);
        forest.set_children(node, [left.0, right.0]);
        forest.update(node);
        root.0 = Some(node);
        true
    }

    fn erase<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Link {
        Self::find(forest, root, key)?;
        Some(detach_root(forest, root))
    }

    fn insert_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize, node: NodeId) {
        let (left, right) = Self::split_k(forest, take(root), k);
        forest.set_children(node, [left.0, right.0]);
        forest.update(node);
        root.0 = Some(node);
    }

    fn erase_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize) -> Link {
        if k >= forest.size_of(root.0) {
            return None;
        }
        splay_kth(forest, root, k);
        Some(detach_root(forest, root))
    }

    fn get_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize) -> Link {
        if k >= forest.size_of(root.0) {
            return None;
        }
        Some(splay_kth(forest, root, k))
    }

    fn find<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Link {
        let len = forest.size_of(root.0);
        if len == 0 {
            return None;
        }
        // Splay the would-be position even on a miss so that the search
        // cost is paid for
        let k = forest.rank_of(root.0, key).min(len - 1);
        let found = splay_kth(forest, root, k);
        (forest.key(found) == key).then_some(found)
    }

    fn get_min<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree) -> Link {
        Self::get_kth(forest, root, 0)
    }

    fn order_of_key<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> usize {
        let k = forest.rank_of(root.0, key);
        let len = forest.size_of(root.0);
        if len > 0 {
            splay_kth(forest, root, k.min(len - 1));
        }
        k
    }

    fn next<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Link {
        let k = forest.rank_after(root.0, key);
        Self::get_kth(forest, root, k)
    }

    fn prev<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Link {
        let k = forest.rank_of(root.0, key).checked_sub(1)?;
        Self::get_kth(forest, root, k)
    }

    fn check_balance<K, V>(_: &Forest<Self, K, V>, _: Link) -> Result<(), InvariantError> {
        // Any shape is a valid splay tree
        Ok(())
    }
}

/// Unlink the root of `root` and merge its subtrees in its place.
fn detach_root<K, V>(forest: &mut Forest<Splay, K, V>, root: &mut Subtree) -> NodeId {
    let id = root.0.expect("detaching the root of an empty tree");
    forest.push(id);
    let [left, right] = forest.children(id);
    forest.set_children(id, [None, None]);
    forest.update(id);
    *root = Splay::merge(forest, Subtree(left), Subtree(right));
    id
}

/// Bring the node of rank `k` to the root and return it. `k` must be in
/// range.
///
/// The splay is done top-down: the nodes left of the search path are
/// collected into a left tree, hung off its rightmost node, and the nodes
/// right of it into a right tree, hung off its leftmost node. Both are
/// reattached as the children of the target once it is found.
fn splay_kth<K, V>(forest: &mut Forest<Splay, K, V>, root: &mut Subtree, mut k: usize) -> NodeId {
    debug_assert!(k < forest.size_of(root.0));
    let mut cur = root.0.expect("splaying an empty tree");

    // `[left tree, right tree]`, and the nodes on their open spines from the
    // top down
    let mut trees: [Link; 2] = [None, None];
    let mut spines: [Vec<NodeId>; 2] = [Vec::new(), Vec::new()];

    loop {
        forest.push(cur);
        let left_size = forest.size_of(forest.child(cur, false));
        if k == left_size {
            break;
        }

        // The side of `cur` the target is on
        let side = k > left_size;
        let child = forest
            .child(cur, side)
            .expect("rank is out of range of the subtree");
        forest.push(child);
        let child_left_size = forest.size_of(forest.child(child, false));

        // Zig-zig: rotate first so that `child` takes `cur`'s place
        let zig_zig = if side {
            k - left_size - 1 > child_left_size
        } else {
            k < child_left_size
        };
        if zig_zig {
            log::trace!("splay: rotate at {:?}", cur);
            cur = forest.rotate(cur, !side);
        }

        // Break `cur` off toward the target and hang it on the opposite
        // tree. Rotations preserve ranks, so `k` is still relative to `cur`.
        let next = forest
            .child(cur, side)
            .expect("rank is out of range of the subtree");
        if side {
            k -= forest.size_of(forest.child(cur, false)) + 1;
        }
        forest.set_child(cur, side, None);
        // Nodes smaller than the target go to the left tree
        let tree = !side as usize;
        match spines[tree].last() {
            Some(&hook) => forest.set_child(hook, side, Some(cur)),
            None => trees[tree] = Some(cur),
        }
        spines[tree].push(cur);
        cur = next;
    }

    // Assemble
    let children = forest.children(cur);
    for (tree, spine) in spines.iter().enumerate() {
        // The left tree's open spine is its right one
        let side = tree == 0;
        if let Some(&hook) = spine.last() {
            forest.set_child(hook, side, children[tree]);
        } else {
            trees[tree] = children[tree];
        }
        for &id in spine.iter().rev() {
            forest.update(id);
        }
    }
    forest.set_children(cur, trees);
    forest.update(cur);
    root.0 = Some(cur);
    cur
}
