//! Order statistic [treap][1] engine
//!
//! [1]: https://en.wikipedia.org/wiki/Treap
//!
//! Every node draws a random priority when it is allocated; the tree is a
//! binary search tree by rank and a max-heap by priority. Split and merge
//! are the primitive operations and everything else is expressed with them.
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::mem::take;

use super::{sealed, Augment, Forest, InvariantError, Link, NodeId, Strategy, Subtree};

/// The treap strategy. `R` supplies the node priorities.
#[derive(Debug, Clone)]
pub struct Treap<R = StdRng> {
    rng: R,
}

impl Treap<StdRng> {
    /// Seed the priority generator from the operating system.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Use a deterministic priority sequence.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> Treap<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl Default for Treap<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// The heap priority of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(u64);

impl Priority {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Augment for Priority {
    // The priority is fixed at allocation.
    #[inline]
    fn pull(&mut self, _children: [Option<Self>; 2]) {}
}

impl<R> sealed::Sealed for Treap<R> {}

impl<R: RngCore> Strategy for Treap<R> {
    type Aug = Priority;

    #[inline]
    fn fresh(&mut self) -> Priority {
        Priority(self.rng.next_u64())
    }

    fn merge<K, V>(forest: &mut Forest<Self, K, V>, left: Subtree, right: Subtree) -> Subtree {
        Subtree(merge_links(forest, left.0, right.0))
    }

    fn split_k<K, V>(forest: &mut Forest<Self, K, V>, root: Subtree, k: usize) -> (Subtree, Subtree) {
        let mut remaining = k;
        let (left, right) = split_while(forest, root.0, &mut |forest, id| {
            // Called top-down along the split path; `remaining` tracks the
            // rank of the split point relative to the current subtree
            let left_size = forest.size_of(forest.child(id, false));
            if remaining > left_size {
                remaining -= left_size + 1;
                true
            } else {
                false
            }
        });
        (Subtree(left), Subtree(right))
    }

    fn split<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: Subtree, key: &K) -> (Subtree, Subtree) {
        let (left, right) = split_while(forest, root.0, &mut |forest, id| forest.key(id) < key);
        (Subtree(left), Subtree(right))
    }

    fn insert<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, node: NodeId) -> bool {
        let (left, right) =
            split_while(forest, take(root).0, &mut |forest, id| forest.key(id) < forest.key(node));
        if let Some(min) = forest.leftmost(right) {
            if forest.key(min) == forest.key(node) {
                root.0 = merge_links(forest, left, right);
                forest.free(node);
                return false;
            }
        }
        let left = merge_links(forest, left, Some(node));
        root.0 = merge_links(forest, left, right);
        true
    }

    fn erase<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Link {
        forest.search(root.0, key)?;
        let k = forest.rank_of(root.0, key);
        Self::erase_kth(forest, root, k)
    }

    fn check_balance<K, V>(forest: &Forest<Self, K, V>, root: Link) -> Result<(), InvariantError> {
        let mut stack: Vec<NodeId> = root.into_iter().collect();
        while let Some(id) = stack.pop() {
            for child in forest.children(id).into_iter().flatten() {
                if forest.aug(child) > forest.aug(id) {
                    return Err(InvariantError::Heap(child));
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}

/// Split `link` into the nodes for which `goes_left` holds and the rest.
/// `goes_left` must hold for a prefix of the in-order sequence; it is
/// evaluated on the nodes of one root-to-leaf path, from the top down.
fn split_while<K, V, R: RngCore>(
    forest: &mut Forest<Treap<R>, K, V>,
    link: Link,
    goes_left: &mut impl FnMut(&Forest<Treap<R>, K, V>, NodeId) -> bool,
) -> (Link, Link) {
    let Some(id) = link else {
        return (None, None);
    };
    forest.push(id);
    if goes_left(forest, id) {
        let right = forest.child(id, true);
        let (mid, right) = split_while(forest, right, goes_left);
        forest.set_child(id, true, mid);
        forest.update(id);
        (Some(id), right)
    } else {
        let left = forest.child(id, false);
        let (left, mid) = split_while(forest, left, goes_left);
        forest.set_child(id, false, mid);
        forest.update(id);
        (left, Some(id))
    }
}

fn merge_links<K, V, R: RngCore>(forest: &mut Forest<Treap<R>, K, V>, left: Link, right: Link) -> Link {
    let (Some(l), Some(r)) = (left, right) else {
        return left.or(right);
    };
    if forest.aug(l) > forest.aug(r) {
        forest.push(l);
        let inner = forest.child(l, true);
        let merged = merge_links(forest, inner, right);
        forest.set_child(l, true, merged);
        forest.update(l);
        Some(l)
    } else {
        forest.push(r);
        let inner = forest.child(r, false);
        let merged = merge_links(forest, left, inner);
        forest.set_child(r, false, merged);
        forest.update(r);
        Some(r)
    }
}
