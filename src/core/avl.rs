//! Height-balanced ([AVL][1]) engine
//!
//! Keyed insertion and erasure are the classic recursive algorithms. Split
//! and merge are built on [`join`], which glues two trees of arbitrary
//! heights around a middle node in O(|height difference| + 1).
//!
//! [1]: https://en.wikipedia.org/wiki/AVL_tree
use std::{cmp::Ordering, mem::take};

use super::{sealed, Augment, Forest, InvariantError, Link, NodeId, Strategy, Subtree};

/// The height-balanced strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct Avl;

/// The height of a node's subtree. A leaf has height 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Height(u8);

impl Height {
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Augment for Height {
    #[inline]
    fn pull(&mut self, children: [Option<Self>; 2]) {
        let [left, right] = children.map(|child| child.map_or(0, |h| h.0));
        self.0 = 1 + left.max(right);
    }
}

impl sealed::Sealed for Avl {}

impl Strategy for Avl {
    type Aug = Height;

    #[inline]
    fn fresh(&mut self) -> Height {
        Height(1)
    }

    fn merge<K, V>(forest: &mut Forest<Self, K, V>, left: Subtree, right: Subtree) -> Subtree {
        let (Some(left), Some(right)) = (left.0, right.0) else {
            return Subtree(left.0.or(right.0));
        };
        let len = forest.size_of(Some(left));
        let (rest, max, _) = split_around(forest, Some(left), len);
        let max = max.expect("non-empty tree has no maximum");
        Subtree(Some(join(forest, rest, max, Some(right))))
    }

    fn split_k<K, V>(forest: &mut Forest<Self, K, V>, root: Subtree, k: usize) -> (Subtree, Subtree) {
        let (left, mid, right) = split_around(forest, root.0, k);
        let left = match mid {
            Some(mid) => Some(join(forest, left, mid, None)),
            None => left,
        };
        (Subtree(left), Subtree(right))
    }

    fn insert<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, node: NodeId) -> bool {
        let (new_root, inserted) = insert_at(forest, root.0, node);
        root.0 = Some(new_root);
        if !inserted {
            forest.free(node);
        }
        inserted
    }

    fn erase<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Link {
        let (new_root, removed) = erase_at(forest, root.0, key);
        root.0 = new_root;
        removed
    }

    fn insert_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize, node: NodeId) {
        let (left, right) = Self::split_k(forest, take(root), k);
        root.0 = Some(join(forest, left.0, node, right.0));
    }

    fn erase_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize) -> Link {
        if k >= forest.size_of(root.0) {
            return None;
        }
        let (left, mid, right) = split_around(forest, take(root).0, k + 1);
        *root = Self::merge(forest, Subtree(left), Subtree(right));
        mid
    }

    fn check_balance<K, V>(forest: &Forest<Self, K, V>, root: Link) -> Result<(), InvariantError> {
        check_heights(forest, root).map(drop)
    }
}

#[inline]
fn height<K, V>(forest: &Forest<Avl, K, V>, link: Link) -> u8 {
    link.map_or(0, |id| forest.aug(id).0)
}

#[inline]
fn balance_factor<K, V>(forest: &Forest<Avl, K, V>, id: NodeId) -> i32 {
    let [left, right] = forest.children(id);
    i32::from(height(forest, right)) - i32::from(height(forest, left))
}

/// Recompute `node` and rotate it if its balance factor reached ±2. Returns
/// the root of the subtree.
///
/// `node` must have been pushed.
fn rebalance<K, V>(forest: &mut Forest<Avl, K, V>, node: NodeId) -> NodeId {
    forest.update(node);
    let factor = balance_factor(forest, node);
    if factor.abs() <= 1 {
        return node;
    }

    // The heavy side, and the rotation direction that lifts it
    let heavy_side = factor > 0;
    let heavy = forest
        .child(node, heavy_side)
        .expect("the heavy side of an unbalanced node is empty");
    forest.push(heavy);
    let heavy_factor = balance_factor(forest, heavy);
    log::trace!("avl: rebalancing {:?} (balance {})", node, factor);

    // Leaning the other way? Straighten it first (double rotation)
    if (heavy_factor > 0) != heavy_side && heavy_factor != 0 {
        let heavy = forest.rotate(heavy, heavy_side);
        forest.set_child(node, heavy_side, Some(heavy));
    }
    forest.rotate(node, !heavy_side)
}

fn insert_at<K: Ord, V>(forest: &mut Forest<Avl, K, V>, link: Link, node: NodeId) -> (NodeId, bool) {
    let Some(parent) = link else {
        return (node, true);
    };
    forest.push(parent);
    let side = match forest.key(node).cmp(forest.key(parent)) {
        Ordering::Equal => return (parent, false),
        Ordering::Less => false,
        Ordering::Greater => true,
    };
    let child = forest.child(parent, side);
    let (child, inserted) = insert_at(forest, child, node);
    forest.set_child(parent, side, Some(child));
    if inserted {
        (rebalance(forest, parent), true)
    } else {
        (parent, false)
    }
}

/// Returns the new subtree and the detached node, if any.
fn erase_at<K: Ord, V>(forest: &mut Forest<Avl, K, V>, link: Link, key: &K) -> (Link, Link) {
    let Some(id) = link else {
        return (None, None);
    };
    forest.push(id);
    let side = match key.cmp(forest.key(id)) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => {
            let [left, right] = forest.children(id);
            forest.set_children(id, [None, None]);
            forest.update(id);

            // Splice in the in-order successor
            let Some(right) = right else {
                return (left, Some(id));
            };
            let (min, rest) = detach_min(forest, right);
            forest.set_children(min, [left, rest]);
            return (Some(rebalance(forest, min)), Some(id));
        }
    };
    let child = forest.child(id, side);
    let (child, removed) = erase_at(forest, child, key);
    forest.set_child(id, side, child);
    match removed {
        Some(_) => (Some(rebalance(forest, id)), removed),
        None => (Some(id), None),
    }
}

/// Detach the minimum of the subtree `id`. Returns the minimum and what is
/// left of the subtree.
fn detach_min<K, V>(forest: &mut Forest<Avl, K, V>, id: NodeId) -> (NodeId, Link) {
    forest.push(id);
    match forest.child(id, false) {
        None => {
            let right = forest.child(id, true);
            forest.set_child(id, true, None);
            (id, right)
        }
        Some(left) => {
            let (min, rest) = detach_min(forest, left);
            forest.set_child(id, false, rest);
            (min, Some(rebalance(forest, id)))
        }
    }
}

/// Concatenate `left`, `mid`, and `right`. `mid` must be detached and have
/// no pending reversal.
///
/// Walks down the taller tree's inner spine until the heights match, attaches
/// the shorter one there, and rebalances on the way back up.
fn join<K, V>(forest: &mut Forest<Avl, K, V>, left: Link, mid: NodeId, right: Link) -> NodeId {
    debug_assert!(!forest.node(mid).reversed);
    let (left_height, right_height) = (height(forest, left), height(forest, right));
    if left_height.abs_diff(right_height) <= 1 {
        forest.set_children(mid, [left, right]);
        forest.update(mid);
        return mid;
    }

    let left_is_higher = left_height > right_height;
    let higher = if left_is_higher { left } else { right };
    let higher = higher.expect("the taller side of a join is empty");
    forest.push(higher);

    // The spine facing the other tree
    let inner = forest.child(higher, left_is_higher);
    let joined = if left_is_higher {
        join(forest, inner, mid, right)
    } else {
        join(forest, left, mid, inner)
    };
    forest.set_child(higher, left_is_higher, Some(joined));
    rebalance(forest, higher)
}

/// Split `link` around its `k`-th element (1-based). Returns the first
/// `k - 1` elements, the `k`-th element (detached), and the rest. If `k` is
/// zero or exceeds the size, there is no middle element and everything goes
/// to the right or the left part, respectively.
fn split_around<K, V>(
    forest: &mut Forest<Avl, K, V>,
    link: Link,
    k: usize,
) -> (Link, Option<NodeId>, Link) {
    let Some(id) = link else {
        return (None, None, None);
    };
    forest.push(id);
    let [left, right] = forest.children(id);
    forest.set_children(id, [None, None]);
    forest.update(id);

    let left_size = forest.size_of(left);
    if left_size + 1 == k {
        (left, Some(id), right)
    } else if left_size >= k {
        let (l, mid, r) = split_around(forest, left, k);
        (l, mid, Some(join(forest, r, id, right)))
    } else {
        let (l, mid, r) = split_around(forest, right, k - left_size - 1);
        (Some(join(forest, left, id, l)), mid, r)
    }
}

fn check_heights<K, V>(forest: &Forest<Avl, K, V>, link: Link) -> Result<usize, InvariantError> {
    let Some(id) = link else {
        return Ok(0);
    };
    let [left, right] = forest.children(id);
    let (left_height, right_height) = (check_heights(forest, left)?, check_heights(forest, right)?);
    let factor = right_height as i32 - left_height as i32;
    if factor.abs() > 1 {
        return Err(InvariantError::Unbalanced { node: id, factor });
    }
    let actual = 1 + left_height.max(right_height);
    let recorded = usize::from(forest.aug(id).0);
    if recorded != actual {
        return Err(InvariantError::HeightMismatch {
            node: id,
            recorded,
            actual,
        });
    }
    Ok(actual)
}
