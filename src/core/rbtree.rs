//! Order statistic [red-black][1] engine
//!
//! [1]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
//!
//! Nodes carry a parent link so that the insertion fixup can climb toward
//! the root without recursion. The parent link is a plain [`NodeId`]; only
//! `children` expresses ownership.
//!
//! Split and merge use the same join algebra as the AVL engine, with heights
//! replaced by black heights. The join attaches the middle node as a red node
//! and leaves at most one red-red violation behind, which a single run of the
//! insertion fixup repairs.
use std::{cmp::Ordering, mem::swap, mem::take};

use super::{sealed, Augment, Forest, InvariantError, IsRightChild, Link, NodeId, Strategy, Subtree};

/// The red-black strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct RedBlack;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
}

/// Red-black bookkeeping of a node.
#[derive(Debug, Clone, Copy)]
pub struct Coloring {
    color: Color,
    /// The number of black nodes on any path from this node down to a nil
    /// leaf, counting this node and the nil leaf.
    black_height: u8,
    parent: Option<NodeId>,
}

impl Coloring {
    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn black_height(&self) -> u8 {
        self.black_height
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

impl Augment for Coloring {
    #[inline]
    fn pull(&mut self, children: [Option<Self>; 2]) {
        let [left, right] = children.map(|child| child.map_or(1, |c| c.black_height));
        self.black_height = left.max(right) + (self.color == Color::Black) as u8;
    }
}

impl sealed::Sealed for RedBlack {}

impl Strategy for RedBlack {
    type Aug = Coloring;

    #[inline]
    fn fresh(&mut self) -> Coloring {
        Coloring {
            color: Color::Black,
            black_height: 2,
            parent: None,
        }
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

    fn insert<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, new_node: NodeId) -> bool {
        // Find the initial place for `new_node`
        let Some(mut parent) = root.0 else {
            // `new_node` is the new root
            set_color(forest, new_node, Color::Black);
            root.0 = Some(new_node);
            return true;
        };
        let node_side = loop {
            forest.push(parent);
            let side = match forest.key(new_node).cmp(forest.key(parent)) {
                Ordering::Equal => {
                    forest.free(new_node);
                    return false;
                }
                Ordering::Less => false,
                Ordering::Greater => true,
            };
            match forest.child(parent, side) {
                // We need to go deeper
                Some(child) => parent = child,
                None => break side,
            }
        };

        link(forest, parent, node_side, Some(new_node));
        set_color(forest, new_node, Color::Red);
        update_to_root(forest, Some(parent));

        insert_fixup(forest, &mut root.0, new_node);
        true
    }

    fn erase<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Link {
        forest.search(root.0, key)?;
        let k = forest.rank_of(root.0, key);
        Self::erase_kth(forest, root, k)
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

    fn push_back<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, new_node: NodeId) {
        let Some(last) = forest.rightmost(root.0) else {
            set_color(forest, new_node, Color::Black);
            root.0 = Some(new_node);
            return;
        };
        link(forest, last, true, Some(new_node));
        set_color(forest, new_node, Color::Red);
        update_to_root(forest, Some(last));
        insert_fixup(forest, &mut root.0, new_node);
    }

    fn cut_subsegment<K, V>(
        forest: &mut Forest<Self, K, V>,
        root: &mut Subtree,
        l: usize,
        r: usize,
    ) -> Subtree {
        // Keep the element preceding the segment as a join point instead of
        // re-extracting a maximum in `merge`
        let (left, join_point, rest) = split_around(forest, take(root).0, l);
        let (segment, right) = Self::split_k(forest, Subtree(rest), r - l + 1);
        root.0 = match join_point {
            Some(mid) => Some(join(forest, left, mid, right.0)),
            None => Self::merge(forest, Subtree(left), right).0,
        };
        segment
    }

    fn insert_subsegment<K, V>(
        forest: &mut Forest<Self, K, V>,
        root: &mut Subtree,
        i: usize,
        segment: Subtree,
    ) {
        let (left, join_point, right) = split_around(forest, take(root).0, i);
        let left = match join_point {
            Some(mid) => Subtree(Some(join(forest, left, mid, segment.0))),
            None => Self::merge(forest, Subtree(left), segment),
        };
        *root = Self::merge(forest, left, Subtree(right));
    }

    fn check_balance<K, V>(forest: &Forest<Self, K, V>, root: Link) -> Result<(), InvariantError> {
        let Some(root) = root else {
            return Ok(());
        };
        if forest.aug(root).parent.is_some() {
            return Err(InvariantError::Parent(root));
        }
        if color(forest, Some(root)) == Color::Red {
            return Err(InvariantError::RedRoot(root));
        }
        check_node(forest, root).map(drop)
    }
}

#[inline]
fn color<K, V>(forest: &Forest<RedBlack, K, V>, link: Link) -> Color {
    // A nil node is considered to be black
    link.map_or(Color::Black, |id| forest.aug(id).color)
}

#[inline]
fn black_height<K, V>(forest: &Forest<RedBlack, K, V>, link: Link) -> u8 {
    link.map_or(1, |id| forest.aug(id).black_height)
}

#[inline]
fn parent<K, V>(forest: &Forest<RedBlack, K, V>, id: NodeId) -> Option<NodeId> {
    forest.aug(id).parent
}

#[inline]
fn set_parent<K, V>(forest: &mut Forest<RedBlack, K, V>, id: NodeId, parent: Option<NodeId>) {
    forest.aug_mut(id).parent = parent;
}

/// Repaint `id` and recompute its black height.
#[inline]
fn set_color<K, V>(forest: &mut Forest<RedBlack, K, V>, id: NodeId, color: Color) {
    forest.aug_mut(id).color = color;
    forest.update(id);
}

/// Make `child` the `side` child of `parent`, keeping the parent link in
/// sync.
#[inline]
fn link<K, V>(forest: &mut Forest<RedBlack, K, V>, parent: NodeId, side: IsRightChild, child: Link) {
    forest.set_child(parent, side, child);
    if let Some(child) = child {
        set_parent(forest, child, Some(parent));
    }
}

#[inline]
fn side_of<K, V>(forest: &Forest<RedBlack, K, V>, parent: NodeId, child: NodeId) -> IsRightChild {
    forest.child(parent, true) == Some(child)
}

/// Recompute `link` and all of its ancestors.
fn update_to_root<K, V>(forest: &mut Forest<RedBlack, K, V>, mut link: Link) {
    while let Some(id) = link {
        forest.update(id);
        link = parent(forest, id);
    }
}

/// Rotate a node. `dir` specifies `node`'s position after rotation. `root` is
/// updated if `node` was the root.
fn rotate<K, V>(forest: &mut Forest<RedBlack, K, V>, root: &mut Link, node: NodeId, dir: IsRightChild) {
    let node_parent = parent(forest, node);
    let new_root = forest.rotate(node, dir);

    //          node            new_root
    //          /  \            /  \
    //         /    \          /    \
    //  new_root    y   ==>   x     node
    //    /  \                      /  \
    //   x  mid                    mid  y
    set_parent(forest, new_root, node_parent);
    set_parent(forest, node, Some(new_root));
    if let Some(mid) = forest.child(node, !dir) {
        set_parent(forest, mid, Some(node));
    }

    // Update the subtree's parent's child pointer.
    if let Some(node_parent) = node_parent {
        let side = side_of(forest, node_parent, node);
        debug_assert_eq!(forest.child(node_parent, side), Some(node));
        forest.set_child(node_parent, side, Some(new_root));
        forest.update(node_parent);
    } else {
        debug_assert_eq!(*root, Some(node));
        *root = Some(new_root);
    }
}

/// Restore the color invariant after `node` was linked in red. `node` and
/// every ancestor of it must have been pushed.
fn insert_fixup<K, V>(forest: &mut Forest<RedBlack, K, V>, root: &mut Link, mut node: NodeId) {
    loop {
        debug_assert_eq!(color(forest, Some(node)), Color::Red);

        // Color invariant fulfilled?
        let Some(mut parent) = parent(forest, node) else {
            break;
        };
        if color(forest, Some(parent)) == Color::Black {
            break;
        }

        // `parent` is red, so `node` cannot be red. What do we do now?
        let Some(grandparent) = self::parent(forest, parent) else {
            // `parent` is the root. Repainting it black below increases the
            // black height by one and restores the color invariant.
            break;
        };
        // Due to the color invariant, `grandparent` must be black.
        debug_assert_eq!(color(forest, Some(grandparent)), Color::Black);

        let parent_side = side_of(forest, grandparent, parent);
        let uncle = forest.child(grandparent, !parent_side);
        if let Some(uncle) = uncle.filter(|&u| color(forest, Some(u)) == Color::Red) {
            // Both `parent` and `uncle` are red. Repaint them to black
            // and `grandparent` to red. (This doesn't change
            // `grandparent`'s subtree's black height.)
            log::trace!("rbtree: recolor below {:?}", grandparent);
            set_color(forest, parent, Color::Black);
            set_color(forest, uncle, Color::Black);
            set_color(forest, grandparent, Color::Red);

            // `grandparent` might now violate the color invariant, so
            // iterate again from there
            node = grandparent;
            continue;
        }

        // `parent` is red, but `uncle` is black. Check the sides of
        // `node` and `uncle`. If they are on the same side, we need to
        // fix this before proceeding to the next step.
        let mut node_side = side_of(forest, parent, node);
        if parent_side != node_side {
            rotate(forest, root, parent, !node_side);

            // The rotation flips the relationship between `node` and
            // `parent`.
            swap(&mut parent, &mut node);
            node_side = !node_side;
            debug_assert_eq!(self::parent(forest, parent), Some(grandparent));
            debug_assert_eq!(forest.child(parent, node_side), Some(node));
        }

        // Now `node` and `uncle` are on different sides.
        // Push `grandparent` to `uncle`'s position,
        // making `parent` (red) the parent of `node` (red) and
        // `grandparent` (black). Repaint `parent` to black and
        // `grandparent` to red first so that the rotation computes the
        // final black heights.
        log::trace!("rbtree: rotate at {:?}", grandparent);
        forest.aug_mut(parent).color = Color::Black;
        forest.aug_mut(grandparent).color = Color::Red;
        rotate(forest, root, grandparent, !node_side);
        break;
    }

    let root = root.expect("fixup ran on an empty tree");
    set_color(forest, root, Color::Black);
}

/// Concatenate `left`, `mid`, and `right`. `mid` must be detached and have
/// no pending reversal.
fn join<K, V>(forest: &mut Forest<RedBlack, K, V>, left: Link, mid: NodeId, right: Link) -> NodeId {
    debug_assert!(!forest.node(mid).reversed);
    // Black roots make the descent below stop at a black node
    for side in [left, right].into_iter().flatten() {
        set_parent(forest, side, None);
        set_color(forest, side, Color::Black);
    }
    let mut root = Some(join_no_fix(forest, left, mid, right));
    insert_fixup(forest, &mut root, mid);
    root.expect("join produced an empty tree")
}

/// Attach `mid` as a red node where the taller tree's inner spine reaches
/// the other tree's black height. The result may have a red-red violation
/// at `mid`; [`join`] repairs it.
fn join_no_fix<K, V>(forest: &mut Forest<RedBlack, K, V>, left: Link, mid: NodeId, right: Link) -> NodeId {
    let (left_height, right_height) = (black_height(forest, left), black_height(forest, right));

    // `left` and `right` are black-rooted at the top level. Further down,
    // only stop at black nodes so that `mid` never gets a red child.
    if left_height == right_height
        && color(forest, left) == Color::Black
        && color(forest, right) == Color::Black
    {
        forest.set_children(mid, [None, None]);
        link(forest, mid, false, left);
        link(forest, mid, true, right);
        forest.aug_mut(mid).color = Color::Red;
        set_parent(forest, mid, None);
        forest.update(mid);
        return mid;
    }

    // Descend on the side with the larger black height; on a tie, the side
    // with the red root
    let left_is_higher = left_height > right_height
        || (left_height == right_height && color(forest, left) == Color::Red);
    let higher = if left_is_higher { left } else { right };
    let higher = higher.expect("the taller side of a join is empty");
    forest.push(higher);

    let inner = forest.child(higher, left_is_higher);
    let joined = if left_is_higher {
        join_no_fix(forest, inner, mid, right)
    } else {
        join_no_fix(forest, left, mid, inner)
    };
    link(forest, higher, left_is_higher, Some(joined));
    forest.update(higher);
    higher
}

/// Cut `id` loose from its children, which become black roots.
fn clear_vertex<K, V>(forest: &mut Forest<RedBlack, K, V>, id: NodeId) -> [Link; 2] {
    forest.push(id);
    let children = forest.children(id);
    for child in children.into_iter().flatten() {
        set_parent(forest, child, None);
        set_color(forest, child, Color::Black);
    }
    forest.set_children(id, [None, None]);
    set_parent(forest, id, None);
    set_color(forest, id, Color::Black);
    children
}

/// Split `link` around its `k`-th element (1-based). See the AVL engine's
/// counterpart for the edge cases.
fn split_around<K, V>(
    forest: &mut Forest<RedBlack, K, V>,
    link: Link,
    k: usize,
) -> (Link, Option<NodeId>, Link) {
    let Some(id) = link else {
        return (None, None, None);
    };
    let [left, right] = clear_vertex(forest, id);

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

/// Returns the black height of the subtree.
fn check_node<K, V>(forest: &Forest<RedBlack, K, V>, id: NodeId) -> Result<u8, InvariantError> {
    let node_color = color(forest, Some(id));
    let mut heights = [1u8; 2];
    for (side, child) in forest.children(id).into_iter().enumerate() {
        let Some(child) = child else { continue };
        if parent(forest, child) != Some(id) {
            return Err(InvariantError::Parent(child));
        }
        if node_color == Color::Red && color(forest, Some(child)) == Color::Red {
            return Err(InvariantError::RedRed(id));
        }
        heights[side] = check_node(forest, child)?;
    }
    if heights[0] != heights[1] {
        return Err(InvariantError::BlackHeight(id));
    }
    let actual = heights[0] + (node_color == Color::Black) as u8;
    if forest.aug(id).black_height != actual {
        return Err(InvariantError::BlackHeight(id));
    }
    Ok(actual)
}
