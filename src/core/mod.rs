//! Balancing engines and the split/merge algebra they share.
//!
//! A [`Forest`] owns the nodes. A tree is a [`Root`] handle into a forest.
//! Every structural operation consumes the roots it is given and hands back
//! the roots it produces, so a subtree is never reachable from two handles.
use std::{
    mem::take,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::utils::arena::Arena;

pub mod avl;
mod navigate;
mod node;
pub mod rbtree;
pub mod splay;
pub mod treap;
mod validate;

pub use self::{
    node::{Augment, Node},
    validate::InvariantError,
};
pub use crate::utils::arena::NodeId;

/// A possibly-empty subtree.
pub(crate) type Link = Option<NodeId>;

type IsRightChild = bool;

/// An owning handle to a (possibly empty) tree stored in a [`Forest`].
///
/// `Root` is deliberately not `Copy`: [`Forest::split`] and [`Forest::merge`]
/// consume it. A non-empty `Root` remembers the forest it was created by, and
/// every [`Forest`] method taking one panics if it is handed a root from
/// another forest. An empty `Root` belongs to every forest.
#[must_use = "a dropped `Root` keeps its nodes alive until the forest is dropped; use `Forest::dispose`"]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Root {
    link: Link,
    forest: ForestId,
}

impl Root {
    pub const EMPTY: Self = Self {
        link: None,
        forest: ForestId::NONE,
    };

    /// The root node, if the tree is not empty.
    #[inline]
    pub fn id(&self) -> Option<NodeId> {
        self.link
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.link.is_none()
    }
}

/// Identifies a [`Forest`] for the lifetime of the process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ForestId(u64);

impl ForestId {
    const NONE: Self = Self(0);

    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

mod sealed {
    pub trait Sealed {}

    /// A subtree handle passed between the engines. Unlike [`Root`], it is not
    /// tagged with its forest; [`Forest`] checks the tag before handing one
    /// to an engine.
    ///
    /// [`Root`]: super::Root
    /// [`Forest`]: super::Forest
    #[derive(Debug, Default)]
    pub struct Subtree(pub(crate) super::Link);

    impl Subtree {
        pub(crate) const EMPTY: Self = Self(None);
    }
}

use self::sealed::Subtree;

/// A balancing strategy.
///
/// All four strategies implement the same operation set, so the high-level
/// wrapper and the tests are written once and instantiated per strategy.
/// The provided methods express the positional operations through
/// [`Strategy::split_k`] and [`Strategy::merge`], and the access operations
/// through the read-only navigation of [`Forest`]. Engines override them
/// where they have something better.
pub trait Strategy: sealed::Sealed + Sized {
    /// The per-node balance metadata.
    type Aug: Augment;

    /// Create the augmentation of a newly allocated node.
    fn fresh(&mut self) -> Self::Aug;

    /// Concatenate two trees. Every element of `left` must precede every
    /// element of `right`.
    fn merge<K, V>(forest: &mut Forest<Self, K, V>, left: Subtree, right: Subtree) -> Subtree;

    /// Split off the first `k` elements. `k` is clamped to the tree size.
    fn split_k<K, V>(forest: &mut Forest<Self, K, V>, root: Subtree, k: usize) -> (Subtree, Subtree);

    /// Split into the elements less than `key` and the rest.
    fn split<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: Subtree, key: &K) -> (Subtree, Subtree) {
        let k = forest.rank_of(root.0, key);
        Self::split_k(forest, root, k)
    }

    /// Insert the detached node `node` by its key. If the key is already
    /// present, `node` is released and `false` is returned.
    fn insert<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, node: NodeId) -> bool;

    /// Detach the node with the given key.
    fn erase<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Option<NodeId>;

    /// Insert the detached node `node` so that it gets the rank `k`.
    fn insert_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize, node: NodeId) {
        let (left, right) = Self::split_k(forest, take(root), k);
        let left = Self::merge(forest, left, Subtree(Some(node)));
        *root = Self::merge(forest, left, right);
    }

    /// Detach the node of rank `k`.
    fn erase_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize) -> Option<NodeId> {
        if k >= forest.size_of(root.0) {
            return None;
        }
        let (left, rest) = Self::split_k(forest, take(root), k);
        let (mid, right) = Self::split_k(forest, rest, 1);
        *root = Self::merge(forest, left, right);
        mid.0
    }

    /// Append the detached node `node` after the last element.
    fn push_back<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, node: NodeId) {
        let k = forest.size_of(root.0);
        Self::insert_kth(forest, root, k, node);
    }

    /// Remove the closed rank range `[l, r]` and return it as its own tree.
    fn cut_subsegment<K, V>(
        forest: &mut Forest<Self, K, V>,
        root: &mut Subtree,
        l: usize,
        r: usize,
    ) -> Subtree {
        let (left, rest) = Self::split_k(forest, take(root), l);
        let (mid, right) = Self::split_k(forest, rest, r - l + 1);
        *root = Self::merge(forest, left, right);
        mid
    }

    /// Insert the tree `segment` so that its first element gets the rank `i`.
    fn insert_subsegment<K, V>(
        forest: &mut Forest<Self, K, V>,
        root: &mut Subtree,
        i: usize,
        segment: Subtree,
    ) {
        let (left, right) = Self::split_k(forest, take(root), i);
        let left = Self::merge(forest, left, segment);
        *root = Self::merge(forest, left, right);
    }

    fn get_kth<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, k: usize) -> Option<NodeId> {
        forest.kth(root.0, k)
    }

    fn find<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Option<NodeId> {
        forest.search(root.0, key)
    }

    fn get_min<K, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree) -> Option<NodeId> {
        forest.leftmost(root.0)
    }

    /// The number of keys strictly less than `key`.
    fn order_of_key<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> usize {
        forest.rank_of(root.0, key)
    }

    /// The node with the smallest key strictly greater than `key`.
    fn next<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Option<NodeId> {
        forest.successor_of(root.0, key)
    }

    /// The node with the largest key strictly less than `key`.
    fn prev<K: Ord, V>(forest: &mut Forest<Self, K, V>, root: &mut Subtree, key: &K) -> Option<NodeId> {
        forest.predecessor_of(root.0, key)
    }

    /// Check the strategy's balance invariant on the subtree `root`.
    fn check_balance<K, V>(forest: &Forest<Self, K, V>, root: Option<NodeId>) -> Result<(), InvariantError>;
}

/// Node storage shared by a tree and every subtree split off from it.
pub struct Forest<S: Strategy, K, V> {
    nodes: Arena<Node<K, V, S::Aug>>,
    strategy: S,
    id: ForestId,
}

impl<S: Strategy + Default, K, V> Default for Forest<S, K, V> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Strategy, K, V> Forest<S, K, V> {
    pub fn new(strategy: S) -> Self {
        Self {
            nodes: Arena::new(),
            strategy,
            id: ForestId::fresh(),
        }
    }

    #[inline]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The number of live nodes, summed over every tree in the forest.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node.
    #[inline]
    #[track_caller]
    pub fn node(&self, id: NodeId) -> &Node<K, V, S::Aug> {
        &self.nodes[id]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node<K, V, S::Aug>> {
        self.nodes.get(id)
    }

    #[inline]
    #[track_caller]
    pub fn value_mut(&mut self, id: NodeId) -> &mut V {
        &mut self.nodes[id].value
    }

    /// Create a one-element tree.
    pub fn singleton(&mut self, key: K, value: V) -> Root {
        let node = self.alloc(key, value);
        self.wrap(Subtree(Some(node)))
    }

    /// The number of elements in `root`.
    ///
    /// # Panics
    ///
    /// This and every other method taking a [`Root`] panic if `root` was
    /// created by another forest.
    #[inline]
    #[track_caller]
    pub fn size(&self, root: &Root) -> usize {
        self.size_of(self.check(root))
    }

    /// Insert `key`. Returns `false` (and drops `key` and `value`) if the key
    /// is already present.
    #[track_caller]
    pub fn insert(&mut self, root: &mut Root, key: K, value: V) -> bool
    where
        K: Ord,
    {
        let mut tree = self.claim(take(root));
        let node = self.alloc(key, value);
        let inserted = S::insert(self, &mut tree, node);
        *root = self.settle(tree);
        inserted
    }

    /// Remove `key` and return the removed pair.
    #[track_caller]
    pub fn erase(&mut self, root: &mut Root, key: &K) -> Option<(K, V)>
    where
        K: Ord,
    {
        let mut tree = self.claim(take(root));
        let removed = S::erase(self, &mut tree, key).map(|id| self.free(id));
        *root = self.settle(tree);
        removed
    }

    /// Insert an element at rank `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k > size`.
    #[track_caller]
    pub fn insert_kth(&mut self, root: &mut Root, k: usize, key: K, value: V) {
        let len = self.size(root);
        assert!(k <= len, "insertion rank (is {}) should be <= len (is {})", k, len);
        let mut tree = self.claim(take(root));
        let node = self.alloc(key, value);
        S::insert_kth(self, &mut tree, k, node);
        *root = self.settle(tree);
    }

    /// Append an element after the last one.
    #[track_caller]
    pub fn push_back(&mut self, root: &mut Root, key: K, value: V) {
        let mut tree = self.claim(take(root));
        let node = self.alloc(key, value);
        S::push_back(self, &mut tree, node);
        *root = self.settle(tree);
    }

    /// Remove the element of rank `k`. Returns `None` if `k >= size`.
    #[track_caller]
    pub fn erase_kth(&mut self, root: &mut Root, k: usize) -> Option<(K, V)> {
        let mut tree = self.claim(take(root));
        let removed = S::erase_kth(self, &mut tree, k).map(|id| self.free(id));
        *root = self.settle(tree);
        removed
    }

    #[track_caller]
    pub fn find(&mut self, root: &mut Root, key: &K) -> Option<NodeId>
    where
        K: Ord,
    {
        let mut tree = self.claim(take(root));
        let found = S::find(self, &mut tree, key);
        *root = self.settle(tree);
        found
    }

    #[track_caller]
    pub fn exists(&mut self, root: &mut Root, key: &K) -> bool
    where
        K: Ord,
    {
        self.find(root, key).is_some()
    }

    /// The element of rank `k` (0-based).
    #[track_caller]
    pub fn get_kth(&mut self, root: &mut Root, k: usize) -> Option<NodeId> {
        let mut tree = self.claim(take(root));
        let found = S::get_kth(self, &mut tree, k);
        *root = self.settle(tree);
        found
    }

    #[track_caller]
    pub fn get_min(&mut self, root: &mut Root) -> Option<NodeId> {
        let mut tree = self.claim(take(root));
        let found = S::get_min(self, &mut tree);
        *root = self.settle(tree);
        found
    }

    /// The number of keys strictly less than `key`.
    #[track_caller]
    pub fn order_of_key(&mut self, root: &mut Root, key: &K) -> usize
    where
        K: Ord,
    {
        let mut tree = self.claim(take(root));
        let rank = S::order_of_key(self, &mut tree, key);
        *root = self.settle(tree);
        rank
    }

    #[track_caller]
    pub fn next(&mut self, root: &mut Root, key: &K) -> Option<NodeId>
    where
        K: Ord,
    {
        let mut tree = self.claim(take(root));
        let found = S::next(self, &mut tree, key);
        *root = self.settle(tree);
        found
    }

    #[track_caller]
    pub fn prev(&mut self, root: &mut Root, key: &K) -> Option<NodeId>
    where
        K: Ord,
    {
        let mut tree = self.claim(take(root));
        let found = S::prev(self, &mut tree, key);
        *root = self.settle(tree);
        found
    }

    /// The nodes of `root` in order.
    #[track_caller]
    pub fn traversal(&mut self, root: &Root) -> Vec<NodeId> {
        let link = self.check(root);
        self.in_order(link)
    }

    /// Split into the elements less than `key` and the rest.
    #[track_caller]
    pub fn split(&mut self, root: Root, key: &K) -> (Root, Root)
    where
        K: Ord,
    {
        let tree = self.claim(root);
        log::debug!("split by key ({} elements)", self.size_of(tree.0));
        let (left, right) = S::split(self, tree, key);
        (self.settle(left), self.settle(right))
    }

    /// Split off the first `k` elements.
    #[track_caller]
    pub fn split_k(&mut self, root: Root, k: usize) -> (Root, Root) {
        let tree = self.claim(root);
        log::debug!("split at rank {} ({} elements)", k, self.size_of(tree.0));
        let (left, right) = S::split_k(self, tree, k);
        (self.settle(left), self.settle(right))
    }

    /// Concatenate two trees. Every element of `left` must precede every
    /// element of `right`; this is not checked.
    #[track_caller]
    pub fn merge(&mut self, left: Root, right: Root) -> Root {
        let (left, right) = (self.claim(left), self.claim(right));
        log::debug!(
            "merge ({} + {} elements)",
            self.size_of(left.0),
            self.size_of(right.0)
        );
        let tree = S::merge(self, left, right);
        self.settle(tree)
    }

    /// Remove the closed rank range `[l, r]` from `root` and return it as a
    /// separate tree.
    ///
    /// # Panics
    ///
    /// Panics unless `l <= r < size`.
    #[track_caller]
    pub fn cut_subsegment(&mut self, root: &mut Root, l: usize, r: usize) -> Root {
        let len = self.size(root);
        assert!(
            l <= r && r < len,
            "segment [{}, {}] is out of range for length {}",
            l,
            r,
            len
        );
        let mut tree = self.claim(take(root));
        log::debug!("cut [{}, {}] out of {} elements", l, r, len);
        let segment = S::cut_subsegment(self, &mut tree, l, r);
        *root = self.settle(tree);
        self.settle(segment)
    }

    /// Insert the tree `segment` into `root` so that its first element gets
    /// the rank `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i > size`.
    #[track_caller]
    pub fn insert_subsegment(&mut self, root: &mut Root, i: usize, segment: Root) {
        let len = self.size(root);
        assert!(i <= len, "insertion rank (is {}) should be <= len (is {})", i, len);
        let segment = self.claim(segment);
        let mut tree = self.claim(take(root));
        log::debug!(
            "insert {} elements at rank {} of {}",
            self.size_of(segment.0),
            i,
            len
        );
        S::insert_subsegment(self, &mut tree, i, segment);
        *root = self.settle(tree);
    }

    /// Release every node of `root`.
    #[track_caller]
    pub fn dispose(&mut self, root: Root) {
        let mut stack: Vec<NodeId> = self.claim(root).0.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.nodes.remove(id);
            stack.extend(node.children.into_iter().flatten());
        }
    }

    /// Unwrap a root handed in by the caller.
    #[track_caller]
    fn claim(&self, root: Root) -> Subtree {
        Subtree(self.check(&root))
    }

    #[inline]
    #[track_caller]
    pub(crate) fn check(&self, root: &Root) -> Link {
        assert!(
            root.link.is_none() || root.forest == self.id,
            "root {:?} belongs to another forest",
            root.link
        );
        root.link
    }

    #[inline]
    fn wrap(&self, tree: Subtree) -> Root {
        Root {
            link: tree.0,
            forest: if tree.0.is_some() { self.id } else { ForestId::NONE },
        }
    }

    /// Hand a tree back to the caller with no reversal pending on its root.
    #[inline]
    fn settle(&mut self, tree: Subtree) -> Root {
        if let Some(id) = tree.0 {
            self.push(id);
        }
        self.wrap(tree)
    }
}

impl<S: Strategy, V> Forest<S, (), V> {
    /// Reverse the in-order sequence of `root`. O(1): the root's flag is
    /// pushed to its children immediately, so a root held by the caller never
    /// carries a pending reversal ([`Forest::validate`] reports one as
    /// [`InvariantError::PendingReversal`]). Deeper nodes are swapped lazily
    /// as the tree is descended into.
    ///
    /// Only positional trees can be reversed; reversing a keyed tree would
    /// break its key order.
    #[track_caller]
    pub fn reverse(&mut self, root: &Root) {
        if let Some(id) = self.check(root) {
            let node = &mut self.nodes[id];
            node.reversed = !node.reversed;
            self.push(id);
        }
    }
}

// Primitives used by the engines
// -----------------------------------------------------------------------------

impl<S: Strategy, K, V> Forest<S, K, V> {
    pub(crate) fn alloc(&mut self, key: K, value: V) -> NodeId {
        let aug = self.strategy.fresh();
        self.nodes.insert(Node::new(key, value, aug))
    }

    /// Release a detached node.
    pub(crate) fn free(&mut self, id: NodeId) -> (K, V) {
        let node = self.nodes.remove(id);
        debug_assert_eq!(node.children, [None, None], "freeing an attached node");
        (node.key, node.value)
    }

    #[inline]
    pub(crate) fn child(&self, id: NodeId, side: IsRightChild) -> Link {
        self.nodes[id].children[side as usize]
    }

    #[inline]
    pub(crate) fn set_child(&mut self, id: NodeId, side: IsRightChild, child: Link) {
        self.nodes[id].children[side as usize] = child;
    }

    #[inline]
    pub(crate) fn children(&self, id: NodeId) -> [Link; 2] {
        self.nodes[id].children
    }

    #[inline]
    pub(crate) fn set_children(&mut self, id: NodeId, children: [Link; 2]) {
        self.nodes[id].children = children;
    }

    #[inline]
    pub(crate) fn size_of(&self, link: Link) -> usize {
        link.map_or(0, |id| self.nodes[id].size)
    }

    #[inline]
    pub(crate) fn aug(&self, id: NodeId) -> S::Aug {
        self.nodes[id].aug
    }

    #[inline]
    pub(crate) fn aug_mut(&mut self, id: NodeId) -> &mut S::Aug {
        &mut self.nodes[id].aug
    }

    #[inline]
    pub(crate) fn key(&self, id: NodeId) -> &K {
        &self.nodes[id].key
    }

    /// Flush a pending reversal of `id` to its children. Must be called
    /// before `id`'s children are read.
    #[inline]
    pub(crate) fn push(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        if !node.reversed {
            return;
        }
        node.reversed = false;
        node.children.swap(0, 1);
        let children = node.children;
        for child in children.into_iter().flatten() {
            let child = &mut self.nodes[child];
            child.reversed = !child.reversed;
        }
    }

    /// Recompute the size and the augmentation of `id` from its children.
    #[inline]
    pub(crate) fn update(&mut self, id: NodeId) {
        let children = self.nodes[id].children;
        let size = 1 + self.size_of(children[0]) + self.size_of(children[1]);
        let augs = children.map(|child| child.map(|child| self.nodes[child].aug));
        let node = &mut self.nodes[id];
        node.size = size;
        node.aug.pull(augs);
    }

    /// Rotate a node and return the subtree's new root. `dir` specifies
    /// `node`'s position after rotation.
    ///
    /// Parent links are not touched.
    pub(crate) fn rotate(&mut self, node: NodeId, dir: IsRightChild) -> NodeId {
        //          node            new_root
        //          /  \            /  \
        //         /    \          /    \
        //  new_root    y   ==>   x     node
        //    /  \                      /  \
        //   x  mid                    mid  y
        self.push(node);
        let new_root = self
            .child(node, !dir)
            .expect("post-rotation root does not exist");
        self.push(new_root);
        let mid = self.child(new_root, dir);
        self.set_child(node, !dir, mid);
        self.set_child(new_root, dir, Some(node));
        self.update(node);
        self.update(new_root);
        new_root
    }
}
