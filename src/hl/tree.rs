//! Provides an owning ordered map / sequence over any balancing strategy.
use std::{fmt, mem::take};

use crate::core::{
    avl::Avl, rbtree::RedBlack, splay::Splay, treap::Treap, Forest, InvariantError, Node, Root,
    Strategy,
};

#[cfg(test)]
mod tests;

/// A balanced binary search tree that owns its nodes.
///
/// `Tree` is used in two shapes:
///
///  - Keyed (`K: Ord`): an ordered map with order statistics. See
///    [`Tree::insert`] and friends.
///  - Positional (`K = ()`): a sequence indexed by rank, with O(log n) range
///    extraction, reinsertion, and reversal. See [`Tree::insert_kth`].
///
/// Segments removed by [`Tree::cut_subsegment`] and [`Tree::split_off_kth`]
/// stay in this tree's node storage as detached [`Root`]s until they are put
/// back with [`Tree::insert_subsegment`] / [`Tree::append`] or released with
/// [`Tree::dispose`].
///
/// Access methods take `&mut self` because the splay strategy restructures
/// the tree on every access.
pub struct Tree<S: Strategy, K, V> {
    forest: Forest<S, K, V>,
    root: Root,
}

/// An AVL tree map.
pub type AvlMap<K, V> = Tree<Avl, K, V>;
/// An AVL tree set.
pub type AvlSet<K> = Tree<Avl, K, ()>;
/// An AVL tree sequence.
pub type AvlSeq<V> = Tree<Avl, (), V>;

/// A red-black tree map.
pub type RbMap<K, V> = Tree<RedBlack, K, V>;
/// A red-black tree set.
pub type RbSet<K> = Tree<RedBlack, K, ()>;
/// A red-black tree sequence.
pub type RbSeq<V> = Tree<RedBlack, (), V>;

/// A splay tree map.
pub type SplayMap<K, V> = Tree<Splay, K, V>;
/// A splay tree set.
pub type SplaySet<K> = Tree<Splay, K, ()>;
/// A splay tree sequence.
pub type SplaySeq<V> = Tree<Splay, (), V>;

/// A treap map.
pub type TreapMap<K, V> = Tree<Treap, K, V>;
/// A treap set.
pub type TreapSet<K> = Tree<Treap, K, ()>;
/// A treap sequence.
pub type TreapSeq<V> = Tree<Treap, (), V>;

impl<S: Strategy + Default, K, V> Default for Tree<S, K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Strategy + Default, K, V> Tree<S, K, V> {
    pub fn new() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<S: Strategy, K: fmt::Debug, V: fmt::Debug> fmt::Debug for Tree<S, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("len", &self.len())
            .field("root", &self.root.id())
            .finish()
    }
}

/// Convert a node reference to a pair of references.
#[inline]
fn entry<K, V, A>(node: &Node<K, V, A>) -> (&K, &V) {
    (node.key(), node.value())
}

impl<S: Strategy, K, V> Tree<S, K, V> {
    /// Construct an empty tree using the given strategy value.
    ///
    /// ```
    /// use splitmerge::{hl::TreapMap, Treap};
    /// let mut map = TreapMap::with_strategy(Treap::seed_from_u64(1));
    /// map.insert("a", 1);
    /// assert_eq!(map.find(&"a"), Some((&"a", &1)));
    /// ```
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            forest: Forest::new(strategy),
            root: Root::EMPTY,
        }
    }

    /// The number of elements in the tree. Detached segments are not counted.
    #[inline]
    pub fn len(&self) -> usize {
        self.forest.size(&self.root)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The node storage, shared with every detached segment.
    #[inline]
    pub fn forest(&self) -> &Forest<S, K, V> {
        &self.forest
    }

    #[inline]
    pub fn forest_mut(&mut self) -> &mut Forest<S, K, V> {
        &mut self.forest
    }

    #[inline]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Get the element of rank `k` (0-based).
    pub fn get_kth(&mut self, k: usize) -> Option<(&K, &V)> {
        let id = self.forest.get_kth(&mut self.root, k)?;
        Some(entry(self.forest.node(id)))
    }

    pub fn get_kth_mut(&mut self, k: usize) -> Option<&mut V> {
        let id = self.forest.get_kth(&mut self.root, k)?;
        Some(self.forest.value_mut(id))
    }

    /// Get the first element.
    pub fn get_min(&mut self) -> Option<(&K, &V)> {
        let id = self.forest.get_min(&mut self.root)?;
        Some(entry(self.forest.node(id)))
    }

    /// Remove the element of rank `k`. Returns `None` if `k >= len`.
    pub fn erase_kth(&mut self, k: usize) -> Option<(K, V)> {
        self.forest.erase_kth(&mut self.root, k)
    }

    /// The nodes in order.
    pub fn get_traversal(&mut self) -> Vec<&Node<K, V, S::Aug>> {
        let ids = self.forest.traversal(&self.root);
        ids.into_iter().map(|id| self.forest.node(id)).collect()
    }

    /// Iterate over the elements in order.
    pub fn iter(&mut self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let ids = self.forest.traversal(&self.root);
        let forest = &self.forest;
        ids.into_iter().map(move |id| entry(forest.node(id)))
    }

    /// Remove the closed rank range `[l, r]` and return it as a detached
    /// segment.
    ///
    /// # Panics
    ///
    /// Panics unless `l <= r < len`.
    #[track_caller]
    pub fn cut_subsegment(&mut self, l: usize, r: usize) -> Root {
        self.forest.cut_subsegment(&mut self.root, l, r)
    }

    /// Insert a detached segment so that its first element gets the rank `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i > len` or if `segment` was not detached from this tree.
    #[track_caller]
    pub fn insert_subsegment(&mut self, i: usize, segment: Root) {
        self.forest.insert_subsegment(&mut self.root, i, segment);
    }

    /// Detach the elements of rank `k` and above.
    pub fn split_off_kth(&mut self, k: usize) -> Root {
        let (left, right) = self.forest.split_k(take(&mut self.root), k);
        self.root = left;
        right
    }

    /// Append a detached segment after the last element.
    ///
    /// # Panics
    ///
    /// Panics if `segment` was not detached from this tree.
    #[track_caller]
    pub fn append(&mut self, segment: Root) {
        self.root = self.forest.merge(take(&mut self.root), segment);
    }

    /// The number of elements in a detached segment.
    #[inline]
    pub fn segment_len(&self, segment: &Root) -> usize {
        self.forest.size(segment)
    }

    /// Release a detached segment.
    #[track_caller]
    pub fn dispose(&mut self, segment: Root) {
        self.forest.dispose(segment);
    }

    /// Check every structural invariant except key ordering.
    pub fn validate(&self) -> Result<(), InvariantError> {
        self.forest.validate(&self.root)
    }
}

impl<S: Strategy, K: Ord, V> Tree<S, K, V> {
    /// Insert a key-value pair. Returns `false` and drops `key` and `value`
    /// if `key` is already present.
    ///
    /// ```
    /// use splitmerge::hl::AvlMap;
    /// let mut map = AvlMap::new();
    /// assert!(map.insert(1, "first"));
    /// assert!(!map.insert(1, "second"));
    /// assert_eq!(map.find(&1), Some((&1, &"first")));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.forest.insert(&mut self.root, key, value)
    }

    /// Remove `key` and return the removed pair.
    pub fn erase(&mut self, key: &K) -> Option<(K, V)> {
        self.forest.erase(&mut self.root, key)
    }

    pub fn find(&mut self, key: &K) -> Option<(&K, &V)> {
        let id = self.forest.find(&mut self.root, key)?;
        Some(entry(self.forest.node(id)))
    }

    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.forest.find(&mut self.root, key)?;
        Some(self.forest.value_mut(id))
    }

    pub fn exists(&mut self, key: &K) -> bool {
        self.forest.exists(&mut self.root, key)
    }

    /// The number of keys strictly less than `key`.
    pub fn order_of_key(&mut self, key: &K) -> usize {
        self.forest.order_of_key(&mut self.root, key)
    }

    /// The element with the smallest key strictly greater than `key`.
    pub fn next(&mut self, key: &K) -> Option<(&K, &V)> {
        let id = self.forest.next(&mut self.root, key)?;
        Some(entry(self.forest.node(id)))
    }

    /// The element with the largest key strictly less than `key`.
    pub fn prev(&mut self, key: &K) -> Option<(&K, &V)> {
        let id = self.forest.prev(&mut self.root, key)?;
        Some(entry(self.forest.node(id)))
    }

    /// Detach the elements whose keys are greater than or equal to `key`.
    pub fn split_off(&mut self, key: &K) -> Root {
        let (left, right) = self.forest.split(take(&mut self.root), key);
        self.root = left;
        right
    }

    /// [`Tree::validate`], plus a check that the keys are strictly increasing.
    pub fn validate_ordered(&self) -> Result<(), InvariantError> {
        self.forest.validate_ordered(&self.root)
    }
}

impl<S: Strategy, V> Tree<S, (), V> {
    /// Insert `value` at rank `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k > len`.
    ///
    /// ```
    /// use splitmerge::hl::RbSeq;
    /// let mut seq = RbSeq::new();
    /// seq.insert_kth(0, 'b');
    /// seq.insert_kth(0, 'a');
    /// seq.insert_kth(2, 'c');
    /// assert_eq!(seq.iter().map(|(_, &c)| c).collect::<String>(), "abc");
    /// ```
    #[track_caller]
    pub fn insert_kth(&mut self, k: usize, value: V) {
        self.forest.insert_kth(&mut self.root, k, (), value);
    }

    /// Append `value`.
    pub fn push_back(&mut self, value: V) {
        self.forest.push_back(&mut self.root, (), value);
    }

    /// Reverse the whole sequence.
    ///
    /// ```
    /// use splitmerge::hl::AvlSeq;
    /// let mut seq: AvlSeq<i32> = (0..4).collect();
    /// seq.reverse();
    /// assert_eq!(seq.iter().map(|(_, &v)| v).collect::<Vec<_>>(), [3, 2, 1, 0]);
    /// ```
    ///
    /// Keyed trees cannot be reversed:
    ///
    /// ```compile_fail
    /// use splitmerge::hl::AvlMap;
    /// let mut map: AvlMap<i32, ()> = AvlMap::new();
    /// map.reverse();
    /// ```
    pub fn reverse(&mut self) {
        self.forest.reverse(&self.root);
    }

    /// Reverse the closed rank range `[l, r]`.
    ///
    /// # Panics
    ///
    /// Panics unless `l <= r < len`.
    #[track_caller]
    pub fn reverse_range(&mut self, l: usize, r: usize) {
        let segment = self.cut_subsegment(l, r);
        self.forest.reverse(&segment);
        self.insert_subsegment(l, segment);
    }
}

impl<S: Strategy + Default, V> FromIterator<V> for Tree<S, (), V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut this = Self::new();
        for value in iter {
            this.push_back(value);
        }
        this
    }
}

impl<S: Strategy, K: Ord, V> Extend<(K, V)> for Tree<S, K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
