//! The node type shared by every balancing strategy
use std::fmt;

use crate::utils::arena::NodeId;

/// Per-strategy data stored in every node, recomputed from the children by
/// [`Augment::pull`] whenever the subtree shape changes.
pub trait Augment: Copy + fmt::Debug {
    /// Recompute `self` from the augmentations of the left and right child.
    /// `None` stands for an empty subtree.
    fn pull(&mut self, children: [Option<Self>; 2]);
}

impl Augment for () {
    #[inline]
    fn pull(&mut self, _children: [Option<Self>; 2]) {}
}

/// A tree node.
///
/// `key` is `()` for positional trees, where the order is given by the
/// in-order rank alone.
pub struct Node<K, V, A> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// The number of nodes in the subtree rooted by `self`.
    pub(crate) size: usize,
    pub(crate) children: [Option<NodeId>; 2],
    /// The in-order sequence of this subtree is logically reversed, but
    /// `children` have not been swapped yet.
    pub(crate) reversed: bool,
    pub(crate) aug: A,
}

impl<K, V, A> Node<K, V, A> {
    pub(crate) const fn new(key: K, value: V, aug: A) -> Self {
        Self {
            key,
            value,
            size: 1,
            children: [None, None],
            reversed: false,
            aug,
        }
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    /// The number of nodes in this node's subtree.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The strategy-specific augmentation.
    #[inline]
    pub fn augmentation(&self) -> &A {
        &self.aug
    }
}

impl<K: fmt::Debug, V: fmt::Debug, A: fmt::Debug> fmt::Debug for Node<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("size", &self.size)
            .field("children", &self.children)
            .field("reversed", &self.reversed)
            .field("aug", &self.aug)
            .finish()
    }
}
