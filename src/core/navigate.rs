//! Read-only traversal shared by all strategies.
//!
//! "Read-only" refers to the tree shape: every step flushes pending
//! reversals with [`Forest::push`] before it looks at a node's children.
use std::cmp::Ordering;

use super::{Forest, Link, NodeId, Strategy};

impl<S: Strategy, K, V> Forest<S, K, V> {
    /// Find the node of rank `k` in the subtree `link`.
    pub(crate) fn kth(&mut self, mut link: Link, mut k: usize) -> Link {
        while let Some(id) = link {
            self.push(id);
            let [left, right] = self.children(id);
            let left_size = self.size_of(left);
            match k.cmp(&left_size) {
                Ordering::Equal => return Some(id),
                Ordering::Less => link = left,
                Ordering::Greater => {
                    k -= left_size + 1;
                    link = right;
                }
            }
        }
        None
    }

    /// Find the minimum (leftmost) node in the subtree `link`.
    pub(crate) fn leftmost(&mut self, link: Link) -> Link {
        self.extreme(link, false)
    }

    /// Find the maximum (rightmost) node in the subtree `link`.
    pub(crate) fn rightmost(&mut self, link: Link) -> Link {
        self.extreme(link, true)
    }

    fn extreme(&mut self, link: Link, side: bool) -> Link {
        let mut node = link?;
        loop {
            self.push(node);
            match self.child(node, side) {
                Some(child) => node = child,
                None => return Some(node),
            }
        }
    }

    /// Collect the nodes of the subtree `link` in order.
    pub(crate) fn in_order(&mut self, link: Link) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.size_of(link));
        let mut stack = Vec::new();
        let mut cursor = link;
        loop {
            while let Some(id) = cursor {
                self.push(id);
                stack.push(id);
                cursor = self.child(id, false);
            }
            let Some(id) = stack.pop() else {
                return out;
            };
            out.push(id);
            cursor = self.child(id, true);
        }
    }
}

impl<S: Strategy, K: Ord, V> Forest<S, K, V> {
    pub(crate) fn search(&mut self, mut link: Link, key: &K) -> Link {
        while let Some(id) = link {
            self.push(id);
            link = match key.cmp(self.key(id)) {
                Ordering::Equal => return Some(id),
                Ordering::Less => self.child(id, false),
                Ordering::Greater => self.child(id, true),
            };
        }
        None
    }

    /// Count the keys strictly less than `key`.
    pub(crate) fn rank_of(&mut self, link: Link, key: &K) -> usize {
        self.count_while(link, |_, k| k < key)
    }

    /// Count the keys strictly less than the key of `node`, which is usually
    /// a detached node about to be inserted.
    pub(crate) fn rank_of_node(&mut self, link: Link, node: NodeId) -> usize {
        self.count_while(link, |forest, k| k < forest.key(node))
    }

    /// Count the keys less than or equal to `key`.
    pub(crate) fn rank_after(&mut self, link: Link, key: &K) -> usize {
        self.count_while(link, |_, k| k <= key)
    }

    /// Count the nodes of the prefix whose keys satisfy `pred`, which must
    /// hold for a (possibly empty) prefix of the in-order sequence.
    fn count_while(&mut self, mut link: Link, mut pred: impl FnMut(&Self, &K) -> bool) -> usize {
        let mut rank = 0;
        while let Some(id) = link {
            self.push(id);
            let [left, right] = self.children(id);
            if pred(self, self.key(id)) {
                rank += self.size_of(left) + 1;
                link = right;
            } else {
                link = left;
            }
        }
        rank
    }

    /// The node with the smallest key strictly greater than `key`.
    pub(crate) fn successor_of(&mut self, mut link: Link, key: &K) -> Link {
        let mut found = None;
        while let Some(id) = link {
            self.push(id);
            if self.key(id) > key {
                found = Some(id);
                link = self.child(id, false);
            } else {
                link = self.child(id, true);
            }
        }
        found
    }

    /// The node with the largest key strictly less than `key`.
    pub(crate) fn predecessor_of(&mut self, mut link: Link, key: &K) -> Link {
        let mut found = None;
        while let Some(id) = link {
            self.push(id);
            if self.key(id) < key {
                found = Some(id);
                link = self.child(id, true);
            } else {
                link = self.child(id, false);
            }
        }
        found
    }
}
