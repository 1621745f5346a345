//! Structural verification
use std::collections::{HashMap, HashSet};

use super::{Forest, Link, NodeId, Root, Strategy};

/// A broken tree invariant, as reported by [`Forest::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("node {node:?} records size {recorded} but its subtree holds {actual} nodes")]
    SizeMismatch {
        node: NodeId,
        recorded: usize,
        actual: usize,
    },
    #[error("node {0:?} is reachable more than once")]
    Shared(NodeId),
    #[error("the keys around node {0:?} are out of order")]
    Unordered(NodeId),
    #[error("node {node:?} has balance factor {factor}")]
    Unbalanced { node: NodeId, factor: i32 },
    #[error("node {node:?} records height {recorded} but its subtree is {actual} levels tall")]
    HeightMismatch {
        node: NodeId,
        recorded: usize,
        actual: usize,
    },
    #[error("red node {0:?} has a red child")]
    RedRed(NodeId),
    #[error("the paths below node {0:?} disagree on black height")]
    BlackHeight(NodeId),
    #[error("root {0:?} is red")]
    RedRoot(NodeId),
    #[error("node {0:?} has an inconsistent parent link")]
    Parent(NodeId),
    #[error("node {0:?} has a higher priority than its parent")]
    Heap(NodeId),
    #[error("root {0:?} still has a pending reversal")]
    PendingReversal(NodeId),
}

impl<S: Strategy, K, V> Forest<S, K, V> {
    /// Check the size bookkeeping, the ownership structure, and the
    /// strategy's balance invariant of `root`.
    ///
    /// Key ordering is not checked; see [`Forest::validate_ordered`].
    ///
    /// # Panics
    ///
    /// Panics if `root` was created by another forest.
    #[track_caller]
    pub fn validate(&self, root: &Root) -> Result<(), InvariantError> {
        let link = self.check(root);
        if let Some(id) = link {
            if self.node(id).reversed {
                return Err(InvariantError::PendingReversal(id));
            }
        }
        self.validate_sizes(link)?;
        S::check_balance(self, link)
    }

    /// Splay trees can be arbitrarily deep, so this walks the tree without
    /// recursion.
    fn validate_sizes(&self, link: Link) -> Result<(), InvariantError> {
        // Pre-order; every child is listed after its parent
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeId> = link.into_iter().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(InvariantError::Shared(id));
            }
            order.push(id);
            stack.extend(self.children(id).into_iter().flatten());
        }

        let mut sizes: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
        for &id in order.iter().rev() {
            let actual = 1 + self
                .children(id)
                .into_iter()
                .flatten()
                .map(|child| sizes[&child])
                .sum::<usize>();
            let recorded = self.node(id).size;
            if recorded != actual {
                return Err(InvariantError::SizeMismatch {
                    node: id,
                    recorded,
                    actual,
                });
            }
            sizes.insert(id, actual);
        }
        Ok(())
    }
}

impl<S: Strategy, K: Ord, V> Forest<S, K, V> {
    /// [`Forest::validate`], plus a check that the in-order keys are
    /// strictly increasing.
    #[track_caller]
    pub fn validate_ordered(&self, root: &Root) -> Result<(), InvariantError> {
        self.validate(root)?;

        // `validate` has ruled out cycles, so a plain in-order walk terminates.
        let mut previous: Option<NodeId> = None;
        let mut stack = Vec::new();
        let mut cursor = root.id();
        loop {
            while let Some(id) = cursor {
                stack.push(id);
                cursor = self.child(id, false);
            }
            let Some(id) = stack.pop() else {
                return Ok(());
            };
            if let Some(previous) = previous {
                if self.key(previous) >= self.key(id) {
                    return Err(InvariantError::Unordered(id));
                }
            }
            previous = Some(id);
            cursor = self.child(id, true);
        }
    }
}
