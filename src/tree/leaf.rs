//! Borrowed handle to a leaf counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{NodeId, NodeRef};

/// A `Copy` handle to a leaf counter.
///
/// Each leaf is meant to be written by exactly one thread. Sharing a leaf
/// between writers is memory safe but defeats the point of the tree.
///
/// # Examples
///
/// ```rust
/// use sommatori::tree::SumTree;
///
/// let mut tree = SumTree::new();
/// let id = tree.add_leaf();
/// let leaf = tree.leaf(id).unwrap();
///
/// leaf.increment();
/// leaf.increment();
/// assert_eq!(leaf.value(), 2);
/// ```
#[derive(Clone, Copy)]
pub struct LeafRef<'a> {
    node: NodeRef<'a>,
    value: &'a AtomicU64,
}

impl<'a> LeafRef<'a> {
    #[inline]
    pub(crate) fn new(node: NodeRef<'a>, value: &'a AtomicU64) -> Self {
        LeafRef { node, value }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Returns the generic node handle of this leaf.
    #[inline]
    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    /// Adds one to the counter and invalidates every ancestor.
    #[inline]
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Adds `n` to the counter and invalidates every ancestor.
    ///
    /// The add is ordered before the invalidations, so a reader that sees
    /// an ancestor invalid and recomputes will see the new value.
    #[inline]
    pub fn increment_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Release);
        self.node.invalidate_ancestors();
    }

    /// Returns the exact current value of the counter.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}

impl PartialEq for LeafRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for LeafRef<'_> {}

impl fmt::Debug for LeafRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SumTree;

    #[test]
    fn test_increment_value() {
        let mut tree = SumTree::new();
        let id = tree.add_leaf();
        let leaf = tree.leaf(id).unwrap();
        assert_eq!(leaf.value(), 0);
        leaf.increment();
        assert_eq!(leaf.value(), 1);
        leaf.increment();
        assert_eq!(leaf.value(), 2);
    }

    #[test]
    fn test_increment_by() {
        let mut tree = SumTree::new();
        let id = tree.add_leaf();
        let leaf = tree.leaf(id).unwrap();
        leaf.increment_by(10);
        leaf.increment_by(0);
        assert_eq!(leaf.value(), 10);
        assert_eq!(leaf.node().sum(), 10);
    }

    #[test]
    fn test_detached_leaf_increment() {
        let mut tree = SumTree::new();
        let id = tree.add_leaf();
        // No ancestors to invalidate.
        tree.leaf(id).unwrap().increment();
        assert_eq!(tree.leaf(id).unwrap().value(), 1);
    }

    #[test]
    fn test_increment_by_invalidates_ancestors() {
        let mut tree = SumTree::new();
        let root = tree.build_full_binary_tree(2).unwrap();
        let root = tree.node(root).unwrap();
        assert_eq!(root.sum(), 0);

        let leaf = root.all_leaves()[3];
        let parent = leaf.node().parent().unwrap();
        leaf.increment_by(2);
        assert!(!parent.is_cache_valid());
        assert!(!root.is_cache_valid());
        // The sibling subtree is untouched.
        assert!(root.child(0).unwrap().is_cache_valid());
    }

    #[test]
    fn test_multiple_threads() {
        let mut tree = SumTree::new();
        let root = tree.build_full_binary_tree(2).unwrap();
        let root = tree.node(root).unwrap();

        std::thread::scope(|s| {
            for leaf in root.all_leaves() {
                s.spawn(move || {
                    for _ in 0..100 {
                        leaf.increment();
                    }
                });
            }
        });

        assert_eq!(root.sum(), 400);
        for leaf in root.all_leaves() {
            assert_eq!(leaf.value(), 100);
        }
    }
}
