//! Borrowed handle to any node of a [`SumTree`].

use std::fmt;
use std::sync::atomic::Ordering;

use tracing::trace;

use super::cache::{Lookup, Ticket};
use super::{LeafRef, NodeId, NodeKind, Slot, SumTree};
use crate::error::{Result, TreeError};

/// An internal node whose cache is being recomputed by [`NodeRef::sum`].
#[derive(Clone, Copy)]
struct Repair<'a> {
    node: NodeRef<'a>,
    ticket: Ticket,
    /// Index of the next child to visit.
    next: usize,
    /// Sum of the children visited so far.
    acc: u64,
}

impl<'a> Repair<'a> {
    fn new(node: NodeRef<'a>, ticket: Ticket) -> Self {
        Repair {
            node,
            ticket,
            next: 0,
            acc: 0,
        }
    }
}

/// A `Copy` handle to a node, internal or leaf.
///
/// Obtained from [`SumTree::node`]; the id is known to be valid for the
/// borrowed tree.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a SumTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    #[inline]
    pub(crate) fn new(tree: &'a SumTree, id: NodeId) -> Self {
        NodeRef { tree, id }
    }

    #[inline]
    fn slot(&self) -> &'a Slot {
        self.tree.slot_unchecked(self.id)
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the tree this node belongs to.
    #[inline]
    pub fn tree(&self) -> &'a SumTree {
        self.tree
    }

    /// Returns `true` if this node is a leaf counter.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.slot().is_leaf()
    }

    /// Returns this node as a leaf handle, if it is one.
    #[inline]
    pub fn as_leaf(&self) -> Option<LeafRef<'a>> {
        match &self.slot().kind {
            NodeKind::Leaf { value } => Some(LeafRef::new(*self, value)),
            NodeKind::Internal { .. } => None,
        }
    }

    /// Returns the parent, or `None` for a root.
    #[inline]
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.slot().parent.map(|id| NodeRef::new(self.tree, id))
    }

    #[inline]
    pub fn num_children(&self) -> usize {
        self.slot().children.len()
    }

    /// Returns the child in slot `index`, in attachment order.
    ///
    /// # Errors
    ///
    /// [`TreeError::IndexOutOfRange`] if the slot is not occupied.
    pub fn child(&self, index: usize) -> Result<NodeRef<'a>> {
        let children = &self.slot().children;
        children
            .get(index)
            .map(|&id| NodeRef::new(self.tree, id))
            .ok_or(TreeError::IndexOutOfRange {
                node: self.id,
                index,
                len: children.len(),
            })
    }

    /// Iterates over the children in attachment order.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.slot()
            .children
            .iter()
            .map(move |&id| NodeRef::new(tree, id))
    }

    /// Returns the sum of every leaf under this node.
    ///
    /// A leaf returns its exact value. An internal node with a valid cache
    /// returns the memoized sum without side effects; otherwise it sums its
    /// children (repairing their caches on the way), memoizes the result
    /// and returns it.
    ///
    /// Never blocks. Concurrent increments may or may not be included, but
    /// an increment that completed before an invalidation observed here is
    /// never dropped and nothing is counted twice.
    pub fn sum(&self) -> u64 {
        let ticket = match self.lookup() {
            Ok(sum) => return sum,
            Err(ticket) => ticket,
        };

        // Post-order walk: a frame is published once all its children are summed.
        let mut stack = vec![Repair::new(*self, ticket)];
        loop {
            let Some(top) = stack.last_mut() else {
                return 0;
            };
            let children = &top.node.slot().children;
            if let Some(&child) = children.get(top.next) {
                top.next += 1;
                let child = NodeRef::new(self.tree, child);
                match child.lookup() {
                    Ok(sum) => top.acc = top.acc.wrapping_add(sum),
                    Err(ticket) => stack.push(Repair::new(child, ticket)),
                }
                continue;
            }

            let Repair { node, ticket, acc, .. } = *top;
            stack.pop();
            node.publish(ticket, acc);
            match stack.last_mut() {
                Some(parent) => parent.acc = parent.acc.wrapping_add(acc),
                None => return acc,
            }
        }
    }

    /// Exact value of a leaf or a valid cache, otherwise a repair ticket.
    #[inline]
    fn lookup(&self) -> std::result::Result<u64, Ticket> {
        match &self.slot().kind {
            NodeKind::Leaf { value } => Ok(value.load(Ordering::Acquire)),
            NodeKind::Internal { cache } => match cache.lookup() {
                Lookup::Hit(sum) => Ok(sum),
                Lookup::Miss(ticket) => Err(ticket),
            },
        }
    }

    fn publish(&self, ticket: Ticket, sum: u64) {
        if let NodeKind::Internal { cache } = &self.slot().kind {
            if cache.publish(ticket, sum) {
                trace!(node = %self.id, sum, "cache repaired");
            } else {
                trace!(node = %self.id, sum, "cache repair not published");
            }
        }
    }

    /// Collects every leaf under this node (itself included, if a leaf),
    /// depth-first in attachment order.
    ///
    /// Reads topology only, so it is safe to call during increments.
    pub fn all_leaves(&self) -> Vec<LeafRef<'a>> {
        let mut leaves = Vec::new();
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            if let Some(leaf) = node.as_leaf() {
                leaves.push(leaf);
            }
            let children = &node.slot().children;
            stack.extend(children.iter().rev().map(|&id| NodeRef::new(self.tree, id)));
        }
        leaves
    }

    /// Invalidates this node and every internal node below it.
    ///
    /// Forces the next [`sum`](Self::sum) to recompute the whole subtree.
    pub fn invalidate_descendants(&self) {
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            node.invalidate_cache();
            stack.extend(node.children());
        }
    }

    /// Invalidates every strict ancestor, walking parent links to the root.
    pub fn invalidate_ancestors(&self) {
        let mut ancestor = self.parent();
        while let Some(node) = ancestor {
            node.invalidate_cache();
            ancestor = node.parent();
        }
    }

    /// Marks this node's cache invalid. No-op on a leaf.
    #[inline]
    pub(crate) fn invalidate_cache(&self) {
        if let NodeKind::Internal { cache } = &self.slot().kind {
            cache.invalidate();
        }
    }

    /// Marks this node's cache valid without recomputing. No-op on a leaf.
    #[inline]
    pub(crate) fn validate_cache(&self) {
        if let NodeKind::Internal { cache } = &self.slot().kind {
            cache.validate();
        }
    }

    /// A leaf has no cache and always reports valid.
    #[inline]
    pub(crate) fn is_cache_valid(&self) -> bool {
        match &self.slot().kind {
            NodeKind::Leaf { .. } => true,
            NodeKind::Internal { cache } => cache.is_valid(),
        }
    }

    /// The memoized sum as stored, without repair. A leaf reports its value.
    #[inline]
    pub(crate) fn cached_sum(&self) -> u64 {
        match &self.slot().kind {
            NodeKind::Leaf { value } => value.load(Ordering::Acquire),
            NodeKind::Internal { cache } => cache.cached_sum(),
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_leaf() { "leaf" } else { "node" };
        write!(f, "{}{}{{ {} }}", kind, self.id, self.cached_sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// grandparent -> parent -> leaf
    fn chain() -> (SumTree, NodeId, NodeId, NodeId) {
        let mut tree = SumTree::new();
        let grandparent = tree.add_node();
        let parent = tree.add_node();
        let leaf = tree.add_leaf();
        tree.add_child(parent, leaf).unwrap();
        tree.add_child(grandparent, parent).unwrap();
        (tree, grandparent, parent, leaf)
    }

    #[test]
    fn test_construction() {
        let mut tree = SumTree::new();
        let id = tree.add_node();
        let node = tree.node(id).unwrap();
        assert!(node.is_cache_valid());
        assert_eq!(node.cached_sum(), 0);
        assert_eq!(node.sum(), 0);
        assert_eq!(node.num_children(), 0);
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_validation_toggle() {
        let mut tree = SumTree::new();
        let id = tree.add_node();
        let node = tree.node(id).unwrap();
        node.validate_cache();
        assert!(node.is_cache_valid());
        node.invalidate_cache();
        assert!(!node.is_cache_valid());
        node.validate_cache();
        assert!(node.is_cache_valid());
    }

    #[test]
    fn test_sum_of_leaves() {
        let mut tree = SumTree::new();
        let parent = tree.add_node();
        let c0 = tree.add_leaf();
        let c1 = tree.add_leaf();
        tree.add_child(parent, c0).unwrap();
        tree.add_child(parent, c1).unwrap();

        tree.leaf(c0).unwrap().increment();
        tree.leaf(c1).unwrap().increment();
        tree.leaf(c1).unwrap().increment();

        let parent = tree.node(parent).unwrap();
        assert_eq!(parent.sum(), 3);
        assert!(parent.is_cache_valid());
        assert_eq!(parent.cached_sum(), 3);
    }

    #[test]
    fn test_increment_invalidates_ancestors() {
        let (tree, grandparent, parent, leaf) = chain();
        let grandparent = tree.node(grandparent).unwrap();
        let parent = tree.node(parent).unwrap();

        assert_eq!(grandparent.sum(), 0);
        assert!(grandparent.is_cache_valid());
        assert!(parent.is_cache_valid());

        tree.leaf(leaf).unwrap().increment();
        assert!(!grandparent.is_cache_valid());
        assert!(!parent.is_cache_valid());

        assert_eq!(grandparent.sum(), 1);
        assert!(grandparent.is_cache_valid());
        assert!(parent.is_cache_valid());
    }

    #[test]
    fn test_invalidate_descendants() {
        let (tree, grandparent, parent, _) = chain();
        let grandparent = tree.node(grandparent).unwrap();
        let parent = tree.node(parent).unwrap();

        assert_eq!(grandparent.sum(), 0);
        assert!(grandparent.is_cache_valid());
        assert!(parent.is_cache_valid());

        grandparent.invalidate_descendants();
        assert!(!grandparent.is_cache_valid());
        assert!(!parent.is_cache_valid());
    }

    #[test]
    fn test_invalidate_descendants_then_same_total() {
        let mut tree = SumTree::new();
        let root = tree.build_full_binary_tree(3).unwrap();
        let root = tree.node(root).unwrap();
        for (i, leaf) in root.all_leaves().iter().enumerate() {
            leaf.increment_by(i as u64);
        }
        let before = root.sum();
        assert_eq!(before, 28);

        root.invalidate_descendants();
        assert!(tree.nodes().filter(|n| !n.is_leaf()).all(|n| !n.is_cache_valid()));
        assert_eq!(root.sum(), before);
        assert!(tree.nodes().all(|n| n.is_cache_valid()));
    }

    #[test]
    fn test_invalidate_ancestors_excludes_self() {
        let (tree, grandparent, parent, _) = chain();
        let grandparent = tree.node(grandparent).unwrap();
        let parent = tree.node(parent).unwrap();
        assert_eq!(grandparent.sum(), 0);

        parent.invalidate_ancestors();
        assert!(parent.is_cache_valid());
        assert!(!grandparent.is_cache_valid());
    }

    #[test]
    fn test_idempotent_sum() {
        let mut tree = SumTree::new();
        let root = tree.build_full_binary_tree(2).unwrap();
        let root = tree.node(root).unwrap();
        root.all_leaves()[1].increment_by(5);
        assert_eq!(root.sum(), 5);
        assert_eq!(root.sum(), 5);
        assert_eq!(root.sum(), 5);
        assert!(root.is_cache_valid());
    }

    #[test]
    fn test_all_leaves_order() {
        let mut tree = SumTree::new();
        let grandparent = tree.add_node();
        let parent = tree.add_node();
        let c0 = tree.add_leaf();
        let c1 = tree.add_leaf();
        tree.add_child(parent, c0).unwrap();
        tree.add_child(parent, c1).unwrap();
        tree.add_child(grandparent, parent).unwrap();

        let leaves: Vec<NodeId> = tree
            .node(grandparent)
            .unwrap()
            .all_leaves()
            .iter()
            .map(|l| l.id())
            .collect();
        assert_eq!(leaves, vec![c0, c1]);
    }

    #[test]
    fn test_all_leaves_of_leaf_is_itself() {
        let mut tree = SumTree::new();
        let leaf = tree.add_leaf();
        let leaves = tree.node(leaf).unwrap().all_leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].id(), leaf);
    }

    #[test]
    fn test_child_out_of_range() {
        let mut tree = SumTree::new();
        let parent = tree.add_node();
        let leaf = tree.add_leaf();
        tree.add_child(parent, leaf).unwrap();
        let parent = tree.node(parent).unwrap();
        assert!(parent.child(0).is_ok());
        assert_eq!(
            parent.child(1).unwrap_err(),
            TreeError::IndexOutOfRange {
                node: parent.id(),
                index: 1,
                len: 1
            }
        );
    }

    #[test]
    fn test_leaf_cache_is_always_valid() {
        let mut tree = SumTree::new();
        let leaf = tree.add_leaf();
        let node = tree.node(leaf).unwrap();
        node.invalidate_cache();
        assert!(node.is_cache_valid());
    }

    #[test]
    fn test_stale_validate_keeps_old_sum() {
        let (tree, grandparent, _, leaf) = chain();
        let grandparent = tree.node(grandparent).unwrap();
        assert_eq!(grandparent.sum(), 0);

        tree.leaf(leaf).unwrap().increment();
        // Forcing validity skips the repair: the memoized sum is served.
        grandparent.validate_cache();
        assert_eq!(grandparent.sum(), 0);

        grandparent.invalidate_cache();
        assert_eq!(grandparent.sum(), 1);
    }

    #[test]
    fn test_deep_chain_sum() {
        const DEPTH: usize = 100_000;
        let mut tree = SumTree::new().with_arity(1);
        let leaf = tree.add_leaf();
        let mut top = leaf;
        for _ in 0..DEPTH {
            let node = tree.add_node();
            tree.add_child(node, top).unwrap();
            top = node;
        }

        tree.leaf(leaf).unwrap().increment_by(7);
        let top = tree.node(top).unwrap();
        assert_eq!(top.sum(), 7);
        assert!(tree.nodes().all(|n| n.is_cache_valid()));

        // Only the lower half is dirty: the repair stops at valid caches.
        let middle = tree.node(NodeId::new(DEPTH / 2)).unwrap();
        middle.invalidate_descendants();
        tree.leaf(leaf).unwrap().increment();
        assert_eq!(middle.sum(), 8);
        assert_eq!(top.sum(), 8);
        assert_eq!(top.all_leaves().len(), 1);
    }

    #[test]
    fn test_repair_mixes_valid_and_invalid_children() {
        let mut tree = SumTree::new();
        let root = tree.build_full_binary_tree(3).unwrap();
        let root = tree.node(root).unwrap();
        let leaves = root.all_leaves();
        for leaf in &leaves {
            leaf.increment();
        }
        assert_eq!(root.sum(), 8);

        leaves[0].increment_by(10);
        leaves[7].increment_by(100);
        assert!(root.child(0).unwrap().child(1).unwrap().is_cache_valid());
        assert_eq!(root.sum(), 118);
        assert!(tree.nodes().all(|n| n.is_cache_valid()));
    }

    #[test]
    fn test_debug() {
        let mut tree = SumTree::new();
        let leaf = tree.add_leaf();
        tree.leaf(leaf).unwrap().increment_by(4);
        assert_eq!(format!("{:?}", tree.node(leaf).unwrap()), "leaf#0{ 4 }");
    }

    #[test]
    fn test_eq() {
        let mut tree = SumTree::new();
        let a = tree.add_node();
        let b = tree.add_node();
        assert_eq!(tree.node(a).unwrap(), tree.node(a).unwrap());
        assert_ne!(tree.node(a).unwrap(), tree.node(b).unwrap());
    }
}
