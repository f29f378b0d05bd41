//! Construction of balanced full trees.
//!
//! A full tree of depth 0 is a single leaf. A full tree of depth `d` is an
//! internal node whose children are full trees of depth `d - 1`. Nodes are
//! allocated parent first, depth-first, so the root of a freshly built tree
//! has the lowest id and leaves appear in left-to-right order.

use tracing::debug;

use super::{NodeId, SumTree};
use crate::error::{Result, TreeError};

impl SumTree {
    /// Builds a full binary tree of the given depth, returning its root.
    ///
    /// The tree has `2^depth` leaves, all starting at zero. Requires an
    /// arity of at least 2.
    ///
    /// # Errors
    ///
    /// - [`TreeError::ArityTooSmall`] if the configured arity is 1.
    /// - [`TreeError::DepthTooLarge`] if the tree would not fit in memory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sommatori::tree::SumTree;
    ///
    /// let mut tree = SumTree::new();
    /// let root = tree.build_full_binary_tree(3).unwrap();
    /// assert_eq!(tree.node(root).unwrap().all_leaves().len(), 8);
    /// ```
    pub fn build_full_binary_tree(&mut self, depth: u32) -> Result<NodeId> {
        self.build_full(depth, 2)
    }

    /// Builds a full tree using the configured arity, returning its root.
    ///
    /// The tree has `arity^depth` leaves.
    ///
    /// # Errors
    ///
    /// [`TreeError::DepthTooLarge`] if the tree would not fit in memory.
    pub fn build_full_tree(&mut self, depth: u32) -> Result<NodeId> {
        self.build_full(depth, self.config.arity)
    }

    fn build_full(&mut self, depth: u32, arity: usize) -> Result<NodeId> {
        if depth > 0 && arity > self.config.arity {
            return Err(TreeError::ArityTooSmall {
                required: arity,
                arity: self.config.arity,
            });
        }

        let nodes =
            full_tree_size(depth, arity).ok_or(TreeError::DepthTooLarge { depth, arity })?;
        self.slots
            .try_reserve(nodes)
            .map_err(|_| TreeError::DepthTooLarge { depth, arity })?;

        let root = self.build_subtree(depth, arity)?;
        debug!(
            name = self.name,
            %root,
            depth,
            arity,
            nodes,
            "built full tree"
        );
        Ok(root)
    }

    /// Allocates a full subtree parent first, depth-first.
    fn build_subtree(&mut self, depth: u32, arity: usize) -> Result<NodeId> {
        if depth == 0 {
            return Ok(self.add_leaf());
        }
        let root = self.add_node();

        // (parent, depth of parent, children still to attach)
        let mut stack = vec![(root, depth, arity)];
        while let Some(top) = stack.last_mut() {
            if top.2 == 0 {
                stack.pop();
                continue;
            }
            top.2 -= 1;
            let (parent, level) = (top.0, top.1);

            let child = if level == 1 {
                self.add_leaf()
            } else {
                self.add_node()
            };
            self.add_child(parent, child)?;
            if level > 1 {
                stack.push((child, level - 1, arity));
            }
        }
        Ok(root)
    }
}

/// Number of nodes in a full tree: `1 + a + a^2 + ... + a^depth`.
fn full_tree_size(depth: u32, arity: usize) -> Option<usize> {
    let mut level = 1usize;
    let mut total = 1usize;
    for _ in 0..depth {
        level = level.checked_mul(arity)?;
        total = total.checked_add(level)?;
    }
    Some(total)
}
