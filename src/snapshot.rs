//! Point-in-time capture of a tree's state.
//!
//! A [`TreeSnapshot`] records, for every node, its place in the topology,
//! its kind, its cache validity and the value it currently holds: the
//! counter for a leaf, the memoized sum for an internal node. Capturing a
//! snapshot never repairs a cache, so it shows exactly which parts of the
//! tree a reader would have to recompute.
//!
//! # Feature Flag
//!
//! With the `serde` feature the snapshot types implement `Serialize` and
//! `Deserialize`:
//!
//! ```toml
//! [dependencies]
//! sommatori = { version = "0.1", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use sommatori::snapshot::TreeSnapshot;
//! use sommatori::tree::SumTree;
//!
//! let mut tree = SumTree::new().with_name("requests");
//! let root = tree.build_full_binary_tree(1).unwrap();
//! tree.node(root).unwrap().all_leaves()[0].increment_by(3);
//!
//! let snapshot = TreeSnapshot::capture(&tree);
//! assert_eq!(snapshot.nodes.len(), 3);
//! assert_eq!(snapshot.leaf_total(), 3);
//! // The root has not been asked for its sum yet.
//! assert!(!snapshot.nodes[0].cache_valid);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::tree::{NodeRef, SumTree};

/// Kind of a captured node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NodeKindSnapshot {
    /// Aggregating node with a memoized sum.
    Internal,
    /// Counter owned by one writer.
    Leaf,
}

/// A snapshot of a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeSnapshot {
    /// Arena index of the node.
    pub id: usize,
    /// Arena index of the parent, `None` for a root.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub parent: Option<usize>,
    /// Arena indices of the children, in attachment order.
    pub children: Vec<usize>,
    pub kind: NodeKindSnapshot,
    /// Whether the cache was valid. Always `true` for a leaf.
    pub cache_valid: bool,
    /// Leaf counter, or the memoized sum of an internal node.
    pub value: u64,
}

impl NodeSnapshot {
    /// Captures one node without repairing its cache.
    pub fn from_node(node: NodeRef<'_>) -> Self {
        Self {
            id: node.id().index(),
            parent: node.parent().map(|p| p.id().index()),
            children: node.children().map(|c| c.id().index()).collect(),
            kind: if node.is_leaf() {
                NodeKindSnapshot::Leaf
            } else {
                NodeKindSnapshot::Internal
            },
            cache_valid: node.is_cache_valid(),
            value: node.cached_sum(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKindSnapshot::Leaf
    }
}

/// A snapshot of every node in a tree, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeSnapshot {
    /// Name of the tree, or `(unnamed)`.
    pub name: String,
    /// Optional timestamp in milliseconds since Unix epoch.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub timestamp_ms: Option<u64>,
    /// The captured nodes, in creation order.
    pub nodes: Vec<NodeSnapshot>,
}

impl TreeSnapshot {
    /// Captures every node of `tree` without repairing any cache.
    pub fn capture(tree: &SumTree) -> Self {
        Self {
            name: if tree.name().is_empty() {
                "(unnamed)".to_string()
            } else {
                tree.name().to_string()
            },
            timestamp_ms: None,
            nodes: tree.nodes().map(NodeSnapshot::from_node).collect(),
        }
    }

    /// Captures `tree` and stamps it with `timestamp_ms`.
    pub fn capture_with_timestamp(tree: &SumTree, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            ..Self::capture(tree)
        }
    }

    /// Finds a node by arena index, in any node order.
    pub fn get(&self, id: usize) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Iterates over the captured roots (nodes without a parent).
    pub fn roots(&self) -> impl Iterator<Item = &NodeSnapshot> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }

    /// Exact sum of every captured leaf value.
    pub fn leaf_total(&self) -> u64 {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .fold(0u64, |acc, n| acc.wrapping_add(n.value))
    }

    /// Number of internal nodes whose cache was invalid.
    pub fn invalid_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.cache_valid).count()
    }
}
