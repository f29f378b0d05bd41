//! Error type for topology edits and node lookups.
//!
//! Every variant is a precondition violation local to the call that caused
//! it. A failed call leaves the tree's topology and cached sums untouched.
//! The concurrent paths (increment, sum, invalidation) never fail.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors returned by [`SumTree`](crate::tree::SumTree) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The parent already holds as many children as its capacity allows.
    ///
    /// Leaves have a capacity of zero.
    #[error("node {parent} is full ({capacity} children)")]
    CapacityExceeded {
        /// The node that refused the child.
        parent: NodeId,
        /// Its fixed capacity.
        capacity: usize,
    },

    /// The child is already attached to a parent.
    #[error("node {child} is already attached to node {parent}")]
    AlreadyAttached {
        /// The node being attached.
        child: NodeId,
        /// Its current parent.
        parent: NodeId,
    },

    /// The requested child slot is not occupied.
    #[error("child index {index} out of range for node {node} ({len} children)")]
    IndexOutOfRange {
        /// The node queried.
        node: NodeId,
        /// The requested slot.
        index: usize,
        /// Number of occupied slots.
        len: usize,
    },

    /// Attaching the child would make it its own ancestor.
    #[error("attaching node {child} under node {parent} would create a cycle")]
    WouldCreateCycle {
        /// The prospective parent.
        parent: NodeId,
        /// The prospective child.
        child: NodeId,
    },

    /// The id was not minted by this tree.
    #[error("node {0} does not exist in this tree")]
    UnknownNode(NodeId),

    /// The id refers to an internal node where a leaf was required.
    #[error("node {0} is not a leaf")]
    NotALeaf(NodeId),

    /// A full tree needs more children per node than the tree allows.
    #[error("full tree needs arity {required}, tree arity is {arity}")]
    ArityTooSmall {
        /// Children per internal node of the requested tree.
        required: usize,
        /// The configured arity.
        arity: usize,
    },

    /// A full tree of this shape would not fit in memory.
    #[error("full tree of depth {depth} and arity {arity} is too large")]
    DepthTooLarge {
        /// Requested depth.
        depth: u32,
        /// Children per internal node.
        arity: usize,
    },
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
