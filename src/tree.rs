//! The cached summation tree.
//!
//! A [`SumTree`] is an arena of nodes. Leaves hold one writer's counter;
//! internal nodes memoize the sum of their subtree. Writers increment their
//! own leaf and invalidate every ancestor on the way up; readers ask any node
//! for its sum and repair invalid caches on the way down.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────┐
//!   reader ──sum──►  │ root  [V|Σ] │ ◄── invalidate ──┐
//!                    └──────┬──────┘                  │
//!                 ┌─────────┴─────────┐               │
//!          ┌──────┴──────┐     ┌──────┴──────┐        │
//!          │ node  [V|Σ] │     │ node  [V|Σ] │ ◄──────┤
//!          └──┬───────┬──┘     └──┬───────┬──┘        │
//!           leaf    leaf        leaf    leaf ─────────┘
//!            ▲       ▲           ▲       ▲    increment
//!         thread0 thread1     thread2 thread3
//! ```
//!
//! Topology is edited only through `&mut SumTree`, before the tree is
//! shared. Everything that runs concurrently takes `&SumTree`: the tree is
//! `Send + Sync` and can be lent to scoped threads or wrapped in an `Arc`.
//!
//! Handles ([`NodeRef`], [`LeafRef`]) borrow the tree and are `Copy`, so a
//! leaf handle can be moved into each writer thread.

mod builder;
mod cache;
mod leaf;
mod node;

pub use leaf::LeafRef;
pub use node::NodeRef;

use std::fmt;

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::error::{Result, TreeError};
use cache::SumCache;

/// Stable index of a node inside its [`SumTree`].
///
/// Ids are only meaningful for the tree that minted them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// The arena index of this node.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Configuration of a [`SumTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum number of children of each internal node (default: 2).
    pub arity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { arity: 2 }
    }
}

impl TreeConfig {
    /// Creates the default (binary) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the children capacity of internal nodes.
    ///
    /// Values less than 1 are treated as 1.
    pub fn arity(mut self, arity: usize) -> Self {
        self.arity = arity.max(1);
        self
    }
}

/// Shared mutable state of a node, tagged by kind.
pub(crate) enum NodeKind {
    Internal { cache: CachePadded<SumCache> },
    Leaf { value: CachePadded<AtomicU64> },
}

pub(crate) struct Slot {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Slot {
    fn internal(arity: usize) -> Self {
        Slot {
            parent: None,
            children: Vec::with_capacity(arity),
            kind: NodeKind::Internal {
                cache: CachePadded::new(SumCache::new()),
            },
        }
    }

    fn leaf() -> Self {
        Slot {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Leaf {
                value: CachePadded::new(AtomicU64::new(0)),
            },
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// An arena-backed tree of cached summation nodes.
///
/// # Examples
///
/// ```rust
/// use sommatori::tree::SumTree;
///
/// let mut tree = SumTree::new().with_name("requests");
/// let root = tree.build_full_binary_tree(2).unwrap();
/// let root = tree.node(root).unwrap();
///
/// let leaves = root.all_leaves();
/// assert_eq!(leaves.len(), 4);
///
/// std::thread::scope(|s| {
///     for leaf in &leaves {
///         let leaf = *leaf;
///         s.spawn(move || {
///             for _ in 0..100 {
///                 leaf.increment();
///             }
///         });
///     }
/// });
///
/// assert_eq!(root.sum(), 400);
/// ```
pub struct SumTree {
    name: &'static str,
    config: TreeConfig,
    slots: Vec<Slot>,
}

impl SumTree {
    /// Creates an empty binary tree.
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Creates an empty tree with the given configuration.
    pub fn with_config(config: TreeConfig) -> Self {
        SumTree {
            name: "",
            config: config.arity(config.arity),
            slots: Vec::new(),
        }
    }

    /// Sets the children capacity of internal nodes.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.config = self.config.arity(arity);
        self
    }

    /// Sets the name of this tree, returning `self` for method chaining.
    ///
    /// The name is used as a title by the observers.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Returns the name of this tree, or an empty string.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the configuration of this tree.
    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of nodes (internal and leaves) in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Adds a detached internal node: valid cache, sum zero, no children.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId::new(self.slots.len());
        self.slots.push(Slot::internal(self.config.arity));
        id
    }

    /// Adds a detached leaf with value zero.
    pub fn add_leaf(&mut self) -> NodeId {
        let id = NodeId::new(self.slots.len());
        self.slots.push(Slot::leaf());
        id
    }

    /// Appends `child` to the children of `parent`.
    ///
    /// Invalidates the cache of `parent` only. If `parent` is already
    /// attached somewhere, its ancestors keep their caches: call
    /// [`NodeRef::invalidate_ancestors`] to mark the path dirty.
    ///
    /// # Errors
    ///
    /// - [`TreeError::UnknownNode`] if either id is not from this tree.
    /// - [`TreeError::CapacityExceeded`] if `parent` is full (or a leaf).
    /// - [`TreeError::AlreadyAttached`] if `child` already has a parent.
    /// - [`TreeError::WouldCreateCycle`] if `child` is `parent` or one of
    ///   its ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_slot = self.slot(parent)?;
        let child_slot = self.slot(child)?;

        let capacity = if parent_slot.is_leaf() {
            0
        } else {
            self.config.arity
        };
        if parent_slot.children.len() >= capacity {
            return Err(TreeError::CapacityExceeded { parent, capacity });
        }
        if let Some(current) = child_slot.parent {
            return Err(TreeError::AlreadyAttached {
                child,
                parent: current,
            });
        }
        if self.ancestors_or_self(parent).any(|id| id == child) {
            return Err(TreeError::WouldCreateCycle { parent, child });
        }

        self.slots[child.0].parent = Some(parent);
        let parent_slot = &mut self.slots[parent.0];
        parent_slot.children.push(child);
        if let NodeKind::Internal { cache } = &parent_slot.kind {
            cache.invalidate();
        }

        trace!(%parent, %child, "attached child");
        Ok(())
    }

    /// Returns a handle to the node with the given id.
    pub fn node(&self, id: NodeId) -> Result<NodeRef<'_>> {
        self.slot(id)?;
        Ok(NodeRef::new(self, id))
    }

    /// Returns a handle to the leaf with the given id.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotALeaf`] if the id refers to an internal node.
    pub fn leaf(&self, id: NodeId) -> Result<LeafRef<'_>> {
        self.node(id)?.as_leaf().ok_or(TreeError::NotALeaf(id))
    }

    /// Iterates over every node in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        (0..self.slots.len()).map(move |i| NodeRef::new(self, NodeId::new(i)))
    }

    #[inline]
    fn slot(&self, id: NodeId) -> Result<&Slot> {
        self.slots.get(id.0).ok_or(TreeError::UnknownNode(id))
    }

    /// Slot lookup for ids already validated by a handle.
    #[inline]
    pub(crate) fn slot_unchecked(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    /// Walks from `id` up to its root, `id` first.
    pub(crate) fn ancestors_or_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |cur| self.slots[cur.0].parent)
    }
}

impl Default for SumTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SumTree {
    /// Formats the tree showing each root and its cached total.
    ///
    /// Output format: `name{ #root:sum ... }`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.name)?;
        for node in self.nodes().filter(|n| n.parent().is_none()) {
            let sum = match &self.slot_unchecked(node.id()).kind {
                NodeKind::Leaf { value } => value.load(Ordering::Acquire),
                NodeKind::Internal { cache } => cache.cached_sum(),
            };
            write!(f, " {}:{}", node.id(), sum)?;
        }
        write!(f, " }}")
    }
}
