//! # Sommatori - Lock-Free Cached Summation Trees
//!
//! A Rust library that lets many writer threads each bump a private counter
//! while any number of reader threads get an up-to-date total, without any
//! mutex or blocking primitive.
//!
//! ## The Problem
//!
//! A single shared atomic counter is correct but every increment bounces its
//! cache line between cores. Giving each thread its own counter removes the
//! contention, but then every read has to walk all counters, even when most
//! of them have not changed since the last read.
//!
//! ## The Solution: Cached Summation
//!
//! The per-thread counters are the leaves of a tree. Every internal node
//! memoizes the sum of its subtree next to a validity flag:
//!
//! 1. **Write**: a thread increments its own leaf, then walks up the parent
//!    links marking every ancestor invalid. No other leaf is touched.
//!
//! 2. **Read**: a reader asks a node (usually the root) for its sum. A valid
//!    node answers from its cache; an invalid one sums its children,
//!    repairing their caches on the way down, and memoizes the result.
//!
//! 3. **Repair is lazy**: only subtrees that changed since the last read
//!    are recomputed. A quiet half of the tree costs one atomic load.
//!
//! 4. **Cache Line Padding**: every leaf counter and every node cache is
//!    wrapped in [`crossbeam_utils::CachePadded`] so writers on different
//!    leaves never false-share.
//!
//! ## Consistency
//!
//! Reads are not linearizable: a sum observed during concurrent increments
//! may include some of them and not others. What is guaranteed:
//!
//! - an increment is never counted twice;
//! - once writers stop, the next read of any node returns the exact total;
//! - an invalidation that races with a repair is never lost (see the
//!   protocol notes in `tree::cache`).
//!
//! ## Quick Start
//!
//! ```rust
//! use sommatori::tree::SumTree;
//!
//! // Eight leaves, one per writer thread.
//! let mut tree = SumTree::new().with_name("requests");
//! let root = tree.build_full_binary_tree(3).unwrap();
//! let root = tree.node(root).unwrap();
//!
//! std::thread::scope(|s| {
//!     for leaf in root.all_leaves() {
//!         s.spawn(move || {
//!             for _ in 0..1000 {
//!                 leaf.increment();
//!             }
//!         });
//!     }
//!     // Readers may poll concurrently.
//!     s.spawn(|| root.sum());
//! });
//!
//! assert_eq!(root.sum(), 8000);
//! ```
//!
//! ## Errors
//!
//! Topology edits return [`TreeError`](error::TreeError) on precondition
//! violations (full parent, already attached child, cycle, unknown id).
//! Increments and reads never fail.
//!
//! ## Observers
//!
//! The library provides optional observer modules for exporting a tree.
//! Each observer is gated behind a feature flag:
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `table` | [`observers::table`] | Pretty-print the tree as ASCII tables |
//! | `json` | [`observers::json`] | Serialize the tree to JSON |
//! | `full` | All observers | Enables all observer modules |
//!
//! ## Logging
//!
//! Construction and cache repairs emit `tracing` events at `debug` and
//! `trace` level. The library never installs a subscriber.

pub mod error;
pub mod observers;
pub mod snapshot;
pub mod tree;
