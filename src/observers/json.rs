//! JSON observer for serializing a tree.
//!
//! This module provides [`JsonObserver`], which serializes a [`SumTree`] to
//! JSON through a [`TreeSnapshot`]. The snapshot is captured without
//! repairing caches; enable [`JsonObserver::with_total`] to also report the
//! repaired sum of every root.
//!
//! # Feature Flag
//!
//! This module requires the `json` feature:
//!
//! ```toml
//! [dependencies]
//! sommatori = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use sommatori::observers::json::JsonObserver;
//! use sommatori::tree::SumTree;
//!
//! let mut tree = SumTree::new().with_name("requests");
//! let root = tree.build_full_binary_tree(1)?;
//! tree.node(root)?.all_leaves()[1].increment();
//!
//! let json = JsonObserver::new().with_total(true).to_json(&tree)?;
//! // {"tree":{"name":"requests","nodes":[...]},"totals":[{"root":0,"sum":1}]}
//! ```

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::Result;
use crate::snapshot::TreeSnapshot;
use crate::tree::SumTree;

/// The repaired sum of one root.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootTotal {
    /// Arena index of the root.
    pub root: usize,
    /// Its sum after cache repair.
    pub sum: u64,
}

/// Document produced by [`JsonObserver`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeReport {
    /// The captured tree, before any repair.
    pub tree: TreeSnapshot,
    /// Per-root sums, present when totals are enabled.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub totals: Vec<RootTotal>,
}

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Whether to pretty-print the JSON output.
    pub pretty: bool,
    /// Whether to include a timestamp in the output.
    pub include_timestamp: bool,
    /// Whether to repair and report the sum of every root.
    pub include_total: bool,
}

/// An observer that serializes a tree to JSON format.
///
/// # Examples
///
/// ```rust,ignore
/// use sommatori::observers::json::JsonObserver;
///
/// let observer = JsonObserver::new()
///     .pretty(true)
///     .include_timestamp(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    /// Creates a new JSON observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new JSON observer with the specified configuration.
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables or disables pretty-printing.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    /// Enables or disables timestamp inclusion.
    pub fn include_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Enables or disables per-root totals.
    ///
    /// Totals are computed after the snapshot is taken, so the snapshot
    /// still shows which caches were invalid.
    pub fn with_total(mut self, enabled: bool) -> Self {
        self.config.include_total = enabled;
        self
    }

    /// Collects the report that [`to_json`](Self::to_json) serializes.
    pub fn collect(&self, tree: &SumTree) -> TreeReport {
        let snapshot = if self.config.include_timestamp {
            TreeSnapshot::capture_with_timestamp(tree, current_timestamp_ms())
        } else {
            TreeSnapshot::capture(tree)
        };

        let totals = if self.config.include_total {
            tree.nodes()
                .filter(|n| n.parent().is_none())
                .map(|n| RootTotal {
                    root: n.id().index(),
                    sum: n.sum(),
                })
                .collect()
        } else {
            Vec::new()
        };

        TreeReport {
            tree: snapshot,
            totals,
        }
    }

    /// Serializes `tree` to a JSON string.
    pub fn to_json(&self, tree: &SumTree) -> Result<String> {
        let report = self.collect(tree);
        let json = if self.config.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(json)
    }
}

/// Returns the current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
