//! Table observer for pretty-printing a tree.
//!
//! This module provides [`TableObserver`], which renders a [`SumTree`] as a
//! formatted ASCII table using the `tabled` crate. Rendering captures a
//! [`TreeSnapshot`] first, so no cache is repaired by looking at it.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! sommatori = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ## Standard format (one row per node)
//!
//! ```rust,ignore
//! use sommatori::observers::table::{TableObserver, TableStyle};
//! use sommatori::tree::SumTree;
//!
//! let mut tree = SumTree::new().with_name("requests");
//! let root = tree.build_full_binary_tree(1)?;
//! tree.node(root)?.all_leaves()[0].increment_by(5);
//!
//! println!("{}", TableObserver::new().render(&tree));
//! // requests
//! // ╭────┬──────────┬────────┬──────────┬─────────┬───────╮
//! // │ Id │ Kind     │ Parent │ Children │ Cache   │ Value │
//! // ├────┼──────────┼────────┼──────────┼─────────┼───────┤
//! // │ #0 │ internal │        │ #1 #2    │ invalid │ 0     │
//! // │ #1 │ leaf     │ #0     │          │ valid   │ 5     │
//! // │ #2 │ leaf     │ #0     │          │ valid   │ 0     │
//! // ╰────┴──────────┴────────┴──────────┴─────────┴───────╯
//! ```
//!
//! ## Compact format (leaf counters in a grid)
//!
//! ```rust,ignore
//! let observer = TableObserver::new().compact(true).columns(4);
//! println!("{}", observer.render(&tree));
//! // requests
//! // ╭───────┬───────┬──┬──╮
//! // │ #1: 5 │ #2: 0 │  │  │
//! // ╰───────┴───────┴──┴──╯
//! ```

use tabled::{builder::Builder, settings::Style, Table, Tabled};

use super::Result;
use crate::snapshot::{NodeKindSnapshot, NodeSnapshot, TreeSnapshot};
use crate::tree::{NodeId, SumTree};

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// Dots for borders
    Dots,
    /// No borders, just spacing
    Blank,
}

/// Separator style between id and value in compact mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompactSeparator {
    /// Colon separator: "#3: value"
    #[default]
    Colon,
    /// Equals separator: "#3 = value"
    Equals,
    /// Arrow separator: "#3 → value"
    Arrow,
}

impl CompactSeparator {
    /// Returns the separator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompactSeparator::Colon => ": ",
            CompactSeparator::Equals => " = ",
            CompactSeparator::Arrow => " → ",
        }
    }
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The style to use for rendering.
    pub style: TableStyle,
    /// Whether to show the header row (only in non-compact mode).
    pub show_header: bool,
    /// Custom title; defaults to the tree name.
    pub title: Option<String>,
    /// Whether to show only leaf counters as "#id: value" cells.
    pub compact: bool,
    /// Number of columns in compact mode (default: 1).
    pub columns: usize,
    /// Separator between id and value in compact mode.
    pub separator: CompactSeparator,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
            compact: false,
            columns: 1,
            separator: CompactSeparator::default(),
        }
    }
}

/// Internal row representation for tabled (standard mode).
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Children")]
    children: String,
    #[tabled(rename = "Cache")]
    cache: &'static str,
    #[tabled(rename = "Value")]
    value: u64,
}

impl From<&NodeSnapshot> for NodeRow {
    fn from(node: &NodeSnapshot) -> Self {
        NodeRow {
            id: format!("#{}", node.id),
            kind: match node.kind {
                NodeKindSnapshot::Internal => "internal",
                NodeKindSnapshot::Leaf => "leaf",
            },
            parent: node.parent.map(|p| format!("#{p}")).unwrap_or_default(),
            children: node
                .children
                .iter()
                .map(|c| format!("#{c}"))
                .collect::<Vec<_>>()
                .join(" "),
            cache: if node.cache_valid { "valid" } else { "invalid" },
            value: node.value,
        }
    }
}

/// An observer that renders a tree as a formatted ASCII table.
///
/// Supports two rendering modes:
///
/// 1. **Standard mode**: one row per node with topology, cache state and value
/// 2. **Compact mode**: leaf counters only, as a grid of "#id: value" cells
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates a new table observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table observer with the specified configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets whether to show the header row.
    ///
    /// Only applies in standard (non-compact) mode.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets a title, overriding the tree name.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Enables or disables compact mode.
    pub fn compact(mut self, enabled: bool) -> Self {
        self.config.compact = enabled;
        self
    }

    /// Sets the number of columns in compact mode.
    ///
    /// Default is 1. Values less than 1 are treated as 1.
    pub fn columns(mut self, count: usize) -> Self {
        self.config.columns = count.max(1);
        self
    }

    /// Sets the separator between id and value in compact mode.
    pub fn separator(mut self, sep: CompactSeparator) -> Self {
        self.config.separator = sep;
        self
    }

    /// Applies the configured style to a table.
    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Dots => {
                table.with(Style::dots());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
    }

    fn with_title_line(&self, snapshot: &TreeSnapshot, table: String) -> String {
        let title = self.config.title.as_deref().unwrap_or(&snapshot.name);
        if title.is_empty() {
            table
        } else {
            format!("{}\n{}", title, table)
        }
    }

    /// Renders leaf counters in compact mode (grid layout).
    fn render_compact(&self, snapshot: &TreeSnapshot) -> String {
        let cells: Vec<String> = snapshot
            .nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| format!("#{}{}{}", n.id, self.config.separator.as_str(), n.value))
            .collect();

        if cells.is_empty() {
            return String::new();
        }

        let cols = self.config.columns;
        let mut builder = Builder::default();
        for chunk in cells.chunks(cols) {
            let mut row: Vec<String> = chunk.to_vec();
            row.resize(cols, String::new());
            builder.push_record(row);
        }

        let mut table = builder.build();
        self.apply_style(&mut table);
        self.with_title_line(snapshot, table.to_string())
    }

    /// Renders every node in standard mode.
    fn render_standard(&self, snapshot: &TreeSnapshot) -> String {
        let rows: Vec<NodeRow> = snapshot.nodes.iter().map(NodeRow::from).collect();

        let mut table = Table::new(&rows);
        self.apply_style(&mut table);

        if !self.config.show_header {
            table.with(tabled::settings::Remove::row(
                tabled::settings::object::Rows::first(),
            ));
        }

        self.with_title_line(snapshot, table.to_string())
    }

    /// Renders a captured snapshot.
    pub fn render_snapshot(&self, snapshot: &TreeSnapshot) -> String {
        if self.config.compact {
            self.render_compact(snapshot)
        } else {
            self.render_standard(snapshot)
        }
    }

    /// Renders every node of `tree` without repairing any cache.
    pub fn render(&self, tree: &SumTree) -> String {
        self.render_snapshot(&TreeSnapshot::capture(tree))
    }

    /// Renders only the subtree rooted at `root`, in depth-first order.
    ///
    /// # Errors
    ///
    /// [`ObserverError::Tree`](super::ObserverError::Tree) if `root` is not
    /// a node of `tree`.
    pub fn render_subtree(&self, tree: &SumTree, root: NodeId) -> Result<String> {
        let root = tree.node(root)?;
        let mut snapshot = TreeSnapshot::capture(tree);
        let mut keep = vec![false; snapshot.nodes.len()];
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            keep[node.id().index()] = true;
            stack.extend(node.children());
        }
        snapshot.nodes.retain(|n| keep[n.id]);
        Ok(self.render_snapshot(&snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (SumTree, NodeId) {
        let mut tree = SumTree::new().with_name("requests");
        let root = tree.build_full_binary_tree(2).unwrap();
        let leaves = tree.node(root).unwrap().all_leaves();
        leaves[0].increment_by(42);
        leaves[3].increment_by(7);
        (tree, root)
    }

    #[test]
    fn test_render_empty_tree() {
        let tree = SumTree::new();
        let output = TableObserver::new().render(&tree);
        assert!(output.starts_with("(unnamed)"));
    }

    #[test]
    fn test_render_empty_compact() {
        let tree = SumTree::new().with_name("empty");
        let output = TableObserver::new().compact(true).columns(3).render(&tree);
        assert!(output.is_empty());
    }

    #[test]
    fn test_render_standard() {
        let (tree, _) = sample();
        let output = TableObserver::new().render(&tree);

        assert!(output.starts_with("requests"));
        assert!(output.contains("Kind"));
        assert!(output.contains("internal"));
        assert!(output.contains("leaf"));
        assert!(output.contains("invalid"));
        assert!(output.contains("42"));
        assert!(output.contains("#1 #4"));
    }

    #[test]
    fn test_render_shows_repaired_sum() {
        let (tree, root) = sample();
        assert_eq!(tree.node(root).unwrap().sum(), 49);
        let output = TableObserver::new().render(&tree);
        assert!(output.contains("49"));
        assert!(!output.contains("invalid"));
    }

    #[test]
    fn test_render_compact() {
        let (tree, _) = sample();
        let output = TableObserver::new().compact(true).columns(2).render(&tree);
        assert!(output.contains("#2: 42"));
        assert!(output.contains("#6: 7"));
        assert!(!output.contains("#0"));
    }

    #[test]
    fn test_render_compact_with_separator() {
        let (tree, _) = sample();
        let output = TableObserver::new()
            .compact(true)
            .separator(CompactSeparator::Equals)
            .render(&tree);
        assert!(output.contains("#2 = 42"));

        let output = TableObserver::new()
            .compact(true)
            .separator(CompactSeparator::Arrow)
            .render(&tree);
        assert!(output.contains("#2 → 42"));
    }

    #[test]
    fn test_render_with_different_styles() {
        let (tree, _) = sample();
        let styles = [
            TableStyle::Ascii,
            TableStyle::Rounded,
            TableStyle::Sharp,
            TableStyle::Modern,
            TableStyle::Markdown,
            TableStyle::Dots,
            TableStyle::Blank,
        ];
        for style in styles {
            let output = TableObserver::new().with_style(style).render(&tree);
            assert!(output.contains("42"));
        }
    }

    #[test]
    fn test_render_with_title() {
        let (tree, _) = sample();
        let output = TableObserver::new().with_title("My Tree").render(&tree);
        assert!(output.starts_with("My Tree"));
    }

    #[test]
    fn test_render_without_header() {
        let (tree, _) = sample();
        let output = TableObserver::new().with_header(false).render(&tree);
        assert!(!output.contains("Kind"));
        assert!(!output.contains("Children"));
        assert!(output.contains("42"));
    }

    #[test]
    fn test_render_subtree() {
        let (tree, root) = sample();
        let right = tree.node(root).unwrap().child(1).unwrap().id();
        let output = TableObserver::new()
            .compact(true)
            .columns(4)
            .render_subtree(&tree, right)
            .unwrap();
        assert!(output.contains("#6: 7"));
        assert!(!output.contains("#2: 42"));
    }

    #[test]
    fn test_render_subtree_unknown_node() {
        let (tree, _) = sample();
        assert!(TableObserver::new()
            .render_subtree(&tree, NodeId::new(100))
            .is_err());
    }

    #[test]
    fn test_config() {
        let config = TableConfig {
            style: TableStyle::Markdown,
            show_header: false,
            title: Some("Custom Title".to_string()),
            compact: true,
            columns: 4,
            separator: CompactSeparator::Arrow,
        };

        let observer = TableObserver::with_config(config);
        assert!(observer.config.title.is_some());
        assert!(observer.config.compact);
        assert_eq!(observer.config.columns, 4);
        assert_eq!(observer.config.separator, CompactSeparator::Arrow);
    }

    #[test]
    fn test_columns_min_value() {
        let observer = TableObserver::new().columns(0);
        assert_eq!(observer.config.columns, 1);
    }
}
