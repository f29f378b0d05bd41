//! Observer implementations for inspecting and exporting a tree.
//!
//! This module provides ways to look at a [`SumTree`](crate::tree::SumTree)
//! from the outside:
//!
//! - [`table`] - Pretty-print the tree as a table using the `tabled` crate
//! - [`json`] - Serialize the tree to JSON format
//!
//! Both work on a [`TreeSnapshot`](crate::snapshot::TreeSnapshot), so
//! observing a tree never repairs its caches unless explicitly asked to.
//!
//! # Unified Error Handling
//!
//! All observers use a unified [`ObserverError`] type, allowing you to switch
//! between observers without changing error handling code.
//!
//! # Feature Flags
//!
//! - `table` - Enables the [`table`] module
//! - `json` - Enables the [`json`] module
//! - `full` - Enables all observer modules
//!
//! # Example
//!
//! ```rust,ignore
//! use sommatori::observers::Result;
//! use sommatori::tree::SumTree;
//!
//! fn export(tree: &SumTree) -> Result<()> {
//!     #[cfg(feature = "table")]
//!     {
//!         use sommatori::observers::table::TableObserver;
//!         println!("{}", TableObserver::new().compact(true).columns(4).render(tree));
//!     }
//!
//!     #[cfg(feature = "json")]
//!     {
//!         use sommatori::observers::json::JsonObserver;
//!         println!("{}", JsonObserver::new().with_total(true).to_json(tree)?);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod error;

pub use error::{ObserverError, Result};

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;
