//! Unified error type for all observers.
//!
//! This module provides a unified [`ObserverError`] type that wraps errors from
//! all observer implementations. This allows client code to switch between
//! observers without changing error handling logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use sommatori::observers::{Result, ObserverError};
//!
//! fn export_tree() -> Result<()> {
//!     // Works with any observer - same error type!
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::error::TreeError;

/// Unified error type for all observer operations.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Error from the JSON observer.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The observed node could not be resolved in its tree.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;
