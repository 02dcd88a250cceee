//! Shared type definitions
//!
//! Common aliases and error types used by both the document store and the
//! journal.

pub mod error;

pub use error::{Error, GraphError, JournalError, Result};

/// Metadata attached to document entities: an open string-keyed mapping of
/// JSON values. Graph-level properties use the same representation.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
