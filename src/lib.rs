//! flow-graph - A Versioned Document Model for Flow-Based Programming
//!
//! flow-graph is an in-memory, versioned document model for directed graphs of
//! interconnected components: nodes, edges, initial values, groups, and
//! exported ports. Every mutation of the document is recorded as an invertible
//! transaction in a journal, making the full history replayable, undoable, and
//! mergeable.
//!
//! The document is mutated through the [`graph::Graph`] API; attaching a
//! [`journal::Journal`] turns those mutations into revision-numbered entries
//! that support `move_to_revision`, `undo`/`redo`, human-readable transcripts,
//! and single-transaction merges of independently evolved copies.
#![warn(missing_docs)]

// Core foundational modules
pub mod types;

// Main functional modules
pub mod graph;
pub mod journal;

// Re-export commonly used items for convenience
pub use graph::{equivalent, load_json, merge_resolve_theirs, AtomicOp, Graph};
pub use journal::{Journal, JournalStore, TransactionEntry};
pub use types::{Error, GraphError, JournalError, Metadata, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
