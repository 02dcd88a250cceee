//! Error types and handling for the flow-graph document model
//!
//! This module defines all error types used throughout the crate. Failures are
//! local and synchronous: a failed mutation leaves the document unchanged and
//! records nothing in the journal.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the flow-graph document model
#[derive(Error, Debug)]
pub enum Error {
    /// Document store errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Journal errors
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    /// Malformed serialized document
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Document store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Adding a node or group whose id/name is already taken
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// Referencing a node, edge, initial, or group that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Adding an edge, initial, or exported port to a nonexistent node
    #[error("Invalid reference: no node '{0}'")]
    InvalidReference(String),

    /// Starting a transaction while another is open
    #[error("Transaction '{0}' already in progress")]
    TransactionInProgress(String),

    /// Ending a transaction that was never started, or with the wrong id
    #[error("No open transaction matching '{0}'")]
    NoTransaction(String),
}

/// Journal errors
#[derive(Error, Debug)]
pub enum JournalError {
    /// A replayed operation no longer applies to the document
    #[error("Graph error during replay: {0}")]
    Graph(#[from] GraphError),

    /// Internal consistency failure: a recorded entry cannot be inverted
    #[error("Journal corrupt: {0}")]
    Corrupt(String),
}
