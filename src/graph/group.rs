//! Node groups

use crate::types::Metadata;
use serde::{Deserialize, Serialize};

/// Named group of nodes.
///
/// Membership is tolerant: ids may reference nodes that no longer exist in the
/// document, mirroring how editors keep groups around while their contents
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group name within the document
    pub name: String,
    /// Member node ids; compared as a set, stored in insertion order
    pub nodes: Vec<String>,
    /// Group metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Group {
    /// Create a new group
    pub fn new(name: impl Into<String>, nodes: Vec<String>, metadata: Metadata) -> Self {
        Self {
            name: name.into(),
            nodes,
            metadata,
        }
    }
}
