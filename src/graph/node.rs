//! Graph node implementation

use crate::types::Metadata;
use serde::{Deserialize, Serialize};

/// Graph node: a named instance of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier within the document
    pub id: String,
    /// Component the node instantiates
    pub component: String,
    /// Node metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Node {
    /// Create a new node with empty metadata
    pub fn new(id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            metadata: Metadata::new(),
        }
    }
}
