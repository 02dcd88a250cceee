//! Graph edge and initial-value implementations

use crate::types::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Graph edge: a connection from an output port to an input port.
///
/// Identity is the full endpoint tuple; two edges with the same endpoints are
/// the same edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id
    pub source_node: String,
    /// Port on the source node
    pub source_port: String,
    /// Target node id
    pub target_node: String,
    /// Port on the target node
    pub target_port: String,
    /// Edge metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Edge {
    /// Create a new edge with empty metadata
    pub fn new(
        source_node: impl Into<String>,
        source_port: impl Into<String>,
        target_node: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            source_node: source_node.into(),
            source_port: source_port.into(),
            target_node: target_node.into(),
            target_port: target_port.into(),
            metadata: Metadata::new(),
        }
    }

    /// True if this edge matches the given endpoint tuple
    pub fn matches(&self, sn: &str, sp: &str, tn: &str, tp: &str) -> bool {
        self.source_node == sn
            && self.source_port == sp
            && self.target_node == tn
            && self.target_port == tp
    }

    /// True if either endpoint references the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node == node_id || self.target_node == node_id
    }
}

/// Initial value: a literal packet bound to an input port instead of an edge.
///
/// Identity is the (data, target node, target port) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initial {
    /// Literal data delivered to the port
    pub data: Value,
    /// Target node id
    pub target_node: String,
    /// Port on the target node
    pub target_port: String,
    /// Initial metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Initial {
    /// Create a new initial value with empty metadata
    pub fn new(data: Value, target_node: impl Into<String>, target_port: impl Into<String>) -> Self {
        Self {
            data,
            target_node: target_node.into(),
            target_port: target_port.into(),
            metadata: Metadata::new(),
        }
    }
}
