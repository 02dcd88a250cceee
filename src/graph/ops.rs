//! Atomic document operations
//!
//! Every mutation of the document store is modeled as a value of [`AtomicOp`]:
//! the store interprets ops to mutate itself, and each op carries enough prior
//! state to construct its exact inverse. This keeps journal replay and merge
//! logic decoupled from the store's internal representation.

use crate::graph::{Edge, ExportedPort, Group, Initial, Node};
use crate::types::Metadata;
use serde::{Deserialize, Serialize};

/// A single invertible structural change to the document.
///
/// Add/Remove pairs carry the full entity snapshot, so removing is the exact
/// inverse of adding. Metadata setters carry the complete before and after
/// maps; undo restores the prior map byte for byte, including deleted keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomicOp {
    /// Add a node to the document
    AddNode(Node),
    /// Remove a node (dependent edges/initials/ports are removed by their own
    /// ops within the same transaction)
    RemoveNode(Node),
    /// Add an edge between two existing nodes
    AddEdge(Edge),
    /// Remove an edge
    RemoveEdge(Edge),
    /// Add an initial value bound to a port
    AddInitial(Initial),
    /// Remove an initial value
    RemoveInitial(Initial),
    /// Add a named node group
    AddGroup(Group),
    /// Remove a node group
    RemoveGroup(Group),
    /// Add an exported port
    AddExportedPort(ExportedPort),
    /// Remove an exported port
    RemoveExportedPort(ExportedPort),
    /// Replace a node's metadata map
    SetNodeMetadata {
        /// Node id
        id: String,
        /// Metadata map before the change
        before: Metadata,
        /// Metadata map after the change
        after: Metadata,
    },
    /// Replace an edge's metadata map
    SetEdgeMetadata {
        /// Source node id
        source_node: String,
        /// Source port
        source_port: String,
        /// Target node id
        target_node: String,
        /// Target port
        target_port: String,
        /// Metadata map before the change
        before: Metadata,
        /// Metadata map after the change
        after: Metadata,
    },
    /// Replace a group's metadata map
    SetGroupMetadata {
        /// Group name
        name: String,
        /// Metadata map before the change
        before: Metadata,
        /// Metadata map after the change
        after: Metadata,
    },
    /// Replace the graph-level properties map
    SetGraphMetadata {
        /// Properties before the change
        before: Metadata,
        /// Properties after the change
        after: Metadata,
    },
}

impl AtomicOp {
    /// Construct the exact inverse of this operation.
    ///
    /// Applying an op followed by its inverse leaves the document unchanged.
    pub fn inverted(&self) -> AtomicOp {
        match self.clone() {
            AtomicOp::AddNode(node) => AtomicOp::RemoveNode(node),
            AtomicOp::RemoveNode(node) => AtomicOp::AddNode(node),
            AtomicOp::AddEdge(edge) => AtomicOp::RemoveEdge(edge),
            AtomicOp::RemoveEdge(edge) => AtomicOp::AddEdge(edge),
            AtomicOp::AddInitial(initial) => AtomicOp::RemoveInitial(initial),
            AtomicOp::RemoveInitial(initial) => AtomicOp::AddInitial(initial),
            AtomicOp::AddGroup(group) => AtomicOp::RemoveGroup(group),
            AtomicOp::RemoveGroup(group) => AtomicOp::AddGroup(group),
            AtomicOp::AddExportedPort(port) => AtomicOp::RemoveExportedPort(port),
            AtomicOp::RemoveExportedPort(port) => AtomicOp::AddExportedPort(port),
            AtomicOp::SetNodeMetadata { id, before, after } => AtomicOp::SetNodeMetadata {
                id,
                before: after,
                after: before,
            },
            AtomicOp::SetEdgeMetadata {
                source_node,
                source_port,
                target_node,
                target_port,
                before,
                after,
            } => AtomicOp::SetEdgeMetadata {
                source_node,
                source_port,
                target_node,
                target_port,
                before: after,
                after: before,
            },
            AtomicOp::SetGroupMetadata {
                name,
                before,
                after,
            } => AtomicOp::SetGroupMetadata {
                name,
                before: after,
                after: before,
            },
            AtomicOp::SetGraphMetadata { before, after } => AtomicOp::SetGraphMetadata {
                before: after,
                after: before,
            },
        }
    }
}

/// One committed transaction emitted by the document store.
///
/// The store buffers ops while a transaction is open and flushes exactly one
/// change set when it ends; unbracketed mutations flush a single-op set
/// immediately. The journal drains these in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Caller-supplied transaction id (`"implicit"` for unbracketed mutations)
    pub transaction_id: String,
    /// Operations in application order
    pub ops: Vec<AtomicOp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_inverses() {
        let op = AtomicOp::AddNode(Node::new("Foo", "Bar"));
        let inv = op.inverted();
        assert_eq!(inv, AtomicOp::RemoveNode(Node::new("Foo", "Bar")));
        assert_eq!(inv.inverted(), op);
    }

    #[test]
    fn test_metadata_inverse_swaps_snapshots() {
        let mut before = Metadata::new();
        before.insert("x".to_string(), serde_json::json!(1));
        let mut after = Metadata::new();
        after.insert("x".to_string(), serde_json::json!(2));

        let op = AtomicOp::SetNodeMetadata {
            id: "Foo".to_string(),
            before: before.clone(),
            after: after.clone(),
        };
        match op.inverted() {
            AtomicOp::SetNodeMetadata {
                before: b,
                after: a,
                ..
            } => {
                assert_eq!(b, after);
                assert_eq!(a, before);
            }
            other => panic!("unexpected inverse: {:?}", other),
        }
    }
}
