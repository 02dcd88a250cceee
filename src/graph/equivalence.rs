//! Order-insensitive structural comparison of documents
//!
//! Used to verify that replay and merge produce the intended state: two
//! documents are equivalent when they contain the same entities, regardless of
//! the order their containers happen to hold them in.

use crate::graph::Graph;
use std::collections::BTreeSet;

/// True iff the two documents are structurally equivalent.
///
/// Nodes compare by (id, component, metadata); edges and exported ports
/// compare as unordered sets over their full field tuples including metadata;
/// initials compare as a multiset, since nothing stops a port from holding
/// two identical packets; groups compare by name with membership as a set;
/// graph-level properties must match exactly. Container ordering never
/// matters. The relation is reflexive and symmetric.
pub fn equivalent(a: &Graph, b: &Graph) -> bool {
    if a.properties() != b.properties() {
        return false;
    }

    if a.nodes().len() != b.nodes().len() {
        return false;
    }
    for node in a.nodes() {
        match b.node(&node.id) {
            Some(other) if other.component == node.component && other.metadata == node.metadata => {}
            _ => return false,
        }
    }

    if a.edges().len() != b.edges().len() {
        return false;
    }
    for edge in a.edges() {
        let matched = b.edges().iter().any(|other| {
            other.matches(
                &edge.source_node,
                &edge.source_port,
                &edge.target_node,
                &edge.target_port,
            ) && other.metadata == edge.metadata
        });
        if !matched {
            return false;
        }
    }

    // Duplicate identical initials are legal, so existence checks are not
    // enough: every tuple must occur the same number of times on both sides.
    if a.initials().len() != b.initials().len() {
        return false;
    }
    for initial in a.initials() {
        let in_a = a.initials().iter().filter(|i| *i == initial).count();
        let in_b = b.initials().iter().filter(|i| *i == initial).count();
        if in_a != in_b {
            return false;
        }
    }

    if a.groups().len() != b.groups().len() {
        return false;
    }
    for group in a.groups() {
        let members: BTreeSet<&str> = group.nodes.iter().map(String::as_str).collect();
        let matched = b.group(&group.name).is_some_and(|other| {
            let other_members: BTreeSet<&str> = other.nodes.iter().map(String::as_str).collect();
            other_members == members && other.metadata == group.metadata
        });
        if !matched {
            return false;
        }
    }

    if a.exported_ports().len() != b.exported_ports().len() {
        return false;
    }
    for port in a.exported_ports() {
        let matched = b.exported_ports().iter().any(|other| {
            other.direction == port.direction
                && other.public_name == port.public_name
                && other.node == port.node
                && other.port == port.port
                && other.metadata == port.metadata
        });
        if !matched {
            return false;
        }
    }

    true
}
