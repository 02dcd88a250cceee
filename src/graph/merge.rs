//! Theirs-wins merge of two documents
//!
//! Computes the operations that transform one document's state into
//! another's and applies them through the normal mutation API, so an attached
//! journal records the whole reconciliation as a single transaction. On any
//! conflicting entity the source document's value is adopted.

use crate::graph::{equivalence::equivalent, Edge, Graph, Initial};
use crate::types::{GraphError, Metadata};
use serde_json::Value;
use std::collections::BTreeSet;

/// Transaction id used when the merge opens its own transaction
const MERGE_TRANSACTION: &str = "merge";

/// Make `target` structurally equivalent to `source`, resolving every
/// conflict in `source`'s favor.
///
/// Diffs entity by entity: nodes by id, edges by endpoint tuple, initials by
/// (data, target) tuple, groups by name, exported ports by direction and
/// public name, plus the graph-level properties. Metadata differences are
/// replaced wholesale with the source's map. If no transaction is open the
/// merge brackets itself in one named `"merge"`, so a following `undo()`
/// restores the pre-merge state in a single step.
pub fn merge_resolve_theirs(target: &mut Graph, source: &Graph) -> Result<(), GraphError> {
    let opened = !target.in_transaction();
    if opened {
        target.start_transaction(MERGE_TRANSACTION)?;
    }
    let result = merge_inner(target, source);
    if opened {
        target.end_transaction(MERGE_TRANSACTION)?;
    }
    tracing::debug!(
        succeeded = result.is_ok(),
        equivalent = equivalent(target, source),
        "merge applied"
    );
    result
}

fn merge_inner(target: &mut Graph, source: &Graph) -> Result<(), GraphError> {
    // Nodes: removals first so cascades run before anything is re-added.
    let stale: Vec<String> = target
        .nodes()
        .iter()
        .filter(|n| source.node(&n.id).is_none())
        .map(|n| n.id.clone())
        .collect();
    for id in stale {
        target.remove_node(&id)?;
    }

    for node in source.nodes() {
        match target.node(&node.id).cloned() {
            None => {
                target.add_node(&node.id, &node.component)?;
                if !node.metadata.is_empty() {
                    target.set_node_metadata(&node.id, node.metadata.clone())?;
                }
            }
            Some(existing) if existing.component != node.component => {
                target.remove_node(&node.id)?;
                target.add_node(&node.id, &node.component)?;
                if !node.metadata.is_empty() {
                    target.set_node_metadata(&node.id, node.metadata.clone())?;
                }
            }
            Some(existing) => {
                if existing.metadata != node.metadata {
                    target
                        .set_node_metadata(&node.id, replace_patch(&existing.metadata, &node.metadata))?;
                }
            }
        }
    }

    // Edges: compare by endpoint tuple. Node cascades above may already have
    // dropped some of the target's edges, so snapshot afterwards.
    let target_edges: Vec<Edge> = target.edges().to_vec();
    for edge in &target_edges {
        if lookup_edge(source, edge).is_none() {
            target.remove_edge(
                &edge.source_node,
                &edge.source_port,
                &edge.target_node,
                &edge.target_port,
            )?;
        }
    }
    for edge in source.edges() {
        match lookup_edge(target, edge).cloned() {
            None => {
                target.add_edge(
                    &edge.source_node,
                    &edge.source_port,
                    &edge.target_node,
                    &edge.target_port,
                )?;
                if !edge.metadata.is_empty() {
                    target.set_edge_metadata(
                        &edge.source_node,
                        &edge.source_port,
                        &edge.target_node,
                        &edge.target_port,
                        edge.metadata.clone(),
                    )?;
                }
            }
            Some(existing) => {
                if existing.metadata != edge.metadata {
                    target.set_edge_metadata(
                        &edge.source_node,
                        &edge.source_port,
                        &edge.target_node,
                        &edge.target_port,
                        replace_patch(&existing.metadata, &edge.metadata),
                    )?;
                }
            }
        }
    }

    // Initials may hold identical duplicates, so the diff goes by
    // multiplicity of the full tuple: drop every target occurrence beyond the
    // source's count, then add the source's deficit. A metadata difference
    // falls out as one removal plus one insertion.
    let target_initials: Vec<Initial> = target.initials().to_vec();
    for (idx, initial) in target_initials.iter().enumerate() {
        let kept_before = target_initials[..idx].iter().filter(|i| *i == initial).count();
        let wanted = source.initials().iter().filter(|i| *i == initial).count();
        if kept_before >= wanted {
            target.remove_initial_exact(initial)?;
        }
    }
    for (idx, initial) in source.initials().iter().enumerate() {
        let needed = source.initials()[..=idx]
            .iter()
            .filter(|i| *i == initial)
            .count();
        let have = target.initials().iter().filter(|i| *i == initial).count();
        if have < needed {
            target.insert_initial(initial.clone())?;
        }
    }

    // Groups: differing membership replaces the group entirely; a pure
    // metadata difference is a metadata set.
    let stale_groups: Vec<String> = target
        .groups()
        .iter()
        .filter(|g| source.group(&g.name).is_none())
        .map(|g| g.name.clone())
        .collect();
    for name in stale_groups {
        target.remove_group(&name)?;
    }
    for group in source.groups() {
        match target.group(&group.name).cloned() {
            None => {
                target.add_group(&group.name, group.nodes.clone(), group.metadata.clone())?;
            }
            Some(existing) => {
                let theirs: BTreeSet<&str> = group.nodes.iter().map(String::as_str).collect();
                let ours: BTreeSet<&str> = existing.nodes.iter().map(String::as_str).collect();
                if ours != theirs {
                    target.remove_group(&group.name)?;
                    target.add_group(&group.name, group.nodes.clone(), group.metadata.clone())?;
                } else if existing.metadata != group.metadata {
                    target.set_group_metadata(
                        &group.name,
                        replace_patch(&existing.metadata, &group.metadata),
                    )?;
                }
            }
        }
    }

    // Exported ports: any difference is remove + re-add with the source's
    // definition.
    let target_ports: Vec<_> = target.exported_ports().to_vec();
    for port in &target_ports {
        let counterpart = source
            .exported_ports()
            .iter()
            .find(|p| p.direction == port.direction && p.public_name == port.public_name);
        if counterpart != Some(port) {
            match port.direction {
                crate::graph::PortDirection::In => target.remove_inport(&port.public_name)?,
                crate::graph::PortDirection::Out => target.remove_outport(&port.public_name)?,
            }
        }
    }
    for port in source.exported_ports() {
        let present = target
            .exported_ports()
            .iter()
            .any(|p| p.direction == port.direction && p.public_name == port.public_name);
        if !present {
            match port.direction {
                crate::graph::PortDirection::In => target.add_inport(
                    &port.public_name,
                    &port.node,
                    &port.port,
                    port.metadata.clone(),
                )?,
                crate::graph::PortDirection::Out => target.add_outport(
                    &port.public_name,
                    &port.node,
                    &port.port,
                    port.metadata.clone(),
                )?,
            }
        }
    }

    // Graph-level properties.
    if target.properties() != source.properties() {
        let patch = replace_patch(target.properties(), source.properties());
        target.set_graph_metadata(patch)?;
    }

    Ok(())
}

fn lookup_edge<'a>(graph: &'a Graph, edge: &Edge) -> Option<&'a Edge> {
    graph.edge(
        &edge.source_node,
        &edge.source_port,
        &edge.target_node,
        &edge.target_port,
    )
}

/// Build a patch that replaces `old` with `new` wholesale through the
/// shallow-merge patch API: every key of `new`, plus `null` for keys only in
/// `old` so they are deleted.
fn replace_patch(old: &Metadata, new: &Metadata) -> Metadata {
    let mut patch = new.clone();
    for key in old.keys() {
        if !new.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_merge_adds_and_removes_nodes() {
        let mut target = Graph::new();
        target.add_node("Old", "c").unwrap();

        let mut source = Graph::new();
        source.add_node("New", "c").unwrap();

        merge_resolve_theirs(&mut target, &source).unwrap();
        assert!(target.node("Old").is_none());
        assert!(target.node("New").is_some());
        assert!(equivalent(&target, &source));
    }

    #[test]
    fn test_merge_replaces_metadata_wholesale() {
        let mut target = Graph::new();
        target.add_node("Foo", "c").unwrap();
        target
            .set_node_metadata("Foo", meta(&[("ours", json!(1)), ("shared", json!("a"))]))
            .unwrap();

        let mut source = Graph::new();
        source.add_node("Foo", "c").unwrap();
        source
            .set_node_metadata("Foo", meta(&[("shared", json!("b"))]))
            .unwrap();

        merge_resolve_theirs(&mut target, &source).unwrap();
        let m = &target.node("Foo").unwrap().metadata;
        assert_eq!(m.get("shared"), Some(&json!("b")));
        assert!(!m.contains_key("ours"));
        assert!(equivalent(&target, &source));
    }

    #[test]
    fn test_merge_produces_single_change_set() {
        let mut target = Graph::new();
        target.add_node("A", "c").unwrap();
        target.take_changes();

        let mut source = Graph::new();
        source.add_node("B", "c").unwrap();
        source.add_node("C", "c").unwrap();
        source.add_edge("B", "out", "C", "in").unwrap();

        merge_resolve_theirs(&mut target, &source).unwrap();
        let changes = target.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].transaction_id, "merge");
        assert!(equivalent(&target, &source));
    }

    #[test]
    fn test_merge_trims_surplus_duplicate_initials() {
        let mut target = Graph::new();
        target.add_node("Foo", "c").unwrap();
        target.add_initial(json!("x"), "Foo", "in").unwrap();
        target.add_initial(json!("x"), "Foo", "in").unwrap();

        let mut source = Graph::new();
        source.add_node("Foo", "c").unwrap();
        source.add_initial(json!("x"), "Foo", "in").unwrap();

        merge_resolve_theirs(&mut target, &source).unwrap();
        assert_eq!(target.initials().len(), 1);
        assert!(equivalent(&target, &source));
    }

    #[test]
    fn test_merge_adds_missing_duplicate_initials() {
        let mut target = Graph::new();
        target.add_node("Foo", "c").unwrap();
        target.add_initial(json!("x"), "Foo", "in").unwrap();

        let mut source = Graph::new();
        source.add_node("Foo", "c").unwrap();
        source.add_initial(json!("x"), "Foo", "in").unwrap();
        source.add_initial(json!("x"), "Foo", "in").unwrap();

        merge_resolve_theirs(&mut target, &source).unwrap();
        assert_eq!(target.initials().len(), 2);
        assert!(equivalent(&target, &source));
    }

    #[test]
    fn test_merge_group_membership_conflict() {
        let mut target = Graph::new();
        target
            .add_group("g", vec!["A".to_string()], meta(&[("label", json!("ours"))]))
            .unwrap();

        let mut source = Graph::new();
        source
            .add_group("g", vec!["B".to_string()], Metadata::new())
            .unwrap();

        merge_resolve_theirs(&mut target, &source).unwrap();
        let group = target.group("g").unwrap();
        assert_eq!(group.nodes, vec!["B".to_string()]);
        assert!(group.metadata.is_empty());
    }
}
