//! Loading documents from the structured interchange format
//!
//! The external representation is a JSON object with `properties`, `inports`,
//! `outports`, `groups`, `processes`, and `connections` sections. Loading
//! validates that every referenced process id exists; a failed load returns an
//! error and never yields a partially populated document.

use crate::graph::{Graph, Initial};
use crate::types::{Error, GraphError, Metadata, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One process declaration: component name plus metadata
#[derive(Debug, Deserialize)]
struct ProcessDef {
    component: String,
    #[serde(default)]
    metadata: Metadata,
}

/// Endpoint of a connection: process id and port name
#[derive(Debug, Deserialize)]
struct EndpointDef {
    process: String,
    port: String,
}

/// A connection: either an edge (`src` present) or an initial (`data` present)
#[derive(Debug, Deserialize)]
struct ConnectionDef {
    #[serde(default)]
    src: Option<EndpointDef>,
    tgt: EndpointDef,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    metadata: Metadata,
}

/// An exported port definition
#[derive(Debug, Deserialize)]
struct PortDef {
    process: String,
    port: String,
    #[serde(default)]
    metadata: Metadata,
}

/// A group definition
#[derive(Debug, Deserialize)]
struct GroupDef {
    name: String,
    #[serde(default)]
    nodes: Vec<String>,
    #[serde(default)]
    metadata: Metadata,
}

/// Top-level document layout. BTreeMaps keep process and port iteration
/// deterministic, which keeps journal replay of loaded documents
/// reproducible.
#[derive(Debug, Deserialize)]
struct DocumentDef {
    #[serde(default)]
    properties: Metadata,
    #[serde(default)]
    inports: BTreeMap<String, PortDef>,
    #[serde(default)]
    outports: BTreeMap<String, PortDef>,
    #[serde(default)]
    groups: Vec<GroupDef>,
    #[serde(default)]
    processes: BTreeMap<String, ProcessDef>,
    #[serde(default)]
    connections: Vec<ConnectionDef>,
}

/// Parse a serialized document into a populated [`Graph`].
///
/// Every `connections`/`inports`/`outports` reference to a process id missing
/// from `processes` fails with [`GraphError::InvalidReference`]; malformed
/// JSON surfaces as [`Error::Parse`].
pub fn load_json(source: &str) -> Result<Graph> {
    let def: DocumentDef = serde_json::from_str(source)?;
    build(def).map_err(Error::from)
}

fn build(def: DocumentDef) -> std::result::Result<Graph, GraphError> {
    let mut graph = Graph::new();

    if !def.properties.is_empty() {
        graph.set_graph_metadata(def.properties)?;
    }

    for (id, process) in def.processes {
        graph.add_node(&id, &process.component)?;
        if !process.metadata.is_empty() {
            graph.set_node_metadata(&id, process.metadata)?;
        }
    }

    for connection in def.connections {
        match (connection.src, connection.data) {
            (Some(src), None) => {
                graph.add_edge(
                    &src.process,
                    &src.port,
                    &connection.tgt.process,
                    &connection.tgt.port,
                )?;
                if !connection.metadata.is_empty() {
                    graph.set_edge_metadata(
                        &src.process,
                        &src.port,
                        &connection.tgt.process,
                        &connection.tgt.port,
                        connection.metadata,
                    )?;
                }
            }
            (None, Some(data)) => {
                let mut initial =
                    Initial::new(data, &connection.tgt.process, &connection.tgt.port);
                initial.metadata = connection.metadata;
                graph.insert_initial(initial)?;
            }
            _ => {
                return Err(GraphError::InvalidReference(format!(
                    "connection to {} {} needs exactly one of src or data",
                    connection.tgt.process, connection.tgt.port
                )));
            }
        }
    }

    for (public_name, port) in def.inports {
        graph.add_inport(&public_name, &port.process, &port.port, port.metadata)?;
    }
    for (public_name, port) in def.outports {
        graph.add_outport(&public_name, &port.process, &port.port, port.metadata)?;
    }

    for group in def.groups {
        graph.add_group(&group.name, group.nodes, group.metadata)?;
    }

    // The construction above committed implicit change sets; a freshly loaded
    // document starts with a clean outbox.
    graph.take_changes();
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_document() {
        let graph = load_json(
            r#"{
                "processes": {
                    "Foo": { "component": "Bar" },
                    "Baz": { "component": "Foo", "metadata": { "x": 1 } }
                },
                "connections": [
                    { "src": { "process": "Foo", "port": "out" },
                      "tgt": { "process": "Baz", "port": "in" } },
                    { "data": 42, "tgt": { "process": "Foo", "port": "in" } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.initials().len(), 1);
        assert_eq!(
            graph.node("Baz").unwrap().metadata.get("x"),
            Some(&serde_json::json!(1))
        );
    }

    #[test]
    fn test_load_rejects_unknown_process() {
        let err = load_json(
            r#"{
                "processes": { "Foo": { "component": "Bar" } },
                "connections": [
                    { "src": { "process": "Foo", "port": "out" },
                      "tgt": { "process": "Ghost", "port": "in" } }
                ]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Graph(GraphError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        assert!(matches!(load_json("{ nope"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_loaded_graph_has_clean_outbox() {
        let mut graph = load_json(r#"{ "processes": { "A": { "component": "c" } } }"#).unwrap();
        assert!(graph.take_changes().is_empty());
    }
}
