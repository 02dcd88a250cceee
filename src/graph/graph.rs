//! In-memory document store for flow graphs
//!
//! The [`Graph`] holds the live document state and exposes the mutation API.
//! Every mutation validates its inputs, applies the change by interpreting an
//! [`AtomicOp`], and records the op into the current transaction. Committed
//! transactions accumulate in an outbox of [`ChangeSet`]s that the journal
//! drains; replayed operations bypass the outbox entirely.
//!
//! Mutations are atomic at the call level: a failed call returns an error and
//! leaves both the document and the transaction buffer untouched.

use crate::graph::ops::{AtomicOp, ChangeSet};
use crate::graph::{Edge, ExportedPort, Group, Initial, Node, PortDirection};
use crate::types::{GraphError, Metadata};
use serde_json::Value;

/// Transaction id used for unbracketed single mutations
pub const IMPLICIT_TRANSACTION: &str = "implicit";

/// An open transaction buffering ops until `end_transaction`
#[derive(Debug)]
struct OpenTransaction {
    id: String,
    ops: Vec<AtomicOp>,
}

/// The document store: nodes, edges, initials, groups, exported ports, and
/// graph-level properties, plus the transaction machinery that feeds the
/// journal.
///
/// Node insertion order is preserved and significant for iteration; the other
/// collections preserve insertion order for replay determinism but compare as
/// unordered sets (see [`equivalent`](crate::graph::equivalent)).
#[derive(Debug)]
pub struct Graph {
    properties: Metadata,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    initials: Vec<Initial>,
    groups: Vec<Group>,
    ports: Vec<ExportedPort>,
    transaction: Option<OpenTransaction>,
    outbox: Vec<ChangeSet>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Graph {
    /// Snapshot the document state. The clone starts with no open transaction
    /// and an empty outbox; it is a plain copy of the data, not of the
    /// journaling machinery.
    fn clone(&self) -> Self {
        Self {
            properties: self.properties.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            initials: self.initials.clone(),
            groups: self.groups.clone(),
            ports: self.ports.clone(),
            transaction: None,
            outbox: Vec::new(),
        }
    }
}

impl Graph {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            properties: Metadata::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            initials: Vec::new(),
            groups: Vec::new(),
            ports: Vec::new(),
            transaction: None,
            outbox: Vec::new(),
        }
    }

    // ---- accessors -------------------------------------------------------

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All edges
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up an edge by its endpoint tuple
    pub fn edge(&self, sn: &str, sp: &str, tn: &str, tp: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.matches(sn, sp, tn, tp))
    }

    /// All initial values
    pub fn initials(&self) -> &[Initial] {
        &self.initials
    }

    /// All groups
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Look up a group by name
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// All exported ports, both directions
    pub fn exported_ports(&self) -> &[ExportedPort] {
        &self.ports
    }

    /// Exported input ports
    pub fn inports(&self) -> impl Iterator<Item = &ExportedPort> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::In)
    }

    /// Exported output ports
    pub fn outports(&self) -> impl Iterator<Item = &ExportedPort> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Out)
    }

    /// Graph-level properties
    pub fn properties(&self) -> &Metadata {
        &self.properties
    }

    /// True while an explicit transaction is open
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    // ---- transactions ----------------------------------------------------

    /// Open an explicit transaction. All mutations until the matching
    /// `end_transaction` are committed as a single revision.
    pub fn start_transaction(&mut self, id: &str) -> Result<(), GraphError> {
        if let Some(open) = &self.transaction {
            return Err(GraphError::TransactionInProgress(open.id.clone()));
        }
        self.transaction = Some(OpenTransaction {
            id: id.to_string(),
            ops: Vec::new(),
        });
        Ok(())
    }

    /// Close the open transaction and commit its ops as one change set.
    /// The id must match the one passed to `start_transaction`.
    pub fn end_transaction(&mut self, id: &str) -> Result<(), GraphError> {
        match &self.transaction {
            Some(open) if open.id == id => {}
            _ => return Err(GraphError::NoTransaction(id.to_string())),
        }
        let open = self.transaction.take().expect("transaction checked above");
        self.commit(open);
        Ok(())
    }

    fn commit(&mut self, open: OpenTransaction) {
        tracing::debug!(
            transaction = %open.id,
            ops = open.ops.len(),
            "transaction committed"
        );
        self.outbox.push(ChangeSet {
            transaction_id: open.id,
            ops: open.ops,
        });
    }

    /// Open an implicit transaction if none is open. Returns true when this
    /// call opened one and must therefore also close it.
    fn open_implicit(&mut self) -> bool {
        if self.transaction.is_none() {
            self.transaction = Some(OpenTransaction {
                id: IMPLICIT_TRANSACTION.to_string(),
                ops: Vec::new(),
            });
            true
        } else {
            false
        }
    }

    fn close_implicit(&mut self, opened: bool) {
        if opened {
            if let Some(open) = self.transaction.take() {
                self.commit(open);
            }
        }
    }

    /// Record an already-applied op into the open transaction
    fn record(&mut self, op: AtomicOp) {
        match &mut self.transaction {
            Some(open) => open.ops.push(op),
            None => self.outbox.push(ChangeSet {
                transaction_id: IMPLICIT_TRANSACTION.to_string(),
                ops: vec![op],
            }),
        }
    }

    /// Apply and record in one step
    fn execute(&mut self, op: AtomicOp) -> Result<(), GraphError> {
        self.apply(&op)?;
        self.record(op);
        Ok(())
    }

    /// Drain committed change sets. Consumed by the journal.
    pub(crate) fn take_changes(&mut self) -> Vec<ChangeSet> {
        std::mem::take(&mut self.outbox)
    }

    /// Apply an op without recording it. Used by the journal when replaying
    /// forward or inverse operations; replayed changes must not be
    /// re-journaled.
    pub(crate) fn replay(&mut self, op: &AtomicOp) -> Result<(), GraphError> {
        self.apply(op)
    }

    // ---- mutation API ----------------------------------------------------

    /// Add a node. Fails with `DuplicateId` if the id is taken.
    pub fn add_node(&mut self, id: &str, component: &str) -> Result<(), GraphError> {
        self.execute(AtomicOp::AddNode(Node::new(id, component)))
    }

    /// Remove a node and, in the same transaction, every edge, initial, and
    /// exported port referencing it. Group membership is left dangling.
    pub fn remove_node(&mut self, id: &str) -> Result<(), GraphError> {
        if self.node(id).is_none() {
            return Err(GraphError::NotFound(id.to_string()));
        }
        let opened = self.open_implicit();

        let touching: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| e.touches(id))
            .cloned()
            .collect();
        for edge in touching {
            self.clear_and_remove_edge(&edge)?;
        }

        let bound: Vec<Initial> = self
            .initials
            .iter()
            .filter(|i| i.target_node == id)
            .cloned()
            .collect();
        for initial in bound {
            self.execute(AtomicOp::RemoveInitial(initial))?;
        }

        let exported: Vec<ExportedPort> = self
            .ports
            .iter()
            .filter(|p| p.node == id)
            .cloned()
            .collect();
        for port in exported {
            self.execute(AtomicOp::RemoveExportedPort(port))?;
        }

        // Clear metadata before removal so the removal op itself is
        // metadata-free and the transcript stays canonical.
        let before = self.node(id).expect("node checked above").metadata.clone();
        self.execute(AtomicOp::SetNodeMetadata {
            id: id.to_string(),
            before,
            after: Metadata::new(),
        })?;
        let node = self.node(id).expect("node checked above").clone();
        self.execute(AtomicOp::RemoveNode(node))?;

        self.close_implicit(opened);
        Ok(())
    }

    /// Add an edge. Fails with `InvalidReference` if either endpoint node is
    /// missing, `DuplicateId` if the exact edge already exists.
    pub fn add_edge(&mut self, sn: &str, sp: &str, tn: &str, tp: &str) -> Result<(), GraphError> {
        self.execute(AtomicOp::AddEdge(Edge::new(sn, sp, tn, tp)))
    }

    /// Remove an edge. Fails with `NotFound` if no exact endpoint match
    /// exists; there is no silent no-op.
    pub fn remove_edge(&mut self, sn: &str, sp: &str, tn: &str, tp: &str) -> Result<(), GraphError> {
        let edge = self
            .edge(sn, sp, tn, tp)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(format!("{sn} {sp} -> {tp} {tn}")))?;
        let opened = self.open_implicit();
        self.clear_and_remove_edge(&edge)?;
        self.close_implicit(opened);
        Ok(())
    }

    /// Clear edge metadata, then remove it. Two ops, same transaction.
    fn clear_and_remove_edge(&mut self, edge: &Edge) -> Result<(), GraphError> {
        self.execute(AtomicOp::SetEdgeMetadata {
            source_node: edge.source_node.clone(),
            source_port: edge.source_port.clone(),
            target_node: edge.target_node.clone(),
            target_port: edge.target_port.clone(),
            before: edge.metadata.clone(),
            after: Metadata::new(),
        })?;
        let mut cleared = edge.clone();
        cleared.metadata = Metadata::new();
        self.execute(AtomicOp::RemoveEdge(cleared))
    }

    /// Bind a literal value to a port. Fails with `InvalidReference` if the
    /// target node is missing.
    pub fn add_initial(&mut self, data: Value, tn: &str, tp: &str) -> Result<(), GraphError> {
        self.execute(AtomicOp::AddInitial(Initial::new(data, tn, tp)))
    }

    /// Remove every initial bound to the given port. Fails with `NotFound`
    /// if none are bound.
    pub fn remove_initial(&mut self, tn: &str, tp: &str) -> Result<(), GraphError> {
        let bound: Vec<Initial> = self
            .initials
            .iter()
            .filter(|i| i.target_node == tn && i.target_port == tp)
            .cloned()
            .collect();
        if bound.is_empty() {
            return Err(GraphError::NotFound(format!("{tn} {tp}")));
        }
        let opened = self.open_implicit();
        for initial in bound {
            self.execute(AtomicOp::RemoveInitial(initial))?;
        }
        self.close_implicit(opened);
        Ok(())
    }

    /// Insert a fully-formed initial, metadata included. Merge needs this to
    /// adopt a source document's initial verbatim.
    pub(crate) fn insert_initial(&mut self, initial: Initial) -> Result<(), GraphError> {
        self.execute(AtomicOp::AddInitial(initial))
    }

    /// Remove one initial by its full identity tuple. Unlike
    /// [`remove_initial`](Self::remove_initial) this does not sweep the whole
    /// port; merge uses it to drop a single non-matching entry.
    pub(crate) fn remove_initial_exact(&mut self, initial: &Initial) -> Result<(), GraphError> {
        self.execute(AtomicOp::RemoveInitial(initial.clone()))
    }

    /// Add a group. Member ids are not validated; groups may reference nodes
    /// that do not (or no longer) exist.
    pub fn add_group(
        &mut self,
        name: &str,
        nodes: Vec<String>,
        metadata: Metadata,
    ) -> Result<(), GraphError> {
        self.execute(AtomicOp::AddGroup(Group::new(name, nodes, metadata)))
    }

    /// Remove a group by name. Fails with `NotFound` if absent.
    pub fn remove_group(&mut self, name: &str) -> Result<(), GraphError> {
        let group = self
            .group(name)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(name.to_string()))?;
        let opened = self.open_implicit();
        self.execute(AtomicOp::SetGroupMetadata {
            name: name.to_string(),
            before: group.metadata.clone(),
            after: Metadata::new(),
        })?;
        let mut cleared = group;
        cleared.metadata = Metadata::new();
        self.execute(AtomicOp::RemoveGroup(cleared))?;
        self.close_implicit(opened);
        Ok(())
    }

    /// Export an input port under a public name
    pub fn add_inport(
        &mut self,
        public_name: &str,
        node: &str,
        port: &str,
        metadata: Metadata,
    ) -> Result<(), GraphError> {
        self.add_exported_port(PortDirection::In, public_name, node, port, metadata)
    }

    /// Export an output port under a public name
    pub fn add_outport(
        &mut self,
        public_name: &str,
        node: &str,
        port: &str,
        metadata: Metadata,
    ) -> Result<(), GraphError> {
        self.add_exported_port(PortDirection::Out, public_name, node, port, metadata)
    }

    fn add_exported_port(
        &mut self,
        direction: PortDirection,
        public_name: &str,
        node: &str,
        port: &str,
        metadata: Metadata,
    ) -> Result<(), GraphError> {
        self.execute(AtomicOp::AddExportedPort(ExportedPort::new(
            direction,
            public_name,
            node,
            port,
            metadata,
        )))
    }

    /// Remove an exported input port by public name
    pub fn remove_inport(&mut self, public_name: &str) -> Result<(), GraphError> {
        self.remove_exported_port(PortDirection::In, public_name)
    }

    /// Remove an exported output port by public name
    pub fn remove_outport(&mut self, public_name: &str) -> Result<(), GraphError> {
        self.remove_exported_port(PortDirection::Out, public_name)
    }

    fn remove_exported_port(
        &mut self,
        direction: PortDirection,
        public_name: &str,
    ) -> Result<(), GraphError> {
        let port = self
            .ports
            .iter()
            .find(|p| p.direction == direction && p.public_name == public_name)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(public_name.to_string()))?;
        self.execute(AtomicOp::RemoveExportedPort(port))
    }

    /// Merge a patch into a node's metadata. Keys in the patch overwrite,
    /// `null` values delete keys, other keys are untouched.
    pub fn set_node_metadata(&mut self, id: &str, patch: Metadata) -> Result<(), GraphError> {
        let before = self
            .node(id)
            .map(|n| n.metadata.clone())
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        let after = merge_patch(&before, patch);
        self.execute(AtomicOp::SetNodeMetadata {
            id: id.to_string(),
            before,
            after,
        })
    }

    /// Merge a patch into an edge's metadata (same patch semantics as
    /// [`set_node_metadata`](Self::set_node_metadata))
    pub fn set_edge_metadata(
        &mut self,
        sn: &str,
        sp: &str,
        tn: &str,
        tp: &str,
        patch: Metadata,
    ) -> Result<(), GraphError> {
        let before = self
            .edge(sn, sp, tn, tp)
            .map(|e| e.metadata.clone())
            .ok_or_else(|| GraphError::NotFound(format!("{sn} {sp} -> {tp} {tn}")))?;
        let after = merge_patch(&before, patch);
        self.execute(AtomicOp::SetEdgeMetadata {
            source_node: sn.to_string(),
            source_port: sp.to_string(),
            target_node: tn.to_string(),
            target_port: tp.to_string(),
            before,
            after,
        })
    }

    /// Merge a patch into a group's metadata
    pub fn set_group_metadata(&mut self, name: &str, patch: Metadata) -> Result<(), GraphError> {
        let before = self
            .group(name)
            .map(|g| g.metadata.clone())
            .ok_or_else(|| GraphError::NotFound(name.to_string()))?;
        let after = merge_patch(&before, patch);
        self.execute(AtomicOp::SetGroupMetadata {
            name: name.to_string(),
            before,
            after,
        })
    }

    /// Merge a patch into the graph-level properties
    pub fn set_graph_metadata(&mut self, patch: Metadata) -> Result<(), GraphError> {
        let before = self.properties.clone();
        let after = merge_patch(&before, patch);
        self.execute(AtomicOp::SetGraphMetadata { before, after })
    }

    // ---- op interpreter --------------------------------------------------

    /// Interpret one op against the current state. Validation failures leave
    /// the document unchanged.
    fn apply(&mut self, op: &AtomicOp) -> Result<(), GraphError> {
        match op {
            AtomicOp::AddNode(node) => {
                if self.node(&node.id).is_some() {
                    return Err(GraphError::DuplicateId(node.id.clone()));
                }
                self.nodes.push(node.clone());
            }
            AtomicOp::RemoveNode(node) => {
                let idx = self
                    .nodes
                    .iter()
                    .position(|n| n.id == node.id)
                    .ok_or_else(|| GraphError::NotFound(node.id.clone()))?;
                self.nodes.remove(idx);
            }
            AtomicOp::AddEdge(edge) => {
                for endpoint in [&edge.source_node, &edge.target_node] {
                    if self.node(endpoint).is_none() {
                        return Err(GraphError::InvalidReference(endpoint.clone()));
                    }
                }
                if self
                    .edge(
                        &edge.source_node,
                        &edge.source_port,
                        &edge.target_node,
                        &edge.target_port,
                    )
                    .is_some()
                {
                    return Err(GraphError::DuplicateId(format!(
                        "{} {} -> {} {}",
                        edge.source_node, edge.source_port, edge.target_port, edge.target_node
                    )));
                }
                self.edges.push(edge.clone());
            }
            AtomicOp::RemoveEdge(edge) => {
                let idx = self
                    .edges
                    .iter()
                    .position(|e| {
                        e.matches(
                            &edge.source_node,
                            &edge.source_port,
                            &edge.target_node,
                            &edge.target_port,
                        )
                    })
                    .ok_or_else(|| {
                        GraphError::NotFound(format!(
                            "{} {} -> {} {}",
                            edge.source_node, edge.source_port, edge.target_port, edge.target_node
                        ))
                    })?;
                self.edges.remove(idx);
            }
            AtomicOp::AddInitial(initial) => {
                if self.node(&initial.target_node).is_none() {
                    return Err(GraphError::InvalidReference(initial.target_node.clone()));
                }
                self.initials.push(initial.clone());
            }
            AtomicOp::RemoveInitial(initial) => {
                let idx = self
                    .initials
                    .iter()
                    .position(|i| *i == *initial)
                    .ok_or_else(|| {
                        GraphError::NotFound(format!(
                            "{} {}",
                            initial.target_node, initial.target_port
                        ))
                    })?;
                self.initials.remove(idx);
            }
            AtomicOp::AddGroup(group) => {
                if self.group(&group.name).is_some() {
                    return Err(GraphError::DuplicateId(group.name.clone()));
                }
                self.groups.push(group.clone());
            }
            AtomicOp::RemoveGroup(group) => {
                let idx = self
                    .groups
                    .iter()
                    .position(|g| g.name == group.name)
                    .ok_or_else(|| GraphError::NotFound(group.name.clone()))?;
                self.groups.remove(idx);
            }
            AtomicOp::AddExportedPort(port) => {
                if self.node(&port.node).is_none() {
                    return Err(GraphError::InvalidReference(port.node.clone()));
                }
                if self
                    .ports
                    .iter()
                    .any(|p| p.direction == port.direction && p.public_name == port.public_name)
                {
                    return Err(GraphError::DuplicateId(port.public_name.clone()));
                }
                self.ports.push(port.clone());
            }
            AtomicOp::RemoveExportedPort(port) => {
                let idx = self
                    .ports
                    .iter()
                    .position(|p| p.direction == port.direction && p.public_name == port.public_name)
                    .ok_or_else(|| GraphError::NotFound(port.public_name.clone()))?;
                self.ports.remove(idx);
            }
            AtomicOp::SetNodeMetadata { id, after, .. } => {
                let node = self
                    .nodes
                    .iter_mut()
                    .find(|n| n.id == *id)
                    .ok_or_else(|| GraphError::NotFound(id.clone()))?;
                node.metadata = after.clone();
            }
            AtomicOp::SetEdgeMetadata {
                source_node,
                source_port,
                target_node,
                target_port,
                after,
                ..
            } => {
                let edge = self
                    .edges
                    .iter_mut()
                    .find(|e| e.matches(source_node, source_port, target_node, target_port))
                    .ok_or_else(|| {
                        GraphError::NotFound(format!(
                            "{source_node} {source_port} -> {target_port} {target_node}"
                        ))
                    })?;
                edge.metadata = after.clone();
            }
            AtomicOp::SetGroupMetadata { name, after, .. } => {
                let group = self
                    .groups
                    .iter_mut()
                    .find(|g| g.name == *name)
                    .ok_or_else(|| GraphError::NotFound(name.clone()))?;
                group.metadata = after.clone();
            }
            AtomicOp::SetGraphMetadata { after, .. } => {
                self.properties = after.clone();
            }
        }
        Ok(())
    }
}

/// Shallow-merge a patch into a metadata map: patch keys overwrite, `null`
/// values delete, untouched keys survive.
fn merge_patch(before: &Metadata, patch: Metadata) -> Metadata {
    let mut after = before.clone();
    for (key, value) in patch {
        if value.is_null() {
            after.remove(&key);
        } else {
            after.insert(key, value);
        }
    }
    after
}
