//! Transaction journal: recording, replay, undo/redo, and transcripts
//!
//! The [`Journal`] owns a [`Graph`] and consumes the change sets its
//! mutations commit, turning each into a revision-numbered
//! [`TransactionEntry`]. History is linear: replaying forward or inverse
//! operations moves the live document to any recorded revision, and any new
//! mutation made below the newest revision discards the redo tail.
//!
//! Because ingestion happens by draining the graph's outbox, every journal
//! entry point takes `&mut self` and synchronizes first; there is no listener
//! registration and no ordering concern between the store and the journal.

use crate::graph::{AtomicOp, Graph};
use crate::types::{JournalError, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Transaction id of the synthesized revision-0 entry
pub const INITIAL_TRANSACTION: &str = "initial";

/// One recorded transaction: a revision number, the caller's transaction id,
/// and the operations in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    /// Revision this entry produced; the document state "at revision N" is
    /// the state after applying entries 0..=N
    pub revision: u64,
    /// Caller-supplied transaction id
    pub transaction_id: String,
    /// Operations in application order
    pub ops: Vec<AtomicOp>,
}

/// Ordered, revision-indexed sequence of journal entries
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct JournalStore {
    entries: Vec<TransactionEntry>,
}

impl JournalStore {
    /// Highest recorded revision
    pub fn last_revision(&self) -> u64 {
        self.entries.len().saturating_sub(1) as u64
    }

    /// Entry at the given revision, if recorded
    pub fn entry(&self, revision: u64) -> Option<&TransactionEntry> {
        self.entries.get(revision as usize)
    }

    /// All recorded entries in revision order
    pub fn entries(&self) -> &[TransactionEntry] {
        &self.entries
    }

    fn push(&mut self, entry: TransactionEntry) {
        self.entries.push(entry);
    }

    /// Drop every entry above the given revision
    fn truncate(&mut self, revision: u64) {
        self.entries.truncate(revision as usize + 1);
    }
}

/// The journal: owns the document, records its transactions, and replays
/// them to move the document through its history.
#[derive(Debug)]
pub struct Journal {
    graph: Graph,
    store: JournalStore,
    current_revision: u64,
}

impl Journal {
    /// Attach a journal to a document. Revision 0 is synthesized as the
    /// transaction that would build the document's current state from empty
    /// (an empty entry when the document is empty); change sets committed
    /// before attach are discarded.
    pub fn attach(mut graph: Graph) -> Self {
        graph.take_changes();
        let ops = baseline_ops(&graph);
        tracing::debug!(baseline_ops = ops.len(), "journal attached");
        let mut store = JournalStore::default();
        store.push(TransactionEntry {
            revision: 0,
            transaction_id: INITIAL_TRANSACTION.to_string(),
            ops,
        });
        Self {
            graph,
            store,
            current_revision: 0,
        }
    }

    /// The journaled document
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the journaled document. Mutations made through this
    /// reference are picked up by the next journal call.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Detach, returning the document and dropping the history
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// The recorded history. Synchronizes with pending document changes
    /// first.
    pub fn store(&mut self) -> &JournalStore {
        self.ingest();
        &self.store
    }

    /// Highest recorded revision
    pub fn last_revision(&mut self) -> u64 {
        self.ingest();
        self.store.last_revision()
    }

    /// Revision the document currently sits at
    pub fn current_revision(&mut self) -> u64 {
        self.ingest();
        self.current_revision
    }

    /// Drain committed change sets from the document into journal entries.
    /// A mutation recorded while the document sits below the newest revision
    /// truncates the store first: redo history is linear and is lost on
    /// divergence.
    fn ingest(&mut self) {
        for set in self.graph.take_changes() {
            if self.current_revision < self.store.last_revision() {
                tracing::debug!(
                    revision = self.current_revision,
                    discarded = self.store.last_revision() - self.current_revision,
                    "redo history discarded"
                );
                self.store.truncate(self.current_revision);
            }
            let revision = self.store.last_revision() + 1;
            tracing::trace!(
                revision,
                transaction = %set.transaction_id,
                ops = set.ops.len(),
                "journal entry recorded"
            );
            self.store.push(TransactionEntry {
                revision,
                transaction_id: set.transaction_id,
                ops: set.ops,
            });
            self.current_revision = revision;
        }
    }

    /// Move the document to the given revision, replaying forward operations
    /// or inverse operations as needed. Out-of-range targets are clamped to
    /// `[0, last_revision]`. Idempotent: a second call with the same target
    /// is a no-op.
    pub fn move_to_revision(&mut self, target: u64) -> Result<(), JournalError> {
        self.ingest();
        let target = target.min(self.store.last_revision());
        if target == self.current_revision {
            return Ok(());
        }
        tracing::debug!(from = self.current_revision, to = target, "replaying history");

        if target > self.current_revision {
            for revision in self.current_revision + 1..=target {
                let entry = self
                    .store
                    .entry(revision)
                    .ok_or_else(|| JournalError::Corrupt(format!("missing revision {revision}")))?;
                for op in &entry.ops {
                    self.graph.replay(op)?;
                }
            }
        } else {
            // Undo whole transactions newest-first, each transaction's ops
            // inverted in reverse order.
            for revision in (target + 1..=self.current_revision).rev() {
                let entry = self
                    .store
                    .entry(revision)
                    .ok_or_else(|| JournalError::Corrupt(format!("missing revision {revision}")))?;
                for op in entry.ops.iter().rev() {
                    self.graph.replay(&op.inverted())?;
                }
            }
        }
        self.current_revision = target;
        Ok(())
    }

    /// Step back one whole transaction. No-op at revision 0.
    pub fn undo(&mut self) -> Result<(), JournalError> {
        self.ingest();
        if self.current_revision == 0 {
            return Ok(());
        }
        self.move_to_revision(self.current_revision - 1)
    }

    /// Step forward one whole transaction. No-op at the newest revision.
    pub fn redo(&mut self) -> Result<(), JournalError> {
        self.ingest();
        if self.current_revision == self.store.last_revision() {
            return Ok(());
        }
        self.move_to_revision(self.current_revision + 1)
    }

    /// Render entries in `[from, to)` as a human-readable transcript: one
    /// `>>>`/`<<<` bracket pair per transaction with one line per operation,
    /// newline-joined without a trailing newline.
    pub fn to_pretty_string(&mut self, from: u64, to: u64) -> String {
        self.ingest();
        let mut lines = Vec::new();
        for entry in self.store.entries() {
            if entry.revision < from || entry.revision >= to {
                continue;
            }
            lines.push(format!(">>> {}: {}", entry.revision, entry.transaction_id));
            for op in &entry.ops {
                lines.push(op_line(op));
            }
            lines.push(format!("<<< {}: {}", entry.revision, entry.transaction_id));
        }
        lines.join("\n")
    }
}

/// Ops that rebuild the given document from empty; the body of the
/// synthesized revision-0 entry.
fn baseline_ops(graph: &Graph) -> Vec<AtomicOp> {
    let mut ops = Vec::new();
    for node in graph.nodes() {
        ops.push(AtomicOp::AddNode(node.clone()));
    }
    for edge in graph.edges() {
        ops.push(AtomicOp::AddEdge(edge.clone()));
    }
    for initial in graph.initials() {
        ops.push(AtomicOp::AddInitial(initial.clone()));
    }
    for port in graph.exported_ports() {
        ops.push(AtomicOp::AddExportedPort(port.clone()));
    }
    for group in graph.groups() {
        ops.push(AtomicOp::AddGroup(group.clone()));
    }
    if !graph.properties().is_empty() {
        ops.push(AtomicOp::SetGraphMetadata {
            before: Metadata::new(),
            after: graph.properties().clone(),
        });
    }
    ops
}

/// Fixed per-kind line grammar for the transcript
fn op_line(op: &AtomicOp) -> String {
    match op {
        AtomicOp::AddNode(n) => format!("{}({})", n.id, n.component),
        AtomicOp::RemoveNode(n) => format!("DEL {}({})", n.id, n.component),
        AtomicOp::AddEdge(e) => format!(
            "{} {} -> {} {}",
            e.source_node, e.source_port, e.target_port, e.target_node
        ),
        AtomicOp::RemoveEdge(e) => format!(
            "{} {} -X> {} {}",
            e.source_node, e.source_port, e.target_port, e.target_node
        ),
        AtomicOp::AddInitial(i) => format!(
            "'{}' -> {} {}",
            data_label(&i.data),
            i.target_port,
            i.target_node
        ),
        AtomicOp::RemoveInitial(i) => format!(
            "'{}' -X> {} {}",
            data_label(&i.data),
            i.target_port,
            i.target_node
        ),
        AtomicOp::AddGroup(g) => format!("GROUP {}", g.name),
        AtomicOp::RemoveGroup(g) => format!("DEL GROUP {}", g.name),
        AtomicOp::AddExportedPort(p) => match p.direction {
            crate::graph::PortDirection::In => format!("INPORT {}", p.public_name),
            crate::graph::PortDirection::Out => format!("OUTPORT {}", p.public_name),
        },
        AtomicOp::RemoveExportedPort(p) => match p.direction {
            crate::graph::PortDirection::In => format!("DEL INPORT {}", p.public_name),
            crate::graph::PortDirection::Out => format!("DEL OUTPORT {}", p.public_name),
        },
        AtomicOp::SetNodeMetadata { id, .. } => format!("META {id}"),
        AtomicOp::SetEdgeMetadata {
            source_node,
            source_port,
            target_node,
            target_port,
            ..
        } => format!("META {source_node} {source_port} -> {target_port} {target_node}"),
        AtomicOp::SetGroupMetadata { name, .. } => format!("META GROUP {name}"),
        AtomicOp::SetGraphMetadata { .. } => "PROPERTIES".to_string(),
    }
}

/// Initial-packet data as it appears in the transcript: strings bare,
/// everything else in JSON notation.
fn data_label(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
