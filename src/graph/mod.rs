//! Graph document model
//!
//! This module contains the document store and everything that operates
//! directly on it: entity types, atomic operations, structural equivalence,
//! theirs-wins merging, and the external document loader.

pub mod edge;
pub mod equivalence;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod group;
pub mod load;
pub mod merge;
pub mod node;
pub mod ops;
pub mod port;

pub use edge::{Edge, Initial};
pub use equivalence::equivalent;
pub use graph::{Graph, IMPLICIT_TRANSACTION};
pub use group::Group;
pub use load::load_json;
pub use merge::merge_resolve_theirs;
pub use node::Node;
pub use ops::{AtomicOp, ChangeSet};
pub use port::{ExportedPort, PortDirection};
