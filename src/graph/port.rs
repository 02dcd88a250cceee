//! Exported ports: the document's public interface

use crate::types::Metadata;
use serde::{Deserialize, Serialize};

/// Direction of an exported port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Exported input port
    In,
    /// Exported output port
    Out,
}

/// Exported port: publishes an internal node port under a public name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPort {
    /// Whether this exports an input or an output
    pub direction: PortDirection,
    /// Public name the port is exported under (unique per direction)
    pub public_name: String,
    /// Node the port belongs to
    pub node: String,
    /// Port name on that node
    pub port: String,
    /// Port metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl ExportedPort {
    /// Create a new exported port
    pub fn new(
        direction: PortDirection,
        public_name: impl Into<String>,
        node: impl Into<String>,
        port: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            direction,
            public_name: public_name.into(),
            node: node.into(),
            port: port.into(),
            metadata,
        }
    }
}
