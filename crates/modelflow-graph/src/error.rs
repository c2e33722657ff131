//! Error types for graph construction.

use crate::types::{NodeId, PortId};

/// Errors raised while mutating a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An edge endpoint references a node id that is not in the workflow
    #[error("node not found in workflow: {0}")]
    NodeNotFound(NodeId),

    /// An edge endpoint references a port id absent from the named node
    #[error("port {port} not found on node {node}")]
    PortNotFound { node: NodeId, port: PortId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let node = NodeId::new();
        let err = GraphError::NodeNotFound(node);
        assert!(err.to_string().contains(&node.to_string()));
    }
}
