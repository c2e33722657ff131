//! Identifier index.
//!
//! Callers hand operations a token that may be an external catalog id,
//! an in-graph node id, or an in-graph port id. The index reconciles a
//! token against a workflow snapshot and yields the authoritative pair
//! of (external id, in-graph port id) plus the owning node.
//!
//! Built in one pass over every node's output ports, keyed by both the
//! port id and the first element of the port's value list. When two
//! ports produce the same key, the later entry overwrites the earlier
//! one. That preserves the observed last-match-wins override order; it
//! is logged at warn level and pinned by a regression test as a defect
//! risk rather than silently changed.

use crate::types::{DatasetId, ModelId, NodeId, NodeState, PortId, Workflow};
use std::collections::HashMap;

/// Resolution of a token to a concrete output port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub node: NodeId,
    pub port: PortId,
    /// External catalog id carried as the port's first value element
    pub external_id: String,
}

/// Resolution of a dataset token to its node and first output port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetBinding {
    pub node: NodeId,
    pub port: PortId,
    pub dataset_id: DatasetId,
}

/// Resolution of a model token to its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBinding {
    pub node: NodeId,
    pub model_id: ModelId,
}

/// Token → output-port index over one workflow snapshot.
#[derive(Debug, Default)]
pub struct IdentifierIndex {
    bindings: HashMap<String, PortBinding>,
}

impl IdentifierIndex {
    /// Build the index from a workflow snapshot.
    #[must_use]
    pub fn build(workflow: &Workflow) -> Self {
        let mut bindings: HashMap<String, PortBinding> = HashMap::new();
        for node in &workflow.nodes {
            for output in &node.outputs {
                // Ports whose first value is not a string carry no
                // external id and are not indexable.
                let Some(external) = output.first_value_str() else {
                    continue;
                };
                let binding = PortBinding {
                    node: node.id,
                    port: output.id,
                    external_id: external.to_string(),
                };
                for key in [output.id.to_string(), external.to_string()] {
                    if let Some(previous) = bindings.insert(key.clone(), binding.clone()) {
                        if previous != binding {
                            tracing::warn!(
                                token = %key,
                                previous_port = %previous.port,
                                winning_port = %binding.port,
                                "identifier token matches multiple ports; last match wins"
                            );
                        }
                    }
                }
            }
        }
        Self { bindings }
    }

    /// Resolve a token to a port binding.
    ///
    /// `None` means no port matched and the token must be treated as
    /// already being an external id.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<&PortBinding> {
        self.bindings.get(token)
    }

    /// Number of distinct tokens indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Resolve a dataset token (node id or external dataset id) to the
/// dataset node and its first output port.
#[must_use]
pub fn resolve_dataset(workflow: &Workflow, token: &str) -> Option<DatasetBinding> {
    for node in &workflow.nodes {
        if let NodeState::Dataset(state) = &node.state {
            if node.id.to_string() == token || state.dataset_id.as_str() == token {
                let port = node.outputs.first()?.id;
                return Some(DatasetBinding {
                    node: node.id,
                    port,
                    dataset_id: state.dataset_id.clone(),
                });
            }
        }
    }
    None
}

/// Resolve a model token (node id or external model id) to the model node.
#[must_use]
pub fn resolve_model(workflow: &Workflow, token: &str) -> Option<ModelBinding> {
    for node in &workflow.nodes {
        if let NodeState::Model(state) = &node.state {
            if node.id.to_string() == token || state.model_id.as_str() == token {
                return Some(ModelBinding {
                    node: node.id,
                    model_id: state.model_id.clone(),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::NodeFactory;
    use crate::types::{ConfigId, ModelId};

    fn workflow_with_model(config: &str) -> Workflow {
        let mut wf = Workflow::new("w", "d");
        let parts = NodeFactory::for_workflow(&wf).model_node(
            &ModelId::new("m1"),
            &ConfigId::new(config),
            None,
        );
        wf.push_node(parts.node);
        wf
    }

    #[test]
    fn resolves_by_external_id() {
        let wf = workflow_with_model("c1");
        let index = IdentifierIndex::build(&wf);
        let binding = index.resolve("c1").unwrap();
        assert_eq!(binding.external_id, "c1");
        assert_eq!(binding.node, wf.nodes[0].id);
        assert_eq!(binding.port, wf.nodes[0].outputs[0].id);
    }

    #[test]
    fn resolves_by_port_id() {
        let wf = workflow_with_model("c1");
        let index = IdentifierIndex::build(&wf);
        let port = wf.nodes[0].outputs[0].id;
        let binding = index.resolve(&port.to_string()).unwrap();
        assert_eq!(binding.external_id, "c1");
        assert_eq!(binding.port, port);
    }

    #[test]
    fn unknown_token_is_a_miss() {
        let wf = workflow_with_model("c1");
        let index = IdentifierIndex::build(&wf);
        assert!(index.resolve("not-in-graph").is_none());
    }

    // Two ports carrying the same external id: the later node in
    // iteration order wins. This pins the observed override behavior;
    // it is a defect risk, not a precedence rule.
    #[test]
    fn duplicate_external_id_last_match_wins() {
        let mut wf = workflow_with_model("c1");
        let second = NodeFactory::for_workflow(&wf).model_node(
            &ModelId::new("m2"),
            &ConfigId::new("c1"),
            None,
        );
        let second_port = second.config_output;
        wf.push_node(second.node);

        let index = IdentifierIndex::build(&wf);
        assert_eq!(index.resolve("c1").unwrap().port, second_port);
    }

    #[test]
    fn resolve_dataset_by_node_or_external_id() {
        let mut wf = Workflow::new("w", "d");
        let parts = NodeFactory::for_workflow(&wf).dataset_node(&DatasetId::new("ds1"));
        let node_id = parts.node.id;
        let port_id = parts.output;
        wf.push_node(parts.node);

        let by_external = resolve_dataset(&wf, "ds1").unwrap();
        assert_eq!(by_external.node, node_id);
        assert_eq!(by_external.port, port_id);

        let by_node = resolve_dataset(&wf, &node_id.to_string()).unwrap();
        assert_eq!(by_node.dataset_id, DatasetId::new("ds1"));

        assert!(resolve_dataset(&wf, "other").is_none());
    }

    #[test]
    fn resolve_model_by_node_or_external_id() {
        let wf = workflow_with_model("c1");
        let node_id = wf.nodes[0].id;
        assert_eq!(resolve_model(&wf, "m1").unwrap().node, node_id);
        assert_eq!(
            resolve_model(&wf, &node_id.to_string()).unwrap().model_id,
            ModelId::new("m1")
        );
        assert!(resolve_model(&wf, "m9").is_none());
    }
}
