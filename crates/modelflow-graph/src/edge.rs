//! Edge builder.
//!
//! Creates an edge between an output port and an input port, then
//! applies the connection-status side effect.

use crate::error::GraphError;
use crate::types::{Edge, EdgeId, NodeId, Point, PortId, Workflow};

/// Connect `(source, source_port)` to `(target, target_port)`.
///
/// Both endpoints are validated against the workflow snapshot: the node
/// ids must exist and the port ids must be present on those nodes at
/// edge-creation time. After insertion, every output port in the
/// workflow whose id equals `source_port` is flipped to connected — a
/// global scan, not a two-endpoint update (see
/// [`Workflow::connect_output_ports`]).
pub fn connect(
    workflow: &mut Workflow,
    source: NodeId,
    source_port: PortId,
    target: NodeId,
    target_port: PortId,
) -> Result<EdgeId, GraphError> {
    let source_node = workflow
        .node(source)
        .ok_or(GraphError::NodeNotFound(source))?;
    if source_node.output(source_port).is_none() {
        return Err(GraphError::PortNotFound {
            node: source,
            port: source_port,
        });
    }
    let target_node = workflow
        .node(target)
        .ok_or(GraphError::NodeNotFound(target))?;
    if target_node.input(target_port).is_none() {
        return Err(GraphError::PortNotFound {
            node: target,
            port: target_port,
        });
    }

    let edge = Edge {
        id: EdgeId::new(),
        workflow_id: workflow.id,
        source,
        source_port_id: source_port,
        target,
        target_port_id: target_port,
        points: vec![Point::default(), Point::default()],
    };
    let edge_id = edge.id;
    workflow.edges.push(edge);
    workflow.connect_output_ports(source_port);
    Ok(edge_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::NodeFactory;
    use crate::types::{ConfigId, ModelId, PortStatus, RunId, TimeSpan};
    use serde_json::json;

    fn workflow_with_model_and_simulate() -> (Workflow, NodeId, PortId, NodeId, PortId) {
        let mut wf = Workflow::new("w", "d");
        let factory = NodeFactory::for_workflow(&wf);
        let model = factory.model_node(&ModelId::new("m1"), &ConfigId::new("c1"), None);
        let sim = factory.simulate_node(
            &ConfigId::new("c1"),
            &RunId::new("r1"),
            TimeSpan::default(),
            &json!({}),
        );
        let (model_id, model_out) = (model.node.id, model.config_output);
        let (sim_id, sim_in) = (sim.node.id, sim.config_input);
        wf.push_node(model.node);
        wf.push_node(sim.node);
        (wf, model_id, model_out, sim_id, sim_in)
    }

    #[test]
    fn connect_appends_edge_and_flips_source() {
        let (mut wf, model, model_out, sim, sim_in) = workflow_with_model_and_simulate();
        let edge_id = connect(&mut wf, model, model_out, sim, sim_in).unwrap();

        assert_eq!(wf.edges.len(), 1);
        let edge = &wf.edges[0];
        assert_eq!(edge.id, edge_id);
        assert_eq!(edge.source, model);
        assert_eq!(edge.source_port_id, model_out);
        assert_eq!(edge.target, sim);
        assert_eq!(edge.target_port_id, sim_in);
        assert_eq!(edge.points.len(), 2);

        let port = wf.node(model).unwrap().output(model_out).unwrap();
        assert_eq!(port.status, PortStatus::Connected);
    }

    #[test]
    fn connect_rejects_unknown_source_node() {
        let (mut wf, _, model_out, sim, sim_in) = workflow_with_model_and_simulate();
        let bogus = NodeId::new();
        let err = connect(&mut wf, bogus, model_out, sim, sim_in).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(bogus));
        assert!(wf.edges.is_empty());
    }

    #[test]
    fn connect_rejects_port_missing_on_node() {
        let (mut wf, model, _, sim, sim_in) = workflow_with_model_and_simulate();
        let bogus = PortId::new();
        let err = connect(&mut wf, model, bogus, sim, sim_in).unwrap_err();
        assert_eq!(
            err,
            GraphError::PortNotFound {
                node: model,
                port: bogus
            }
        );
        assert!(wf.edges.is_empty());
    }

    // Regression for the global-scan hazard: a coincidentally shared
    // port id on an unrelated node flips too. Defect risk, preserved
    // deliberately.
    #[test]
    fn connect_flips_every_port_sharing_the_source_id() {
        let (mut wf, model, model_out, sim, sim_in) = workflow_with_model_and_simulate();

        let factory = NodeFactory::for_workflow(&wf);
        let mut other = factory.model_node(&ModelId::new("m2"), &ConfigId::new("c2"), None);
        other.node.outputs[0].id = model_out; // forced id collision
        let other_id = other.node.id;
        wf.push_node(other.node);

        connect(&mut wf, model, model_out, sim, sim_in).unwrap();

        let unrelated = wf.node(other_id).unwrap().output(model_out).unwrap();
        assert_eq!(unrelated.status, PortStatus::Connected);
    }
}
