//! Node factory.
//!
//! Builds typed node payloads with freshly generated node and port ids.
//! Layout fields (`x`, `y`, `width`, `height`) are fixed per node type
//! for presentation only and carry no semantic weight.

use crate::types::{
    CalibrateState, ChartConfig, ConfigId, DatasetId, DatasetState, ModelId, ModelState, Node,
    NodeId, NodeState, OperationType, Port, PortId, PortKind, PortStatus, RunConfig, RunId,
    SimConfigs, SimulateState, StatusCode, TimeSpan, VariableMapping, Workflow, WorkflowId,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default sampler settings applied unless overridden via `extra`.
pub const DEFAULT_NUM_SAMPLES: u64 = 100;
/// Default ODE solver.
pub const DEFAULT_METHOD: &str = "dopri5";

/// A freshly built model node and its generated port ids.
#[derive(Debug, Clone)]
pub struct ModelNodeParts {
    pub node: Node,
    /// Output port carrying the resolved model configuration id
    pub config_output: PortId,
}

/// A freshly built dataset node and its generated port ids.
#[derive(Debug, Clone)]
pub struct DatasetNodeParts {
    pub node: Node,
    pub output: PortId,
}

/// A freshly built simulate node and its generated port ids.
#[derive(Debug, Clone)]
pub struct SimulateNodeParts {
    pub node: Node,
    /// Input port pre-bound to the resolved model configuration
    pub config_input: PortId,
    pub output: PortId,
}

/// A freshly built calibrate-and-simulate node and its generated port ids.
#[derive(Debug, Clone)]
pub struct CalibrateNodeParts {
    pub node: Node,
    pub config_input: PortId,
    pub dataset_input: PortId,
    pub output: PortId,
}

/// Builds node payloads for one workflow.
#[derive(Debug, Clone, Copy)]
pub struct NodeFactory {
    workflow_id: WorkflowId,
}

impl NodeFactory {
    #[inline]
    #[must_use]
    pub fn new(workflow_id: WorkflowId) -> Self {
        Self { workflow_id }
    }

    /// Factory for the workflow a snapshot belongs to.
    #[inline]
    #[must_use]
    pub fn for_workflow(workflow: &Workflow) -> Self {
        Self::new(workflow.id)
    }

    /// Build a model node bound to a model configuration.
    ///
    /// The label defaults to the configuration id when the caller has no
    /// human-readable config name at hand.
    #[must_use]
    pub fn model_node(
        &self,
        model_id: &ModelId,
        config_id: &ConfigId,
        label: Option<&str>,
    ) -> ModelNodeParts {
        let config_output = PortId::new();
        let label = label.unwrap_or(config_id.as_str()).to_string();
        let node = Node {
            id: NodeId::new(),
            workflow_id: self.workflow_id,
            operation_type: OperationType::ModelOperation,
            display_name: "Model".to_string(),
            x: 400.0,
            y: 150.0,
            state: NodeState::Model(ModelState {
                model_id: model_id.clone(),
                model_configuration_ids: vec![config_id.clone()],
            }),
            inputs: Vec::new(),
            outputs: vec![Port {
                id: config_output,
                kind: PortKind::ModelConfigId,
                label,
                value: vec![Value::String(config_id.0.clone())],
                status: PortStatus::NotConnected,
                accept_multiple: None,
            }],
            status_code: StatusCode::Valid,
            width: 180.0,
            height: 220.0,
        };
        ModelNodeParts {
            node,
            config_output,
        }
    }

    /// Build a dataset node.
    #[must_use]
    pub fn dataset_node(&self, dataset_id: &DatasetId) -> DatasetNodeParts {
        let output = PortId::new();
        let node = Node {
            id: NodeId::new(),
            workflow_id: self.workflow_id,
            operation_type: OperationType::Dataset,
            display_name: "Dataset".to_string(),
            x: 375.0,
            y: 550.0,
            state: NodeState::Dataset(DatasetState {
                dataset_id: dataset_id.clone(),
            }),
            inputs: Vec::new(),
            outputs: vec![Port {
                id: output,
                kind: PortKind::DatasetId,
                label: dataset_id.0.clone(),
                value: vec![Value::String(dataset_id.0.clone())],
                status: PortStatus::NotConnected,
                accept_multiple: None,
            }],
            status_code: StatusCode::Invalid,
            width: 180.0,
            height: 220.0,
        };
        DatasetNodeParts { node, output }
    }

    /// Build a probabilistic simulate node.
    ///
    /// The input port is created already connected: simulate nodes are
    /// always built bound to a resolved model configuration.
    #[must_use]
    pub fn simulate_node(
        &self,
        config_id: &ConfigId,
        run_id: &RunId,
        timespan: TimeSpan,
        extra: &Value,
    ) -> SimulateNodeParts {
        let config_input = PortId::new();
        let output = PortId::new();
        let num_samples = extra
            .get("num_samples")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_NUM_SAMPLES);

        let mut run_configs = BTreeMap::new();
        run_configs.insert(
            run_id.0.clone(),
            RunConfig {
                run_id: run_id.clone(),
                active: true,
                config_name: "Model configuration".to_string(),
                time_span: timespan,
                num_samples,
                method: DEFAULT_METHOD.to_string(),
            },
        );

        let node = Node {
            id: NodeId::new(),
            workflow_id: self.workflow_id,
            operation_type: OperationType::SimulateCiemssOperation,
            display_name: "Simulate (probabilistic)".to_string(),
            x: 1100.0,
            y: 500.0,
            state: NodeState::Simulate(SimulateState {
                sim_configs: SimConfigs {
                    run_configs,
                    chart_configs: Vec::new(),
                },
                current_timespan: timespan,
                extra: extra.clone(),
                num_samples,
                method: DEFAULT_METHOD.to_string(),
                simulations_in_progress: Vec::new(),
            }),
            inputs: vec![Port {
                id: config_input,
                kind: PortKind::ModelConfigId,
                label: config_id.0.clone(),
                value: vec![Value::String(config_id.0.clone())],
                status: PortStatus::Connected,
                accept_multiple: Some(false),
            }],
            outputs: vec![Port {
                id: output,
                kind: PortKind::SimOutput,
                label: "Output 1".to_string(),
                value: vec![Value::String(run_id.0.clone())],
                status: PortStatus::NotConnected,
                accept_multiple: None,
            }],
            status_code: StatusCode::Invalid,
            width: 420.0,
            height: 220.0,
        };
        SimulateNodeParts {
            node,
            config_input,
            output,
        }
    }

    /// Build a calibrate-and-simulate node.
    ///
    /// Both input ports are created already connected, bound to the
    /// resolved model configuration and dataset.
    #[must_use]
    pub fn calibrate_node(
        &self,
        config_id: &ConfigId,
        dataset_id: &DatasetId,
        run_id: &RunId,
        timespan: TimeSpan,
        extra: &Value,
    ) -> CalibrateNodeParts {
        let config_input = PortId::new();
        let dataset_input = PortId::new();
        let output = PortId::new();

        let node = Node {
            id: NodeId::new(),
            workflow_id: self.workflow_id,
            operation_type: OperationType::CalibrationOperationCiemss,
            display_name: "Calibrate & Simulate (probabilistic)".to_string(),
            x: 1100.0,
            y: 200.0,
            state: NodeState::Calibrate(CalibrateState {
                chart_configs: vec![ChartConfig {
                    selected_run: run_id.clone(),
                    selected_variable: Vec::new(),
                }],
                mapping: vec![VariableMapping {
                    model_variable: String::new(),
                    dataset_variable: String::new(),
                }],
                simulations_in_progress: Vec::new(),
                time_span: timespan,
                extra: extra.clone(),
            }),
            inputs: vec![
                Port {
                    id: config_input,
                    kind: PortKind::ModelConfigId,
                    label: config_id.0.clone(),
                    value: vec![Value::String(config_id.0.clone())],
                    status: PortStatus::Connected,
                    accept_multiple: None,
                },
                Port {
                    id: dataset_input,
                    kind: PortKind::DatasetId,
                    label: dataset_id.0.clone(),
                    value: vec![Value::String(dataset_id.0.clone())],
                    status: PortStatus::Connected,
                    accept_multiple: None,
                },
            ],
            outputs: vec![Port {
                id: output,
                kind: PortKind::Number,
                label: "Output 1".to_string(),
                value: vec![serde_json::json!({"runId": run_id.0})],
                status: PortStatus::NotConnected,
                accept_multiple: None,
            }],
            status_code: StatusCode::Invalid,
            width: 420.0,
            height: 220.0,
        };
        CalibrateNodeParts {
            node,
            config_input,
            dataset_input,
            output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn factory() -> NodeFactory {
        NodeFactory::new(WorkflowId::new())
    }

    #[test]
    fn model_node_shape() {
        let parts = factory().model_node(
            &ModelId::new("m1"),
            &ConfigId::new("c1"),
            Some("Default config"),
        );
        let node = &parts.node;
        assert_eq!(node.operation_type, OperationType::ModelOperation);
        assert_eq!(node.status_code, StatusCode::Valid);
        assert!(node.inputs.is_empty());
        assert_eq!(node.outputs.len(), 1);

        let out = &node.outputs[0];
        assert_eq!(out.id, parts.config_output);
        assert_eq!(out.kind, PortKind::ModelConfigId);
        assert_eq!(out.label, "Default config");
        assert_eq!(out.value, vec![json!("c1")]);
        assert_eq!(out.status, PortStatus::NotConnected);
    }

    #[test]
    fn model_node_label_defaults_to_config_id() {
        let parts = factory().model_node(&ModelId::new("m1"), &ConfigId::new("c1"), None);
        assert_eq!(parts.node.outputs[0].label, "c1");
    }

    #[test]
    fn dataset_node_shape() {
        let parts = factory().dataset_node(&DatasetId::new("ds1"));
        assert_eq!(parts.node.operation_type, OperationType::Dataset);
        assert_eq!(parts.node.status_code, StatusCode::Invalid);
        assert_eq!(parts.node.outputs[0].value, vec![json!("ds1")]);
        assert_eq!(parts.node.outputs[0].status, PortStatus::NotConnected);
    }

    #[test]
    fn simulate_node_defaults() {
        let run = RunId::new("run-1");
        let parts = factory().simulate_node(
            &ConfigId::new("c1"),
            &run,
            TimeSpan::default(),
            &json!({}),
        );
        let NodeState::Simulate(state) = &parts.node.state else {
            panic!("expected simulate state");
        };
        assert_eq!(state.num_samples, DEFAULT_NUM_SAMPLES);
        assert_eq!(state.method, DEFAULT_METHOD);
        assert_eq!(state.sim_configs.run_configs["run-1"].run_id, run);

        // input pre-wired, output not yet
        assert_eq!(parts.node.inputs[0].status, PortStatus::Connected);
        assert_eq!(parts.node.inputs[0].accept_multiple, Some(false));
        assert_eq!(parts.node.outputs[0].status, PortStatus::NotConnected);
        assert_eq!(parts.node.outputs[0].value, vec![json!("run-1")]);
    }

    #[test]
    fn simulate_node_num_samples_from_extra() {
        let parts = factory().simulate_node(
            &ConfigId::new("c1"),
            &RunId::new("r"),
            TimeSpan::default(),
            &json!({"num_samples": 250}),
        );
        let NodeState::Simulate(state) = &parts.node.state else {
            panic!("expected simulate state");
        };
        assert_eq!(state.num_samples, 250);
    }

    #[test]
    fn calibrate_node_shape() {
        let run = RunId::new("run-2");
        let parts = factory().calibrate_node(
            &ConfigId::new("c1"),
            &DatasetId::new("ds1"),
            &run,
            TimeSpan::default(),
            &json!({"num_samples": 100}),
        );
        let node = &parts.node;
        assert_eq!(
            node.operation_type,
            OperationType::CalibrationOperationCiemss
        );
        assert_eq!(node.inputs.len(), 2);
        assert!(node
            .inputs
            .iter()
            .all(|p| p.status == PortStatus::Connected));
        assert_eq!(node.outputs[0].kind, PortKind::Number);
        assert_eq!(node.outputs[0].value, vec![json!({"runId": "run-2"})]);

        let NodeState::Calibrate(state) = &node.state else {
            panic!("expected calibrate state");
        };
        assert_eq!(state.chart_configs[0].selected_run, run);
    }

    // Full-node serializations pinned against literal JSON: these key
    // names and nestings are the catalog wire contract.

    #[test]
    fn model_node_wire_shape() {
        let wf_id = WorkflowId::new();
        let parts = NodeFactory::new(wf_id).model_node(
            &ModelId::new("m1"),
            &ConfigId::new("c1"),
            Some("Default config"),
        );
        let value = serde_json::to_value(&parts.node).unwrap();
        assert_eq!(
            value,
            json!({
                "id": parts.node.id.to_string(),
                "workflowId": wf_id.to_string(),
                "operationType": "ModelOperation",
                "displayName": "Model",
                "x": 400.0,
                "y": 150.0,
                "state": {
                    "modelId": "m1",
                    "modelConfigurationIds": ["c1"],
                },
                "inputs": [],
                "outputs": [{
                    "id": parts.config_output.to_string(),
                    "type": "modelConfigId",
                    "label": "Default config",
                    "value": ["c1"],
                    "status": "not connected",
                }],
                "statusCode": "valid",
                "width": 180.0,
                "height": 220.0,
            })
        );
    }

    #[test]
    fn dataset_node_wire_shape() {
        let wf_id = WorkflowId::new();
        let parts = NodeFactory::new(wf_id).dataset_node(&DatasetId::new("ds1"));
        let value = serde_json::to_value(&parts.node).unwrap();
        assert_eq!(
            value,
            json!({
                "id": parts.node.id.to_string(),
                "workflowId": wf_id.to_string(),
                "operationType": "Dataset",
                "displayName": "Dataset",
                "x": 375.0,
                "y": 550.0,
                "state": {
                    "datasetId": "ds1",
                },
                "inputs": [],
                "outputs": [{
                    "id": parts.output.to_string(),
                    "type": "datasetId",
                    "label": "ds1",
                    "value": ["ds1"],
                    "status": "not connected",
                }],
                "statusCode": "invalid",
                "width": 180.0,
                "height": 220.0,
            })
        );
    }

    #[test]
    fn simulate_node_wire_shape() {
        let wf_id = WorkflowId::new();
        let parts = NodeFactory::new(wf_id).simulate_node(
            &ConfigId::new("c1"),
            &RunId::new("run-1"),
            TimeSpan::default(),
            &json!({"num_samples": 100}),
        );
        let value = serde_json::to_value(&parts.node).unwrap();
        assert_eq!(
            value,
            json!({
                "id": parts.node.id.to_string(),
                "workflowId": wf_id.to_string(),
                "operationType": "SimulateCiemssOperation",
                "displayName": "Simulate (probabilistic)",
                "x": 1100.0,
                "y": 500.0,
                "state": {
                    "simConfigs": {
                        "runConfigs": {
                            "run-1": {
                                "runId": "run-1",
                                "active": true,
                                "configName": "Model configuration",
                                "timeSpan": {"start": 0, "end": 90},
                                "numSamples": 100,
                                "method": "dopri5",
                            }
                        },
                        "chartConfigs": [],
                    },
                    "currentTimespan": {"start": 0, "end": 90},
                    "extra": {"num_samples": 100},
                    "numSamples": 100,
                    "method": "dopri5",
                    "simulationsInProgress": [],
                },
                "inputs": [{
                    "id": parts.config_input.to_string(),
                    "type": "modelConfigId",
                    "label": "c1",
                    "value": ["c1"],
                    "status": "connected",
                    "acceptMultiple": false,
                }],
                "outputs": [{
                    "id": parts.output.to_string(),
                    "type": "simOutput",
                    "label": "Output 1",
                    "value": ["run-1"],
                    "status": "not connected",
                }],
                "statusCode": "invalid",
                "width": 420.0,
                "height": 220.0,
            })
        );
    }

    #[test]
    fn calibrate_node_wire_shape() {
        let wf_id = WorkflowId::new();
        let parts = NodeFactory::new(wf_id).calibrate_node(
            &ConfigId::new("c1"),
            &DatasetId::new("ds1"),
            &RunId::new("run-2"),
            TimeSpan::default(),
            &json!({"num_samples": 100}),
        );
        let value = serde_json::to_value(&parts.node).unwrap();
        assert_eq!(
            value,
            json!({
                "id": parts.node.id.to_string(),
                "workflowId": wf_id.to_string(),
                "operationType": "CalibrationOperationCiemss",
                "displayName": "Calibrate & Simulate (probabilistic)",
                "x": 1100.0,
                "y": 200.0,
                "state": {
                    "chartConfigs": [{
                        "selectedRun": "run-2",
                        "selectedVariable": [],
                    }],
                    "mapping": [{
                        "modelVariable": "",
                        "datasetVariable": "",
                    }],
                    "simulationsInProgress": [],
                    "timeSpan": {"start": 0, "end": 90},
                    "extra": {"num_samples": 100},
                },
                "inputs": [
                    {
                        "id": parts.config_input.to_string(),
                        "type": "modelConfigId",
                        "label": "c1",
                        "value": ["c1"],
                        "status": "connected",
                    },
                    {
                        "id": parts.dataset_input.to_string(),
                        "type": "datasetId",
                        "label": "ds1",
                        "value": ["ds1"],
                        "status": "connected",
                    },
                ],
                "outputs": [{
                    "id": parts.output.to_string(),
                    "type": "number",
                    "label": "Output 1",
                    "value": [{"runId": "run-2"}],
                    "status": "not connected",
                }],
                "statusCode": "invalid",
                "width": 420.0,
                "height": 220.0,
            })
        );
    }

    #[test]
    fn generated_ids_are_fresh_per_node() {
        let f = factory();
        let a = f.dataset_node(&DatasetId::new("ds"));
        let b = f.dataset_node(&DatasetId::new("ds"));
        assert_ne!(a.node.id, b.node.id);
        assert_ne!(a.output, b.output);
    }
}
