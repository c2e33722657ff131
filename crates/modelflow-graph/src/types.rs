//! Wire types for the workflow graph.
//!
//! These structs are the JSON contract with the catalog service: field
//! names and nesting are reproduced exactly (`workflowId`,
//! `sourcePortId`, `operationType`, ...). The authoritative copy of a
//! workflow lives in the external store; everything here is an
//! ephemeral in-memory snapshot held for the duration of one operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

macro_rules! graph_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh id (UUID v4, unique process-wide)
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

graph_id!(
    /// Workflow identifier
    WorkflowId
);
graph_id!(
    /// In-graph node identifier
    NodeId
);
graph_id!(
    /// In-graph port identifier (never reused once generated)
    PortId
);
graph_id!(
    /// Edge identifier
    EdgeId
);

macro_rules! external_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub String);

        impl $name {
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw catalog id
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

external_id!(
    /// Catalog id of a model
    ModelId
);
external_id!(
    /// Catalog id of a model configuration
    ConfigId
);
external_id!(
    /// Catalog id of a dataset
    DatasetId
);
external_id!(
    /// Catalog id of a project
    ProjectId
);
external_id!(
    /// Id of a simulation or calibration run
    RunId
);

impl RunId {
    /// Placeholder run id used when the engine kickoff response did not
    /// carry a concrete simulation id.
    #[must_use]
    pub fn pending() -> Self {
        Self(format!("pending-{}", Uuid::new_v4()))
    }
}

/// Canvas transform carried by the workflow for presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            k: 1.0,
        }
    }
}

/// A point on an edge polyline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Inclusive simulation time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: i64,
    pub end: i64,
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self { start: 0, end: 90 }
    }
}

/// Connection status of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortStatus {
    #[serde(rename = "not connected")]
    NotConnected,
    #[serde(rename = "connected")]
    Connected,
}

/// The value type a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    #[serde(rename = "modelConfigId")]
    ModelConfigId,
    #[serde(rename = "datasetId")]
    DatasetId,
    #[serde(rename = "simOutput")]
    SimOutput,
    #[serde(rename = "number")]
    Number,
}

/// A named input/output socket on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    #[serde(rename = "type")]
    pub kind: PortKind,
    pub label: String,
    pub value: Vec<Value>,
    pub status: PortStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_multiple: Option<bool>,
}

impl Port {
    /// First element of the port's value list as a string, when it is one.
    #[must_use]
    pub fn first_value_str(&self) -> Option<&str> {
        self.value.first().and_then(Value::as_str)
    }
}

/// Node operation type discriminant (wire names fixed by the catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    ModelOperation,
    Dataset,
    SimulateCiemssOperation,
    CalibrationOperationCiemss,
}

/// Node validity marker shown by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    #[serde(rename = "valid")]
    Valid,
    #[serde(rename = "invalid")]
    Invalid,
}

/// Model node state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelState {
    pub model_id: ModelId,
    pub model_configuration_ids: Vec<ConfigId>,
}

/// Dataset node state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetState {
    pub dataset_id: DatasetId,
}

/// Per-run configuration inside a simulate node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub run_id: RunId,
    pub active: bool,
    pub config_name: String,
    pub time_span: TimeSpan,
    pub num_samples: u64,
    pub method: String,
}

/// `simConfigs` block of a simulate node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfigs {
    pub run_configs: BTreeMap<String, RunConfig>,
    pub chart_configs: Vec<Value>,
}

/// Simulate node state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateState {
    pub sim_configs: SimConfigs,
    pub current_timespan: TimeSpan,
    pub extra: Value,
    pub num_samples: u64,
    pub method: String,
    pub simulations_in_progress: Vec<String>,
}

/// Chart selection inside a calibrate node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub selected_run: RunId,
    pub selected_variable: Vec<String>,
}

/// One dataset-column to model-variable pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMapping {
    pub model_variable: String,
    pub dataset_variable: String,
}

/// Calibrate-and-simulate node state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrateState {
    pub chart_configs: Vec<ChartConfig>,
    pub mapping: Vec<VariableMapping>,
    pub simulations_in_progress: Vec<String>,
    pub time_span: TimeSpan,
    pub extra: Value,
}

/// Node state, shaped by the sibling `operationType` field.
///
/// Untagged on the wire: the required field sets of the variants are
/// disjoint, so the shape alone discriminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeState {
    Simulate(SimulateState),
    Calibrate(CalibrateState),
    Model(ModelState),
    Dataset(DatasetState),
}

impl NodeState {
    /// Dataset id when this is a dataset node state.
    #[must_use]
    pub fn dataset_id(&self) -> Option<&DatasetId> {
        match self {
            NodeState::Dataset(s) => Some(&s.dataset_id),
            _ => None,
        }
    }

    /// Model id when this is a model node state.
    #[must_use]
    pub fn model_id(&self) -> Option<&ModelId> {
        match self {
            NodeState::Model(s) => Some(&s.model_id),
            _ => None,
        }
    }
}

/// A typed unit of work in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub workflow_id: WorkflowId,
    pub operation_type: OperationType,
    pub display_name: String,
    pub x: f64,
    pub y: f64,
    pub state: NodeState,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub status_code: StatusCode,
    pub width: f64,
    pub height: f64,
}

impl Node {
    /// Find an output port by id.
    #[must_use]
    pub fn output(&self, port: PortId) -> Option<&Port> {
        self.outputs.iter().find(|p| p.id == port)
    }

    /// Find an input port by id.
    #[must_use]
    pub fn input(&self, port: PortId) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == port)
    }
}

/// A directed connection between an output port and an input port.
///
/// Edges are created once and never mutated, only removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub workflow_id: WorkflowId,
    pub source: NodeId,
    pub source_port_id: PortId,
    pub target: NodeId,
    pub target_port_id: PortId,
    pub points: Vec<Point>,
}

/// The workflow document: a directed graph of operation nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub description: String,
    pub transform: Transform,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Create an empty workflow payload with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            description: description.into(),
            transform: Transform::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a node by id, mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Append a node.
    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Remove the first node with a matching id.
    ///
    /// Returns whether a node was removed; a missing id is not an error,
    /// so repeated removal of the same id is idempotent.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if let Some(pos) = self.nodes.iter().position(|n| n.id == id) {
            self.nodes.remove(pos);
            true
        } else {
            false
        }
    }

    /// Flip `status` to connected on every output port in the workflow
    /// whose id equals `port` — not only the edge endpoints.
    ///
    /// This reproduces the observed global-scan behavior: should two
    /// ports ever share an id, both flip. Returns the number of ports
    /// touched so callers and tests can observe the hazard.
    pub fn connect_output_ports(&mut self, port: PortId) -> usize {
        let mut flipped = 0;
        for node in &mut self.nodes {
            for output in &mut node.outputs {
                if output.id == port {
                    output.status = PortStatus::Connected;
                    flipped += 1;
                }
            }
        }
        flipped
    }
}
