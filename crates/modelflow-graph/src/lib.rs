//! modelflow-graph — workflow graph data model and construction.
//!
//! The pure core of the modelflow workspace:
//! - Wire-exact Workflow/Node/Port/Edge types
//! - Node factory for typed operation nodes
//! - Edge builder with the connection-status side effect
//! - Identifier index reconciling catalog ids with in-graph ids
//!
//! No I/O happens here; persistence and dispatch live in
//! `modelflow-catalog` and `modelflow-ops`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod edge;
pub mod error;
pub mod factory;
pub mod index;
pub mod types;

pub use edge::connect;
pub use error::GraphError;
pub use factory::{
    CalibrateNodeParts, DatasetNodeParts, ModelNodeParts, NodeFactory, SimulateNodeParts,
    DEFAULT_METHOD, DEFAULT_NUM_SAMPLES,
};
pub use index::{
    resolve_dataset, resolve_model, DatasetBinding, IdentifierIndex, ModelBinding, PortBinding,
};
pub use types::{
    CalibrateState, ChartConfig, ConfigId, DatasetId, DatasetState, Edge, EdgeId, ModelId,
    ModelState, Node, NodeId, NodeState, OperationType, Point, Port, PortId, PortKind, PortStatus,
    ProjectId, RunConfig, RunId, SimConfigs, SimulateState, StatusCode, TimeSpan, Transform,
    VariableMapping, Workflow, WorkflowId,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
