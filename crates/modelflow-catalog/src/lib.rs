//! modelflow-catalog — HTTP glue for the modelflow workspace.
//!
//! Three independent services back the engine:
//! - the catalog (models, datasets, workflows, configs, runs, projects,
//!   provenance), behind [`CatalogStore`]
//! - the probabilistic and deterministic simulation engines, behind
//!   [`SimulationEngine`]
//!
//! Production implementations are reqwest clients with bounded request
//! timeouts; idempotent GETs are retried with linear backoff.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod engine;
pub mod error;
pub mod store;
pub mod types;

pub use client::{CatalogClient, CatalogConfig};
pub use engine::{
    DispatchReceipt, EngineClient, EngineConfig, EngineEndpoint, EngineService, SimulationEngine,
};
pub use error::CatalogError;
pub use store::CatalogStore;
pub use types::{
    DatasetRecord, ModelConfigRecord, ModelConfigSummary, ProjectSeed, ProvenanceRelation,
    ResourceType,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
