//! Catalog store seam.
//!
//! The operation surface talks to the external catalog through this
//! trait; production uses the reqwest-backed [`crate::CatalogClient`],
//! tests use the in-memory store from `modelflow-test-utils`.

use crate::error::CatalogError;
use crate::types::{
    DatasetRecord, ModelConfigRecord, ModelConfigSummary, ProjectSeed, ProvenanceRelation,
    ResourceType,
};
use async_trait::async_trait;
use modelflow_graph::{ConfigId, DatasetId, ModelId, ProjectId, RunId, Workflow, WorkflowId};
use serde_json::Value;

/// The external store of models, datasets, workflows, model
/// configurations and simulation records.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// `GET /workflows/{id}` — fetch the authoritative workflow copy.
    async fn get_workflow(&self, id: WorkflowId) -> Result<Workflow, CatalogError>;

    /// `PUT /workflows/{id}` — replace the full workflow.
    async fn put_workflow(&self, workflow: &Workflow) -> Result<(), CatalogError>;

    /// `POST /workflows` — create a workflow, returning its id.
    async fn create_workflow(&self, workflow: &Workflow) -> Result<WorkflowId, CatalogError>;

    /// `POST /projects` — create a project, returning its id.
    async fn create_project(&self, project: &ProjectSeed) -> Result<ProjectId, CatalogError>;

    /// `GET /models/{id}`.
    async fn get_model(&self, id: &ModelId) -> Result<Value, CatalogError>;

    /// `GET /models/{id}/model_configurations`.
    async fn list_model_configs(
        &self,
        id: &ModelId,
    ) -> Result<Vec<ModelConfigSummary>, CatalogError>;

    /// `GET /model_configurations/{id}`.
    async fn get_model_config(&self, id: &ConfigId) -> Result<ModelConfigRecord, CatalogError>;

    /// `POST /model_configurations` — create a config, returning its id.
    async fn create_model_config(&self, config: &Value) -> Result<ConfigId, CatalogError>;

    /// `GET /datasets/{id}`.
    async fn get_dataset(&self, id: &DatasetId) -> Result<DatasetRecord, CatalogError>;

    /// `GET /simulations/{id}` — simulate or calibrate run record.
    async fn get_simulation(&self, id: &RunId) -> Result<Value, CatalogError>;

    /// `POST /models/search` — full-text search, top hits.
    async fn search_models(&self, query: &str) -> Result<Value, CatalogError>;

    /// `POST /projects/{id}/assets/{type}/{id}` — register an asset.
    async fn add_asset(
        &self,
        project: &ProjectId,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<(), CatalogError>;

    /// `POST /provenance` — record a provenance relation.
    async fn add_provenance(&self, relation: &ProvenanceRelation) -> Result<(), CatalogError>;
}
