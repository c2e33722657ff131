//! Testing utilities for the modelflow workspace.
//!
//! In-memory collaborators standing in for the catalog service and the
//! simulation engines, plus record fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use modelflow_catalog::{
    CatalogError, CatalogStore, DatasetRecord, DispatchReceipt, EngineEndpoint, EngineService,
    ModelConfigRecord, ModelConfigSummary, ProjectSeed, ProvenanceRelation, ResourceType,
    SimulationEngine,
};
use modelflow_graph::{ConfigId, DatasetId, ModelId, ProjectId, RunId, Workflow, WorkflowId};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

fn not_found(what: &str) -> CatalogError {
    CatalogError::Status {
        url: format!("memory://{what}"),
        status: 404,
        body: format!("{what} not found"),
    }
}

#[derive(Default)]
struct CatalogState {
    workflows: HashMap<WorkflowId, Workflow>,
    models: HashMap<ModelId, Value>,
    config_summaries: HashMap<ModelId, Vec<ModelConfigSummary>>,
    configs: HashMap<ConfigId, ModelConfigRecord>,
    datasets: HashMap<DatasetId, DatasetRecord>,
    simulations: HashMap<RunId, Value>,
    assets: Vec<(ProjectId, ResourceType, String)>,
    provenance: Vec<ProvenanceRelation>,
    fail_asset_posts: bool,
    put_count: usize,
}

/// In-memory [`CatalogStore`] used by the operation-surface tests.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_workflow(&self, workflow: Workflow) -> WorkflowId {
        let id = workflow.id;
        self.state.lock().workflows.insert(id, workflow);
        id
    }

    pub fn seed_model(&self, id: &ModelId, record: Value, configs: Vec<ModelConfigSummary>) {
        let mut state = self.state.lock();
        state.models.insert(id.clone(), record);
        state.config_summaries.insert(id.clone(), configs);
    }

    pub fn seed_config(&self, record: ModelConfigRecord) {
        self.state.lock().configs.insert(record.id.clone(), record);
    }

    pub fn seed_dataset(&self, record: DatasetRecord) {
        self.state.lock().datasets.insert(record.id.clone(), record);
    }

    /// Make every asset POST answer 500, to exercise the best-effort
    /// registrar path.
    pub fn fail_asset_posts(&self) {
        self.state.lock().fail_asset_posts = true;
    }

    #[must_use]
    pub fn workflow(&self, id: WorkflowId) -> Option<Workflow> {
        self.state.lock().workflows.get(&id).cloned()
    }

    #[must_use]
    pub fn assets(&self) -> Vec<(ProjectId, ResourceType, String)> {
        self.state.lock().assets.clone()
    }

    #[must_use]
    pub fn provenance(&self) -> Vec<ProvenanceRelation> {
        self.state.lock().provenance.clone()
    }

    /// Number of PUT /workflows cycles the store has absorbed.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.state.lock().put_count
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_workflow(&self, id: WorkflowId) -> Result<Workflow, CatalogError> {
        self.state
            .lock()
            .workflows
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("workflow"))
    }

    async fn put_workflow(&self, workflow: &Workflow) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        if !state.workflows.contains_key(&workflow.id) {
            return Err(not_found("workflow"));
        }
        state.workflows.insert(workflow.id, workflow.clone());
        state.put_count += 1;
        Ok(())
    }

    async fn create_workflow(&self, workflow: &Workflow) -> Result<WorkflowId, CatalogError> {
        self.state
            .lock()
            .workflows
            .insert(workflow.id, workflow.clone());
        Ok(workflow.id)
    }

    async fn create_project(&self, _project: &ProjectSeed) -> Result<ProjectId, CatalogError> {
        Ok(ProjectId::new(format!("project-{}", Uuid::new_v4())))
    }

    async fn get_model(&self, id: &ModelId) -> Result<Value, CatalogError> {
        self.state
            .lock()
            .models
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("model"))
    }

    async fn list_model_configs(
        &self,
        id: &ModelId,
    ) -> Result<Vec<ModelConfigSummary>, CatalogError> {
        self.state
            .lock()
            .config_summaries
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("model"))
    }

    async fn get_model_config(&self, id: &ConfigId) -> Result<ModelConfigRecord, CatalogError> {
        self.state
            .lock()
            .configs
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("model configuration"))
    }

    async fn create_model_config(&self, config: &Value) -> Result<ConfigId, CatalogError> {
        let id = ConfigId::new(format!("config-{}", Uuid::new_v4()));
        let mut stored = config.clone();
        stored["id"] = json!(id.as_str());
        let record: ModelConfigRecord =
            serde_json::from_value(stored).map_err(|_| not_found("model configuration"))?;
        self.state.lock().configs.insert(id.clone(), record);
        Ok(id)
    }

    async fn get_dataset(&self, id: &DatasetId) -> Result<DatasetRecord, CatalogError> {
        self.state
            .lock()
            .datasets
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("dataset"))
    }

    async fn get_simulation(&self, id: &RunId) -> Result<Value, CatalogError> {
        self.state
            .lock()
            .simulations
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("simulation"))
    }

    async fn search_models(&self, query: &str) -> Result<Value, CatalogError> {
        let state = self.state.lock();
        let hits: Vec<&Value> = state
            .models
            .values()
            .filter(|m| m.to_string().contains(query))
            .collect();
        Ok(json!(hits))
    }

    async fn add_asset(
        &self,
        project: &ProjectId,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        if state.fail_asset_posts {
            return Err(CatalogError::Status {
                url: "memory://assets".to_string(),
                status: 500,
                body: "asset registration disabled".to_string(),
            });
        }
        state
            .assets
            .push((project.clone(), resource_type, resource_id.to_string()));
        Ok(())
    }

    async fn add_provenance(&self, relation: &ProvenanceRelation) -> Result<(), CatalogError> {
        self.state.lock().provenance.push(relation.clone());
        Ok(())
    }
}

/// Record of one engine kickoff.
#[derive(Debug, Clone)]
pub struct KickoffRecord {
    pub service: EngineService,
    pub endpoint: EngineEndpoint,
    pub request: Value,
}

/// Stub [`SimulationEngine`] answering every kickoff with a canned run id.
pub struct StubEngine {
    run_id: Mutex<Option<RunId>>,
    kickoffs: Mutex<Vec<KickoffRecord>>,
}

impl StubEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Mutex::new(Some(RunId::new("run-1"))),
            kickoffs: Mutex::new(Vec::new()),
        }
    }

    /// Answer kickoffs with this run id; `None` mimics an engine whose
    /// kickoff body carries no id.
    #[must_use]
    pub fn with_run_id(self, run_id: Option<RunId>) -> Self {
        *self.run_id.lock() = run_id;
        self
    }

    #[must_use]
    pub fn kickoffs(&self) -> Vec<KickoffRecord> {
        self.kickoffs.lock().clone()
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimulationEngine for StubEngine {
    async fn kickoff(
        &self,
        service: EngineService,
        endpoint: EngineEndpoint,
        request: &Value,
    ) -> Result<DispatchReceipt, CatalogError> {
        self.kickoffs.lock().push(KickoffRecord {
            service,
            endpoint,
            request: request.clone(),
        });
        Ok(DispatchReceipt {
            success: true,
            status: 200,
            elapsed: Duration::from_millis(1),
            run_id: self.run_id.lock().clone(),
        })
    }
}

/// A model configuration record with an editable ODE semantics block.
#[must_use]
pub fn sample_config_record(id: &str, name: &str, model_id: &str) -> ModelConfigRecord {
    ModelConfigRecord {
        id: ConfigId::new(id),
        name: name.to_string(),
        description: "Seeded configuration".to_string(),
        model_id: ModelId::new(model_id),
        configuration: json!({
            "semantics": {
                "ode": {
                    "parameters": [
                        {"id": "beta", "value": 0.1},
                        {"id": "gamma", "value": 0.07},
                    ],
                    "initials": [
                        {
                            "target": "S",
                            "expression": "0.95",
                            "expression_mathml": "<math><cn>0.95</cn></math>",
                        },
                        {
                            "target": "I",
                            "expression": "0.05",
                            "expression_mathml": "<math><cn>0.05</cn></math>",
                        },
                    ],
                }
            }
        }),
    }
}

/// A dataset record with one CSV file.
#[must_use]
pub fn sample_dataset_record(id: &str, file_name: &str) -> DatasetRecord {
    DatasetRecord {
        id: DatasetId::new(id),
        name: Some(id.to_string()),
        file_names: vec![file_name.to_string()],
        rest: json!({}),
    }
}
