//! Operation surface.
//!
//! The externally invocable operations that compose the graph
//! construction pieces: create project/workflow, add
//! model/dataset/simulation/calibration, lookups, config editing, node
//! removal. Every call takes an explicit [`OpContext`] naming the
//! project and workflow it acts on.
//!
//! Return contract: operations yield an [`OpOutcome`] with a
//! human-readable confirmation plus a structured detail. Validation
//! misses (unknown parameter key, unusable external id) come back as
//! recoverable outcomes; workflow persistence failures raise.

use crate::context::OpContext;
use crate::error::OpError;
use crate::mutator::WorkflowMutator;
use crate::registrar::AssetRegistrar;
use crate::settings::{SettingsPatch, SimulationSettings};
use modelflow_catalog::{
    CatalogStore, EngineEndpoint, EngineService, ProjectSeed, ResourceType, SimulationEngine,
};
use modelflow_graph::{
    connect, resolve_dataset, resolve_model, ConfigId, DatasetId, IdentifierIndex, ModelId, NodeId,
    NodeFactory, NodeState, Port, PortId, PortKind, PortStatus, ProjectId, RunId, Workflow,
    WorkflowId,
};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::instrument;
use uuid::Uuid;

/// Structured result carried alongside the confirmation message.
#[derive(Debug, Clone, PartialEq)]
pub enum OpDetail {
    ProjectCreated { project: ProjectId },
    WorkflowCreated { workflow: WorkflowId },
    NodeAdded { node: NodeId, run_id: Option<RunId> },
    ConfigCreated { config: ConfigId, node: NodeId },
    NodeRemoved { node: NodeId, removed: bool },
    /// External record fetched by a lookup or search
    Record(Value),
    /// A supplied parameter key matched nothing editable
    Rejected {
        invalid_key: String,
        valid_keys: Vec<String>,
    },
    /// The token was neither in-graph nor a usable external id
    InvalidIdentifier { token: String },
}

/// What an operation did, in both human and machine form.
#[derive(Debug, Clone, PartialEq)]
pub struct OpOutcome {
    pub message: String,
    pub detail: OpDetail,
}

impl OpOutcome {
    fn new(message: impl Into<String>, detail: OpDetail) -> Self {
        Self {
            message: message.into(),
            detail,
        }
    }
}

/// The workflow-construction toolset.
pub struct Toolset {
    store: Arc<dyn CatalogStore>,
    engine: Arc<dyn SimulationEngine>,
    mutator: WorkflowMutator,
    registrar: AssetRegistrar,
}

impl Toolset {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, engine: Arc<dyn SimulationEngine>) -> Self {
        let mutator = WorkflowMutator::new(store.clone());
        let registrar = AssetRegistrar::new(store.clone());
        Self {
            store,
            engine,
            mutator,
            registrar,
        }
    }

    /// Create a project in the catalog.
    #[instrument(level = "info", skip(self))]
    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
    ) -> Result<OpOutcome, OpError> {
        let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        let seed = ProjectSeed::new(name, format!("{description} (created {stamp} UTC)"));
        let project = self.store.create_project(&seed).await?;
        Ok(OpOutcome::new(
            format!("Created project {project}."),
            OpDetail::ProjectCreated { project },
        ))
    }

    /// Create an empty workflow and register it as a project asset.
    #[instrument(level = "info", skip(self))]
    pub async fn create_workflow(
        &self,
        project: &ProjectId,
        name: &str,
        description: &str,
    ) -> Result<OpOutcome, OpError> {
        let workflow = Workflow::new(name, description);
        let id = self.store.create_workflow(&workflow).await?;
        self.registrar
            .register(project, ResourceType::Workflows, &id.to_string())
            .await;
        Ok(OpOutcome::new(
            format!("Created workflow {id} ({name})."),
            OpDetail::WorkflowCreated { workflow: id },
        ))
    }

    /// Add a model node bound to the model's default configuration.
    #[instrument(level = "info", skip(self, ctx), fields(workflow = %ctx.workflow_id))]
    pub async fn add_model(
        &self,
        ctx: &OpContext,
        model_id: &ModelId,
    ) -> Result<OpOutcome, OpError> {
        let configs = self.store.list_model_configs(model_id).await?;
        let Some(config) = configs
            .iter()
            .find(|c| c.is_default())
            .or_else(|| configs.first())
        else {
            return Ok(OpOutcome::new(
                format!(
                    "Model {model_id} has no model configurations; it cannot be added to the workflow."
                ),
                OpDetail::InvalidIdentifier {
                    token: model_id.to_string(),
                },
            ));
        };
        let (config_id, config_name) = (config.id.clone(), config.name.clone());

        let model = model_id.clone();
        let node = self
            .mutator
            .update(ctx.workflow_id, move |wf| {
                let parts = NodeFactory::for_workflow(wf).model_node(
                    &model,
                    &config_id,
                    Some(&config_name),
                );
                let id = parts.node.id;
                wf.push_node(parts.node);
                Ok(id)
            })
            .await?;

        self.registrar
            .register(&ctx.project_id, ResourceType::Models, model_id.as_str())
            .await;
        Ok(OpOutcome::new(
            format!("Model {model_id} was added to the workflow."),
            OpDetail::NodeAdded { node, run_id: None },
        ))
    }

    /// Add a dataset node.
    #[instrument(level = "info", skip(self, ctx), fields(workflow = %ctx.workflow_id))]
    pub async fn add_dataset(
        &self,
        ctx: &OpContext,
        dataset_id: &DatasetId,
    ) -> Result<OpOutcome, OpError> {
        let dataset = dataset_id.clone();
        let node = self
            .mutator
            .update(ctx.workflow_id, move |wf| {
                let parts = NodeFactory::for_workflow(wf).dataset_node(&dataset);
                let id = parts.node.id;
                wf.push_node(parts.node);
                Ok(id)
            })
            .await?;

        self.registrar
            .register(&ctx.project_id, ResourceType::Datasets, dataset_id.as_str())
            .await;
        Ok(OpOutcome::new(
            format!("Dataset {dataset_id} was added to the workflow."),
            OpDetail::NodeAdded { node, run_id: None },
        ))
    }

    /// Kick off a simulation of a model configuration and wire a
    /// simulate node to the configuration's output port.
    #[instrument(level = "info", skip(self, ctx, settings), fields(workflow = %ctx.workflow_id))]
    pub async fn add_simulation(
        &self,
        ctx: &OpContext,
        model_config_token: &str,
        settings: Option<&SettingsPatch>,
    ) -> Result<OpOutcome, OpError> {
        let snapshot = self.mutator.read(ctx.workflow_id).await?;
        let index = IdentifierIndex::build(&snapshot);
        let binding = index
            .resolve(model_config_token)
            .ok_or_else(|| OpError::IdentifierNotFound(model_config_token.to_string()))?;
        let config_id = ConfigId::new(binding.external_id.clone());

        let effective = SimulationSettings::simulate_defaults()
            .apply(settings.unwrap_or(&SettingsPatch::default()));
        let request = effective.simulate_request(&config_id);
        let receipt = self
            .engine
            .kickoff(EngineService::PyCiemss, EngineEndpoint::Simulate, &request)
            .await?;
        if !receipt.success {
            tracing::warn!(status = receipt.status, "simulate kickoff was not accepted");
        }
        let known_run = receipt.run_id.clone();
        let run_id = known_run.clone().unwrap_or_else(RunId::pending);

        let token = model_config_token.to_string();
        let pending = known_run.is_none();
        let node = self
            .mutator
            .update(ctx.workflow_id, move |wf| {
                // Re-resolve against the fresh copy: the pre-kickoff
                // snapshot may be stale by now.
                let index = IdentifierIndex::build(wf);
                let binding = index
                    .resolve(&token)
                    .ok_or_else(|| OpError::IdentifierNotFound(token.clone()))?
                    .clone();
                let config = ConfigId::new(binding.external_id);

                let mut parts = NodeFactory::for_workflow(wf).simulate_node(
                    &config,
                    &run_id,
                    effective.timespan,
                    &effective.extra,
                );
                if pending {
                    if let NodeState::Simulate(state) = &mut parts.node.state {
                        state.simulations_in_progress.push(run_id.0.clone());
                    }
                }
                let id = parts.node.id;
                let input = parts.config_input;
                wf.push_node(parts.node);
                connect(wf, binding.node, binding.port, id, input)?;
                Ok(id)
            })
            .await?;

        if let Some(run) = &known_run {
            self.registrar
                .register(&ctx.project_id, ResourceType::Simulations, run.as_str())
                .await;
        }
        Ok(OpOutcome::new(
            "Simulation node was added to the workflow.",
            OpDetail::NodeAdded {
                node,
                run_id: known_run,
            },
        ))
    }

    /// Kick off a calibrate-then-simulate run against a dataset and wire
    /// a calibration node to the configuration and dataset ports.
    ///
    /// `mappings` pairs dataset column names with model variable names
    /// and must include the time column; a mapping carrying only the
    /// time column is accepted but flagged.
    #[instrument(
        level = "info",
        skip(self, ctx, mappings, settings),
        fields(workflow = %ctx.workflow_id)
    )]
    pub async fn add_calibration(
        &self,
        ctx: &OpContext,
        model_config_token: &str,
        dataset_token: &str,
        mappings: &BTreeMap<String, String>,
        settings: Option<&SettingsPatch>,
    ) -> Result<OpOutcome, OpError> {
        let snapshot = self.mutator.read(ctx.workflow_id).await?;
        let index = IdentifierIndex::build(&snapshot);
        let config_binding = index
            .resolve(model_config_token)
            .ok_or_else(|| OpError::IdentifierNotFound(model_config_token.to_string()))?;
        let config_id = ConfigId::new(config_binding.external_id.clone());
        let dataset_binding = resolve_dataset(&snapshot, dataset_token)
            .ok_or_else(|| OpError::IdentifierNotFound(dataset_token.to_string()))?;
        let dataset_id = dataset_binding.dataset_id.clone();

        let dataset_record = self.store.get_dataset(&dataset_id).await?;
        let file_name = dataset_record.file_names.first().cloned().unwrap_or_else(|| {
            tracing::warn!(%dataset_id, "dataset record lists no files");
            String::new()
        });

        let time_only = mappings.len() <= 1;
        if time_only {
            tracing::warn!(
                %dataset_id,
                "calibration mapping carries no state-variable pair, only a time column"
            );
        }

        let effective = SimulationSettings::calibrate_defaults()
            .apply(settings.unwrap_or(&SettingsPatch::default()));
        let request = effective.calibrate_request(&config_id, &dataset_id, &file_name, mappings);
        let receipt = self
            .engine
            .kickoff(EngineService::PyCiemss, EngineEndpoint::Calibrate, &request)
            .await?;
        if !receipt.success {
            tracing::warn!(status = receipt.status, "calibrate kickoff was not accepted");
        }
        let known_run = receipt.run_id.clone();
        let run_id = known_run.clone().unwrap_or_else(RunId::pending);

        let config_token = model_config_token.to_string();
        let ds_token = dataset_token.to_string();
        let pending = known_run.is_none();
        let node = self
            .mutator
            .update(ctx.workflow_id, move |wf| {
                let index = IdentifierIndex::build(wf);
                let config_binding = index
                    .resolve(&config_token)
                    .ok_or_else(|| OpError::IdentifierNotFound(config_token.clone()))?
                    .clone();
                let dataset_binding = resolve_dataset(wf, &ds_token)
                    .ok_or_else(|| OpError::IdentifierNotFound(ds_token.clone()))?;
                let config = ConfigId::new(config_binding.external_id);

                let mut parts = NodeFactory::for_workflow(wf).calibrate_node(
                    &config,
                    &dataset_binding.dataset_id,
                    &run_id,
                    effective.timespan,
                    &effective.extra,
                );
                if pending {
                    if let NodeState::Calibrate(state) = &mut parts.node.state {
                        state.simulations_in_progress.push(run_id.0.clone());
                    }
                }
                let id = parts.node.id;
                let config_input = parts.config_input;
                let dataset_input = parts.dataset_input;
                wf.push_node(parts.node);
                connect(wf, config_binding.node, config_binding.port, id, config_input)?;
                connect(wf, dataset_binding.node, dataset_binding.port, id, dataset_input)?;
                Ok(id)
            })
            .await?;

        if let Some(run) = &known_run {
            self.registrar
                .register(&ctx.project_id, ResourceType::Simulations, run.as_str())
                .await;
        }
        let message = if time_only {
            "Calibration node was added to the workflow. Note: the mapping pairs no model state \
             variable with a dataset column, so the calibration will only align on time."
                .to_string()
        } else {
            "Calibration node was added to the workflow.".to_string()
        };
        Ok(OpOutcome::new(message, OpDetail::NodeAdded {
            node,
            run_id: known_run,
        }))
    }

    /// Fetch a model record, accepting either an in-graph model node id
    /// or an external model id.
    #[instrument(level = "info", skip(self, ctx), fields(workflow = %ctx.workflow_id))]
    pub async fn lookup_model(&self, ctx: &OpContext, token: &str) -> Result<OpOutcome, OpError> {
        let snapshot = self.mutator.read(ctx.workflow_id).await?;
        let model_id = match resolve_model(&snapshot, token) {
            Some(binding) => binding.model_id,
            None => ModelId::new(token),
        };
        match self.store.get_model(&model_id).await {
            Ok(record) => Ok(OpOutcome::new(
                format!("Model {model_id} record fetched."),
                OpDetail::Record(record),
            )),
            Err(e) if e.is_client_rejection() => Ok(invalid_identifier("model", token)),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a dataset record, accepting a node id or an external id.
    #[instrument(level = "info", skip(self, ctx), fields(workflow = %ctx.workflow_id))]
    pub async fn lookup_dataset(&self, ctx: &OpContext, token: &str) -> Result<OpOutcome, OpError> {
        let snapshot = self.mutator.read(ctx.workflow_id).await?;
        let dataset_id = match resolve_dataset(&snapshot, token) {
            Some(binding) => binding.dataset_id,
            None => DatasetId::new(token),
        };
        match self.store.get_dataset(&dataset_id).await {
            Ok(record) => Ok(OpOutcome::new(
                format!("Dataset {dataset_id} record fetched."),
                OpDetail::Record(serde_json::to_value(&record).unwrap_or(Value::Null)),
            )),
            Err(e) if e.is_client_rejection() => Ok(invalid_identifier("dataset", token)),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a model configuration record, accepting an in-graph port id
    /// or an external configuration id.
    #[instrument(level = "info", skip(self, ctx), fields(workflow = %ctx.workflow_id))]
    pub async fn lookup_model_config(
        &self,
        ctx: &OpContext,
        token: &str,
    ) -> Result<OpOutcome, OpError> {
        let snapshot = self.mutator.read(ctx.workflow_id).await?;
        let index = IdentifierIndex::build(&snapshot);
        let config_id = match index.resolve(token) {
            Some(binding) => ConfigId::new(binding.external_id.clone()),
            None => ConfigId::new(token),
        };
        match self.store.get_model_config(&config_id).await {
            Ok(record) => Ok(OpOutcome::new(
                format!("Model configuration {config_id} record fetched."),
                OpDetail::Record(serde_json::to_value(&record).unwrap_or(Value::Null)),
            )),
            Err(e) if e.is_client_rejection() => {
                Ok(invalid_identifier("model configuration", token))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a simulation/calibration run record by its run id.
    #[instrument(level = "info", skip(self))]
    pub async fn lookup_simulation(&self, run_id: &RunId) -> Result<OpOutcome, OpError> {
        match self.store.get_simulation(run_id).await {
            Ok(record) => Ok(OpOutcome::new(
                format!("Simulation {run_id} record fetched."),
                OpDetail::Record(record),
            )),
            Err(e) if e.is_client_rejection() => {
                Ok(invalid_identifier("simulation", run_id.as_str()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full-text search over model names and descriptions.
    #[instrument(level = "info", skip(self))]
    pub async fn search_models(&self, query: &str) -> Result<OpOutcome, OpError> {
        let hits = self.store.search_models(query).await?;
        Ok(OpOutcome::new(
            format!("Model search for {query:?} completed."),
            OpDetail::Record(hits),
        ))
    }

    /// Derive a new model configuration with edited parameter values or
    /// initial conditions, and expose it as a new output port on the
    /// owning model node.
    ///
    /// `parameters` overrides are keyed by parameter id, `initials` by
    /// target variable. An unknown key is rejected with the list of
    /// valid keys rather than raised.
    #[instrument(
        level = "info",
        skip(self, ctx, parameters, initials),
        fields(workflow = %ctx.workflow_id)
    )]
    pub async fn edit_model_config(
        &self,
        ctx: &OpContext,
        model_token: &str,
        model_config_token: Option<&str>,
        parameters: Option<&BTreeMap<String, f64>>,
        initials: Option<&BTreeMap<String, f64>>,
    ) -> Result<OpOutcome, OpError> {
        let snapshot = self.mutator.read(ctx.workflow_id).await?;
        let model_binding = resolve_model(&snapshot, model_token)
            .ok_or_else(|| OpError::IdentifierNotFound(model_token.to_string()))?;

        let base_config_id = match model_config_token {
            Some(token) => {
                let index = IdentifierIndex::build(&snapshot);
                match index.resolve(token) {
                    Some(binding) => ConfigId::new(binding.external_id.clone()),
                    None => ConfigId::new(token),
                }
            }
            None => {
                let configs = self.store.list_model_configs(&model_binding.model_id).await?;
                let Some(config) = configs
                    .iter()
                    .find(|c| c.is_default())
                    .or_else(|| configs.first())
                else {
                    return Ok(invalid_identifier("model configuration", model_token));
                };
                config.id.clone()
            }
        };
        let record = self.store.get_model_config(&base_config_id).await?;
        let mut configuration = record.configuration.clone();

        if let Some(parameters) = parameters {
            if let Some(rejection) = apply_parameter_edits(&mut configuration, parameters) {
                return Ok(rejection);
            }
        }
        if let Some(initials) = initials {
            if let Some(rejection) = apply_initial_edits(&mut configuration, initials) {
                return Ok(rejection);
            }
        }

        // A fresh uuid keeps derived config names collision-free; the
        // description marks the lineage.
        let new_name = Uuid::new_v4().to_string();
        let payload = json!({
            "name": new_name,
            "description": format!("{} Modified", record.description),
            "model_id": record.model_id.as_str(),
            "configuration": configuration,
        });
        let new_config = self.store.create_model_config(&payload).await?;

        let node_id = model_binding.node;
        let config_for_port = new_config.clone();
        let port_label = new_name.clone();
        let node = self
            .mutator
            .update(ctx.workflow_id, move |wf| {
                let node = wf
                    .node_mut(node_id)
                    .ok_or(OpError::IdentifierNotFound(node_id.to_string()))?;
                if let NodeState::Model(state) = &mut node.state {
                    state.model_configuration_ids.push(config_for_port.clone());
                }
                node.outputs.push(Port {
                    id: PortId::new(),
                    kind: PortKind::ModelConfigId,
                    label: port_label,
                    value: vec![Value::String(config_for_port.0.clone())],
                    status: PortStatus::NotConnected,
                    accept_multiple: None,
                });
                Ok(node.id)
            })
            .await?;

        Ok(OpOutcome::new(
            format!(
                "Created model configuration {new_config} from {base_config_id} and added it to \
                 the model node."
            ),
            OpDetail::ConfigCreated {
                config: new_config,
                node,
            },
        ))
    }

    /// Remove a node from the workflow. Removing an id that is not
    /// present is a no-op, not an error.
    #[instrument(level = "info", skip(self, ctx), fields(workflow = %ctx.workflow_id))]
    pub async fn remove_node(&self, ctx: &OpContext, token: &str) -> Result<OpOutcome, OpError> {
        let node = Uuid::parse_str(token)
            .map(NodeId)
            .map_err(|_| OpError::IdentifierNotFound(token.to_string()))?;
        let removed = self
            .mutator
            .update(ctx.workflow_id, move |wf| Ok(wf.remove_node(node)))
            .await?;
        let message = if removed {
            format!("Node {node} was removed from the workflow.")
        } else {
            format!("Node {node} was not in the workflow; nothing to remove.")
        };
        Ok(OpOutcome::new(message, OpDetail::NodeRemoved { node, removed }))
    }
}

fn invalid_identifier(kind: &str, token: &str) -> OpOutcome {
    OpOutcome::new(
        format!(
            "{token:?} is neither an id in the current workflow nor a valid external {kind} id. \
             Check the workflow for the id you meant."
        ),
        OpDetail::InvalidIdentifier {
            token: token.to_string(),
        },
    )
}

fn ode_section<'a>(configuration: &'a mut Value, section: &str) -> Option<&'a mut Vec<Value>> {
    configuration
        .get_mut("semantics")?
        .get_mut("ode")?
        .get_mut(section)?
        .as_array_mut()
}

fn rejected(section: &str, invalid_key: &str, valid_keys: Vec<String>) -> OpOutcome {
    OpOutcome::new(
        format!(
            "{invalid_key:?} is not an editable {section} of this model configuration. \
             Valid keys: {valid_keys:?}."
        ),
        OpDetail::Rejected {
            invalid_key: invalid_key.to_string(),
            valid_keys,
        },
    )
}

/// Override parameter values in place; `Some(outcome)` reports the
/// first unknown parameter id.
fn apply_parameter_edits(
    configuration: &mut Value,
    edits: &BTreeMap<String, f64>,
) -> Option<OpOutcome> {
    let Some(entries) = ode_section(configuration, "parameters") else {
        return Some(rejected("parameter", "parameters", Vec::new()));
    };
    for (key, value) in edits {
        let Some(pos) = entries
            .iter()
            .position(|e| e.get("id").and_then(Value::as_str) == Some(key.as_str()))
        else {
            let valid = entries
                .iter()
                .filter_map(|e| e.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            return Some(rejected("parameter", key, valid));
        };
        entries[pos]["value"] = json!(value);
    }
    None
}

/// Override initial conditions in place, patching both the expression
/// and the numeric literal inside its MathML rendering.
fn apply_initial_edits(
    configuration: &mut Value,
    edits: &BTreeMap<String, f64>,
) -> Option<OpOutcome> {
    let Some(entries) = ode_section(configuration, "initials") else {
        return Some(rejected("initial condition", "initials", Vec::new()));
    };
    for (key, value) in edits {
        let Some(pos) = entries
            .iter()
            .position(|e| e.get("target").and_then(Value::as_str) == Some(key.as_str()))
        else {
            let valid = entries
                .iter()
                .filter_map(|e| e.get("target").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            return Some(rejected("initial condition", key, valid));
        };
        let rendered = value.to_string();
        let patched = entries[pos]
            .get("expression_mathml")
            .and_then(Value::as_str)
            .map(|mathml| replace_first_number(mathml, &rendered));
        entries[pos]["expression"] = json!(rendered);
        if let Some(patched) = patched {
            entries[pos]["expression_mathml"] = json!(patched);
        }
    }
    None
}

/// Matches a signed numeric literal.
fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-+]?[0-9]*\.?[0-9]+").expect("numeric literal pattern"))
}

/// Replace the first numeric literal in `text`, sign included.
fn replace_first_number(text: &str, replacement: &str) -> String {
    number_pattern()
        .replace(text, regex::NoExpand(replacement))
        .into_owned()
}
