//! External record types exchanged with the catalog service.

use modelflow_graph::{ConfigId, DatasetId, ModelId, ProjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary row returned by `GET /models/{id}/model_configurations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfigSummary {
    pub id: ConfigId,
    pub name: String,
}

impl ModelConfigSummary {
    /// A "default" configuration is picked by name, case-insensitively.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.name.to_lowercase().contains("default")
    }
}

/// Full model configuration record.
///
/// `configuration` stays schemaless: parameter and initial-condition
/// entries live under `configuration.semantics.ode` and are edited as
/// raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfigRecord {
    pub id: ConfigId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub model_id: ModelId,
    pub configuration: Value,
}

/// Dataset record; only the fields the engine consumes are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
    #[serde(flatten)]
    pub rest: Value,
}

/// Payload for `POST /projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSeed {
    pub name: String,
    pub description: String,
    pub assets: Vec<Value>,
    pub active: bool,
}

impl ProjectSeed {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            assets: Vec::new(),
            active: true,
        }
    }
}

/// Asset collection a resource is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Models,
    Datasets,
    Workflows,
    Simulations,
}

impl ResourceType {
    /// Path segment used in the project asset collection.
    #[must_use]
    pub fn as_path(&self) -> &'static str {
        match self {
            ResourceType::Models => "models",
            ResourceType::Datasets => "datasets",
            ResourceType::Workflows => "workflows",
            ResourceType::Simulations => "simulations",
        }
    }

    /// Provenance `right_type`: the path segment with its trailing `s`
    /// stripped and the first letter capitalized ("models" → "Model").
    #[must_use]
    pub fn provenance_type(&self) -> String {
        let path = self.as_path();
        let singular = path.strip_suffix('s').unwrap_or(path);
        let mut chars = singular.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_path())
    }
}

/// Provenance relation posted to `POST /provenance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRelation {
    pub relation_type: String,
    pub left: ProjectId,
    pub left_type: String,
    pub right: String,
    pub right_type: String,
}

impl ProvenanceRelation {
    /// Project CONTAINS resource.
    #[must_use]
    pub fn contains(project: &ProjectId, resource_id: &str, resource_type: ResourceType) -> Self {
        Self {
            relation_type: "CONTAINS".to_string(),
            left: project.clone(),
            left_type: "Project".to_string(),
            right: resource_id.to_string(),
            right_type: resource_type.provenance_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn provenance_type_mapping_table() {
        assert_eq!(ResourceType::Models.provenance_type(), "Model");
        assert_eq!(ResourceType::Datasets.provenance_type(), "Dataset");
        assert_eq!(ResourceType::Workflows.provenance_type(), "Workflow");
        assert_eq!(ResourceType::Simulations.provenance_type(), "Simulation");
    }

    #[test]
    fn contains_relation_shape() {
        let relation = ProvenanceRelation::contains(
            &ProjectId::new("p1"),
            "m1",
            ResourceType::Models,
        );
        let value = serde_json::to_value(&relation).unwrap();
        assert_eq!(
            value,
            json!({
                "relation_type": "CONTAINS",
                "left": "p1",
                "left_type": "Project",
                "right": "m1",
                "right_type": "Model",
            })
        );
    }

    #[test]
    fn default_config_is_case_insensitive() {
        let summary = ModelConfigSummary {
            id: ConfigId::new("c1"),
            name: "The DEFAULT config".to_string(),
        };
        assert!(summary.is_default());

        let other = ModelConfigSummary {
            id: ConfigId::new("c2"),
            name: "Tuned".to_string(),
        };
        assert!(!other.is_default());
    }

    #[test]
    fn dataset_record_decodes_file_names() {
        let record: DatasetRecord = serde_json::from_value(json!({
            "id": "ds1",
            "name": "traditional",
            "file_names": ["traditional.csv"],
            "columns": [{"name": "tstep"}],
        }))
        .unwrap();
        assert_eq!(record.file_names, vec!["traditional.csv"]);
    }
}
