//! reqwest-backed catalog client.

use crate::error::CatalogError;
use crate::store::CatalogStore;
use crate::types::{
    DatasetRecord, ModelConfigRecord, ModelConfigSummary, ProjectSeed, ProvenanceRelation,
    ResourceType,
};
use async_trait::async_trait;
use modelflow_graph::{ConfigId, DatasetId, ModelId, ProjectId, RunId, Workflow, WorkflowId};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

/// Attempts for idempotent GETs before giving up.
const GET_ATTEMPTS: u32 = 3;
/// Base backoff between GET attempts; grows linearly.
const GET_BACKOFF: Duration = Duration::from_millis(200);

/// Catalog connection settings.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl CatalogConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(20),
        }
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for the catalog service.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct IdEnvelope {
    id: String,
}

impl CatalogClient {
    #[must_use]
    pub fn new(config: CatalogConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(url: &str, response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        let status = response.status();
        if status.as_u16() >= 300 {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// GET with bounded linear-backoff retry; only retryable failures
    /// (transport, 5xx) trigger another attempt.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = self.url(path);
        let mut last_err = None;
        for attempt in 1..=GET_ATTEMPTS {
            let result = async {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|source| CatalogError::Transport {
                        url: url.clone(),
                        source,
                    })?;
                let response = Self::check(&url, response).await?;
                response.json::<T>().await.map_err(|source| CatalogError::Decode {
                    url: url.clone(),
                    source,
                })
            }
            .await;

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < GET_ATTEMPTS => {
                    tracing::warn!(%url, attempt, error = %err, "catalog GET failed, retrying");
                    tokio::time::sleep(GET_BACKOFF * attempt).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        // Unreachable with attempts >= 1; kept for the compiler.
        Err(last_err.unwrap_or(CatalogError::Status {
            url,
            status: 0,
            body: String::new(),
        }))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, CatalogError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.clone(),
                source,
            })?;
        let response = Self::check(&url, response).await?;
        response.json::<T>().await.map_err(|source| CatalogError::Decode {
            url: url.clone(),
            source,
        })
    }

    async fn post_empty(&self, path: &str) -> Result<(), CatalogError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::check(&url, response).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for CatalogClient {
    #[instrument(level = "debug", skip(self))]
    async fn get_workflow(&self, id: WorkflowId) -> Result<Workflow, CatalogError> {
        self.get_json(&format!("/workflows/{id}")).await
    }

    #[instrument(level = "debug", skip(self, workflow), fields(workflow_id = %workflow.id))]
    async fn put_workflow(&self, workflow: &Workflow) -> Result<(), CatalogError> {
        let url = self.url(&format!("/workflows/{}", workflow.id));
        let response = self
            .client
            .put(&url)
            .json(workflow)
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::check(&url, response).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, workflow))]
    async fn create_workflow(&self, workflow: &Workflow) -> Result<WorkflowId, CatalogError> {
        let created: Workflow = self.post_json("/workflows", workflow).await?;
        Ok(created.id)
    }

    #[instrument(level = "debug", skip(self, project))]
    async fn create_project(&self, project: &ProjectSeed) -> Result<ProjectId, CatalogError> {
        let envelope: IdEnvelope = self.post_json("/projects", project).await?;
        Ok(ProjectId::new(envelope.id))
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_model(&self, id: &ModelId) -> Result<Value, CatalogError> {
        self.get_json(&format!("/models/{id}")).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_model_configs(
        &self,
        id: &ModelId,
    ) -> Result<Vec<ModelConfigSummary>, CatalogError> {
        self.get_json(&format!("/models/{id}/model_configurations"))
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_model_config(&self, id: &ConfigId) -> Result<ModelConfigRecord, CatalogError> {
        self.get_json(&format!("/model_configurations/{id}")).await
    }

    #[instrument(level = "debug", skip(self, config))]
    async fn create_model_config(&self, config: &Value) -> Result<ConfigId, CatalogError> {
        let envelope: IdEnvelope = self.post_json("/model_configurations", config).await?;
        Ok(ConfigId::new(envelope.id))
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_dataset(&self, id: &DatasetId) -> Result<DatasetRecord, CatalogError> {
        self.get_json(&format!("/datasets/{id}")).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_simulation(&self, id: &RunId) -> Result<Value, CatalogError> {
        self.get_json(&format!("/simulations/{id}")).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn search_models(&self, query: &str) -> Result<Value, CatalogError> {
        let payload = serde_json::json!({
            "multi_match": {
                "query": query,
                "fields": ["header.name", "header.description"],
            }
        });
        self.post_json("/models/search", &payload).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn add_asset(
        &self,
        project: &ProjectId,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<(), CatalogError> {
        self.post_empty(&format!(
            "/projects/{project}/assets/{resource_type}/{resource_id}"
        ))
        .await
    }

    #[instrument(level = "debug", skip(self, relation))]
    async fn add_provenance(&self, relation: &ProvenanceRelation) -> Result<(), CatalogError> {
        let url = self.url("/provenance");
        let response = self
            .client
            .post(&url)
            .json(relation)
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::check(&url, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = CatalogClient::new(CatalogConfig::new("http://catalog/"));
        assert_eq!(client.url("/models/m1"), "http://catalog/models/m1");
    }

    #[test]
    fn config_timeout_override() {
        let config = CatalogConfig::new("http://catalog").with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
