//! Integration dispatcher for the simulation engines.
//!
//! One POST kicks off a run on the probabilistic (PyCIEMSS) or
//! deterministic (SciML) engine. Completion is not awaited here: the
//! kickoff response is parsed for a run id when the engine provides
//! one, and [`SimulationEngine`] is the extension point for an
//! asynchronous polling or webhook completion strategy.

use crate::error::CatalogError;
use async_trait::async_trait;
use modelflow_graph::RunId;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Engine selected by service name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineService {
    PyCiemss,
    SciMl,
}

impl EngineService {
    /// `"pyciemss"` selects the probabilistic engine; any other name
    /// falls through to the SciML endpoint.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name == "pyciemss" {
            EngineService::PyCiemss
        } else {
            EngineService::SciMl
        }
    }
}

/// Operations exposed by both engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEndpoint {
    Simulate,
    Calibrate,
    OptimizeSimulate,
    OptimizeCalibrate,
}

impl EngineEndpoint {
    #[must_use]
    pub fn as_path(&self) -> &'static str {
        match self {
            EngineEndpoint::Simulate => "simulate",
            EngineEndpoint::Calibrate => "calibrate",
            EngineEndpoint::OptimizeSimulate => "optimize-simulate",
            EngineEndpoint::OptimizeCalibrate => "optimize-calibrate",
        }
    }
}

impl std::fmt::Display for EngineEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_path())
    }
}

/// Outcome of a kickoff POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Whether the engine accepted the request (2xx)
    pub success: bool,
    /// HTTP status of the kickoff response
    pub status: u16,
    /// Wall time spent on the kickoff call
    pub elapsed: Duration,
    /// Run id parsed from the kickoff body, when the engine returned one
    pub run_id: Option<RunId>,
}

/// Dispatch seam for simulate/calibrate kickoffs.
#[async_trait]
pub trait SimulationEngine: Send + Sync {
    /// POST the caller-assembled request body to `{base}/{endpoint}`.
    ///
    /// A non-success engine answer is reported in the receipt, not as
    /// an error; only transport failures raise.
    async fn kickoff(
        &self,
        service: EngineService,
        endpoint: EngineEndpoint,
        request: &Value,
    ) -> Result<DispatchReceipt, CatalogError>;
}

/// Engine connection settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pyciemss_url: String,
    pub sciml_url: String,
    pub timeout: Duration,
}

impl EngineConfig {
    #[must_use]
    pub fn new(pyciemss_url: impl Into<String>, sciml_url: impl Into<String>) -> Self {
        Self {
            pyciemss_url: pyciemss_url.into(),
            sciml_url: sciml_url.into(),
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

/// HTTP client for the two simulation engines.
#[derive(Debug, Clone)]
pub struct EngineClient {
    client: Client,
    pyciemss_url: String,
    sciml_url: String,
}

impl EngineClient {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client");
        Self {
            client,
            pyciemss_url: config.pyciemss_url.trim_end_matches('/').to_string(),
            sciml_url: config.sciml_url.trim_end_matches('/').to_string(),
        }
    }

    fn base_url(&self, service: EngineService) -> &str {
        match service {
            EngineService::PyCiemss => &self.pyciemss_url,
            EngineService::SciMl => &self.sciml_url,
        }
    }
}

/// Pull a run id out of a kickoff response body.
///
/// The engines answer with `{"simulation_id": ...}`; older deployments
/// used a bare `{"id": ...}`.
fn parse_run_id(body: &Value) -> Option<RunId> {
    body.get("simulation_id")
        .or_else(|| body.get("id"))
        .and_then(Value::as_str)
        .map(RunId::new)
}

#[async_trait]
impl SimulationEngine for EngineClient {
    #[instrument(level = "info", skip(self, request))]
    async fn kickoff(
        &self,
        service: EngineService,
        endpoint: EngineEndpoint,
        request: &Value,
    ) -> Result<DispatchReceipt, CatalogError> {
        let url = format!("{}/{}", self.base_url(service), endpoint.as_path());
        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let success = response.status().is_success();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        tracing::info!(%url, status, %body, "engine kickoff answered");

        let run_id = if success { parse_run_id(&body) } else { None };
        Ok(DispatchReceipt {
            success,
            status,
            elapsed: start.elapsed(),
            run_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn service_selection_by_name() {
        assert_eq!(EngineService::from_name("pyciemss"), EngineService::PyCiemss);
        assert_eq!(EngineService::from_name("sciml"), EngineService::SciMl);
        assert_eq!(EngineService::from_name("anything"), EngineService::SciMl);
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(EngineEndpoint::Simulate.as_path(), "simulate");
        assert_eq!(EngineEndpoint::Calibrate.as_path(), "calibrate");
        assert_eq!(EngineEndpoint::OptimizeSimulate.as_path(), "optimize-simulate");
        assert_eq!(EngineEndpoint::OptimizeCalibrate.as_path(), "optimize-calibrate");
    }

    #[test]
    fn run_id_parsed_from_simulation_id_then_id() {
        assert_eq!(
            parse_run_id(&json!({"simulation_id": "run-1"})),
            Some(RunId::new("run-1"))
        );
        assert_eq!(parse_run_id(&json!({"id": "run-2"})), Some(RunId::new("run-2")));
        assert_eq!(parse_run_id(&json!({"status": "queued"})), None);
    }

    #[test]
    fn base_url_per_service() {
        let client = EngineClient::new(EngineConfig::new("http://pyciemss/", "http://sciml"));
        assert_eq!(client.base_url(EngineService::PyCiemss), "http://pyciemss");
        assert_eq!(client.base_url(EngineService::SciMl), "http://sciml");
    }
}
