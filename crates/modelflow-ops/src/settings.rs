//! Simulation/calibration settings and engine request bodies.
//!
//! Callers hand over an optional patch; the patch replaces whole
//! sections (`timespan`, `extra`) rather than merging key-by-key, so a
//! patch carrying `extra` must carry every key it wants kept.

use modelflow_graph::{ConfigId, DatasetId, TimeSpan};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Engine name stamped into request bodies unless overridden.
pub const DEFAULT_ENGINE: &str = "ciemss";

/// Effective settings for one simulate or calibrate dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub engine: String,
    pub timespan: TimeSpan,
    pub extra: Value,
}

/// Caller-supplied override; `None` sections keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub timespan: Option<TimeSpan>,
    #[serde(default)]
    pub extra: Option<Value>,
}

impl SimulationSettings {
    /// Defaults for a plain simulation run.
    #[must_use]
    pub fn simulate_defaults() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            timespan: TimeSpan::default(),
            extra: json!({ "num_samples": 100 }),
        }
    }

    /// Defaults for a calibrate-then-simulate run.
    #[must_use]
    pub fn calibrate_defaults() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            timespan: TimeSpan::default(),
            extra: json!({
                "num_samples": 100,
                "start_time": -1e-10,
                "num_iterations": 1000,
                "lr": 0.03,
                "verbose": false,
                "num_particles": 1,
                "method": "dopri5",
            }),
        }
    }

    /// Replace whole sections from the patch.
    #[must_use]
    pub fn apply(mut self, patch: &SettingsPatch) -> Self {
        if let Some(engine) = &patch.engine {
            self.engine = engine.clone();
        }
        if let Some(timespan) = patch.timespan {
            self.timespan = timespan;
        }
        if let Some(extra) = &patch.extra {
            self.extra = extra.clone();
        }
        self
    }

    /// Request body for the `simulate` endpoint.
    #[must_use]
    pub fn simulate_request(&self, config: &ConfigId) -> Value {
        json!({
            "engine": self.engine,
            "username": "not_provided",
            "model_config_id": config.as_str(),
            "timespan": self.timespan,
            "extra": self.extra,
        })
    }

    /// Request body for the `calibrate` endpoint.
    #[must_use]
    pub fn calibrate_request(
        &self,
        config: &ConfigId,
        dataset: &DatasetId,
        file_name: &str,
        mappings: &BTreeMap<String, String>,
    ) -> Value {
        json!({
            "engine": self.engine,
            "username": "",
            "model_config_id": config.as_str(),
            "dataset": {
                "id": dataset.as_str(),
                "filename": file_name,
                "mappings": mappings,
            },
            "timespan": self.timespan,
            "extra": self.extra,
        })
    }
}
