//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use strength_lib::history::{DEFAULT_CAPACITY, DEFAULT_MAX_SESSIONS, DEFAULT_VIEW_LIMIT};

/// Server configuration, read from `CONCRETEIQ_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Model artifact: a `.json` manifest or a bare `.onnx` model
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,

    /// HTTP port for the prediction API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// History entries returned when no limit is given
    #[serde(default = "default_history_view_limit")]
    pub history_view_limit: usize,

    /// History entries retained per session
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Sessions kept before the least recently used one is evicted
    #[serde(default = "default_history_max_sessions")]
    pub history_max_sessions: usize,

    /// Instance name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
}

fn default_artifact_path() -> String {
    "concrete_strength_model.json".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_history_view_limit() -> usize {
    DEFAULT_VIEW_LIMIT
}

fn default_history_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_history_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "concreteiq".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_artifact_path(),
            api_port: default_api_port(),
            history_view_limit: default_history_view_limit(),
            history_capacity: default_history_capacity(),
            history_max_sessions: default_history_max_sessions(),
            instance_name: default_instance_name(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CONCRETEIQ").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("Invalid CONCRETEIQ_* configuration")
    }
}
