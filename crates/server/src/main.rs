//! ConcreteIQ server - concrete compressive-strength prediction API
//!
//! Loads the model artifact once at startup and serves single and batch
//! predictions, per-session history, health checks and metrics.

use anyhow::{Context, Result};
use std::sync::Arc;
use strength_lib::{
    health::HealthRegistry,
    history::HistoryStore,
    observability::{StrengthMetrics, StructuredLogger},
    InferenceEngine, ModelArtifact,
};
use strength_server::{api, config::ServerConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting concreteiq-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        artifact = %config.artifact_path,
        "Server configured"
    );

    // A missing or corrupt artifact is fatal
    let artifact = match ModelArtifact::load(&config.artifact_path) {
        Ok(artifact) => artifact,
        Err(e) => {
            error!(error = %e, path = %config.artifact_path, "Failed to load model artifact");
            return Err(e).context("Model artifact could not be loaded");
        }
    };
    info!(
        algorithm = %artifact.algorithm(),
        schema = artifact.schema().label(),
        features = artifact.feature_count(),
        "Model artifact loaded"
    );

    let health_registry = HealthRegistry::new();
    health_registry
        .record_artifact_loaded(format!(
            "{} ({} schema)",
            artifact.algorithm(),
            artifact.schema().label()
        ))
        .await;

    let metrics = StrengthMetrics::new();
    metrics.set_model_info(artifact.algorithm(), artifact.schema().label());

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(
        SERVER_VERSION,
        artifact.algorithm(),
        artifact.schema().label(),
        config.api_port,
    );

    let engine = Arc::new(InferenceEngine::new(Arc::new(artifact)));
    let history = Arc::new(HistoryStore::new(
        config.history_capacity,
        config.history_max_sessions,
    ));

    let app_state = Arc::new(api::AppState::new(
        engine,
        history,
        health_registry.clone(),
        metrics,
        logger.clone(),
        config.history_view_limit,
    ));

    health_registry.set_ready(true).await;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    };
    api::serve(config.api_port, app_state, shutdown).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
