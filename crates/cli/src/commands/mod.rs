//! CLI subcommands

pub mod batch;
pub mod history;
pub mod model;
pub mod predict;

use anyhow::{Context, Result};
use std::sync::Arc;
use strength_lib::{InferenceEngine, ModelArtifact};
use tracing::debug;

/// Load the artifact and wrap it in an inference engine
pub fn load_engine(artifact_path: &str) -> Result<InferenceEngine> {
    let artifact = ModelArtifact::load(artifact_path)
        .with_context(|| format!("Could not load model artifact '{}'", artifact_path))?;
    debug!(
        algorithm = %artifact.algorithm(),
        schema = artifact.schema().label(),
        "Model artifact loaded"
    );
    Ok(InferenceEngine::new(Arc::new(artifact)))
}
