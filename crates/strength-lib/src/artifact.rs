//! Model artifact loading
//!
//! An artifact is either a bare ONNX model or a JSON manifest bundling a
//! model with an optional scaler, declared feature names and training
//! metrics. It is loaded once at startup and shared read-only afterwards.

use crate::error::StrengthError;
use crate::models::{Feature, NUM_FEATURES};
use crate::predictor::{FeatureMatrix, OnnxRegressor, Regressor, Transformer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Feature name whose presence marks an artifact trained on localized columns
pub const LOCALIZED_MARKER: &str = "Semen";

/// Column layout expected by the loaded model, chosen once at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSchema {
    /// Localized column names, in the order the artifact declares them
    Localized { order: Vec<Feature> },
    /// Raw inputs in canonical order followed by the engineered features
    Default,
}

impl FeatureSchema {
    /// Pick the schema from the artifact's declared feature names
    pub fn resolve(feature_names: &[String]) -> Result<Self, StrengthError> {
        let is_localized = feature_names.len() == NUM_FEATURES
            && feature_names.iter().any(|n| n == LOCALIZED_MARKER);
        if !is_localized {
            return Ok(FeatureSchema::Default);
        }

        let mut order = Vec::with_capacity(NUM_FEATURES);
        let mut seen = HashSet::new();
        for name in feature_names {
            let feature = Feature::from_localized_name(name).ok_or_else(|| {
                StrengthError::ArtifactLoad(format!("Unknown localized feature name '{}'", name))
            })?;
            if !seen.insert(feature) {
                return Err(StrengthError::ArtifactLoad(format!(
                    "Duplicate feature name '{}'",
                    name
                )));
            }
            order.push(feature);
        }
        Ok(FeatureSchema::Localized { order })
    }

    pub fn order(&self) -> &[Feature] {
        match self {
            FeatureSchema::Localized { order } => order.as_slice(),
            FeatureSchema::Default => &Feature::ALL[..],
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        match self {
            FeatureSchema::Localized { order } => order
                .iter()
                .map(|f| f.localized_name().to_string())
                .collect(),
            FeatureSchema::Default => Feature::ALL.iter().map(|f| f.name().to_string()).collect(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureSchema::Localized { .. } => "localized",
            FeatureSchema::Default => "default",
        }
    }
}

/// Training metrics shipped with the artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(default, alias = "r2_score", skip_serializing_if = "Option::is_none")]
    pub r2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mae: Option<f64>,
}

/// Standardizing scaler: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Transformer for StandardScaler {
    fn transform(&self, features: &FeatureMatrix) -> Result<FeatureMatrix> {
        if self.mean.len() != self.scale.len() {
            anyhow::bail!(
                "Scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            );
        }
        if features.n_cols() != self.mean.len() {
            anyhow::bail!(
                "X has {} features, but StandardScaler is expecting {} features as input",
                features.n_cols(),
                self.mean.len()
            );
        }
        let rows = features
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(x, (mean, scale))| {
                        // Zero-variance columns are left unscaled
                        let scale = if *scale == 0.0 { 1.0 } else { *scale };
                        (x - mean) / scale
                    })
                    .collect()
            })
            .collect();
        features.with_rows(rows)
    }
}

/// Ordinary linear regression: `intercept + Σ coef·x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if features.n_cols() != self.coefficients.len() {
            anyhow::bail!(
                "X has {} features, but LinearRegression is expecting {} features as input",
                features.n_cols(),
                self.coefficients.len()
            );
        }
        Ok(features
            .rows()
            .iter()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(x, c)| x * c)
                        .sum::<f64>()
            })
            .collect())
    }

    fn algorithm(&self) -> &str {
        "LinearRegression"
    }

    fn coefficients(&self) -> Option<&[f64]> {
        Some(&self.coefficients)
    }
}

/// Model section of a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelSpec {
    Linear(LinearRegressor),
    Onnx {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },
}

/// On-disk JSON bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub model: ModelSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ModelMetrics>,
}

/// Loaded model bundle
pub struct ModelArtifact {
    model: Box<dyn Regressor>,
    scaler: Option<Box<dyn Transformer>>,
    feature_names: Vec<String>,
    metrics: Option<ModelMetrics>,
    schema: FeatureSchema,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("algorithm", &self.model.algorithm())
            .field("has_scaler", &self.scaler.is_some())
            .field("feature_names", &self.feature_names)
            .field("metrics", &self.metrics)
            .field("schema", &self.schema)
            .finish()
    }
}

impl ModelArtifact {
    /// Assemble an artifact, resolving its feature schema
    pub fn new(
        model: Box<dyn Regressor>,
        scaler: Option<Box<dyn Transformer>>,
        feature_names: Vec<String>,
        metrics: Option<ModelMetrics>,
    ) -> Result<Self, StrengthError> {
        let schema = FeatureSchema::resolve(&feature_names)?;
        Ok(Self {
            model,
            scaler,
            feature_names,
            metrics,
            schema,
        })
    }

    /// Artifact holding only a model
    pub fn bare(model: Box<dyn Regressor>) -> Self {
        Self {
            model,
            scaler: None,
            feature_names: Vec::new(),
            metrics: None,
            schema: FeatureSchema::Default,
        }
    }

    /// Load from a `.onnx` model file or a `.json` manifest
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StrengthError> {
        let path = path.as_ref();
        let is_onnx = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("onnx"))
            .unwrap_or(false);

        let artifact = if is_onnx {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read model file {}", path.display()))
                .map_err(load_error)?;
            let model = OnnxRegressor::from_bytes(&bytes).map_err(load_error)?;
            Self::bare(Box::new(model))
        } else {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read artifact manifest {}", path.display()))
                .map_err(load_error)?;
            let manifest: ArtifactManifest = serde_json::from_str(&content)
                .context("Failed to parse artifact manifest")
                .map_err(load_error)?;
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            Self::from_manifest(manifest, base_dir)?
        };

        info!(
            path = %path.display(),
            algorithm = %artifact.algorithm(),
            schema = artifact.schema.label(),
            has_scaler = artifact.has_scaler(),
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    /// Build from a parsed manifest; relative ONNX paths resolve against `base_dir`
    pub fn from_manifest(
        manifest: ArtifactManifest,
        base_dir: &Path,
    ) -> Result<Self, StrengthError> {
        let model: Box<dyn Regressor> = match manifest.model {
            ModelSpec::Linear(linear) => Box::new(linear),
            ModelSpec::Onnx { path, sha256 } => {
                let model_path = if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                };
                let bytes = std::fs::read(&model_path)
                    .with_context(|| format!("Failed to read model file {}", model_path.display()))
                    .map_err(load_error)?;
                if let Some(expected) = sha256 {
                    verify_checksum(&bytes, &expected)?;
                }
                Box::new(OnnxRegressor::from_bytes(&bytes).map_err(load_error)?)
            }
        };
        let scaler = manifest
            .scaler
            .map(|s| Box::new(s) as Box<dyn Transformer>);
        debug!(
            feature_names = manifest.feature_names.len(),
            "Building artifact from manifest"
        );
        Self::new(model, scaler, manifest.feature_names, manifest.metrics)
    }

    pub fn model(&self) -> &dyn Regressor {
        self.model.as_ref()
    }

    pub fn scaler(&self) -> Option<&dyn Transformer> {
        self.scaler.as_deref()
    }

    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn metrics(&self) -> Option<&ModelMetrics> {
        self.metrics.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn algorithm(&self) -> &str {
        self.model.algorithm()
    }

    /// Declared feature count, or the model width when nothing is declared
    pub fn feature_count(&self) -> usize {
        if self.feature_names.is_empty() {
            NUM_FEATURES
        } else {
            self.feature_names.len()
        }
    }

    /// Coefficients of the raw inputs paired with their display names
    pub fn feature_impact(&self) -> Option<Vec<(String, f64)>> {
        let coefficients = self.model.coefficients()?;
        let names = self.schema.column_names();
        let display: Vec<String> = if self.feature_names.is_empty() {
            names
        } else {
            self.feature_names.clone()
        };
        Some(
            display
                .into_iter()
                .zip(coefficients.iter().copied())
                .take(crate::models::NUM_RAW_FEATURES)
                .collect(),
        )
    }
}

fn load_error(err: anyhow::Error) -> StrengthError {
    StrengthError::ArtifactLoad(format!("{:#}", err))
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn verify_checksum(data: &[u8], expected: &str) -> Result<(), StrengthError> {
    let actual = compute_checksum(data);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(StrengthError::ArtifactLoad(format!(
            "Checksum mismatch: expected {}, got {}",
            expected, actual
        )))
    }
}
