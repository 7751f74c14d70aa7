//! Inference orchestration and ONNX model execution using tract
//!
//! The engine derives features, lays them out in the artifact's column
//! order, applies the optional scaler and runs the regression model. Single
//! and batch paths share the same code; a batch is one scaler call and one
//! model call over the whole matrix, so it either fully succeeds or fails.

use super::features::FeatureDeriver;
use super::grade::GradeClassifier;
use super::{FeatureMatrix, Regressor};
use crate::artifact::ModelArtifact;
use crate::error::StrengthError;
use crate::models::{FeatureVector, GradeResult, MixDesign, NUM_FEATURES};
use crate::validation;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
pub const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX regression model run with tract over a symbolic `[N, 11]` batch
pub struct OnnxRegressor {
    model: TractModel,
}

impl OnnxRegressor {
    /// Load and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;
        let batch = model.sym("N");
        let model = model
            .with_input_fact(
                0,
                f32::fact([TDim::from(batch), TDim::from(NUM_FEATURES)]).into(),
            )
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model })
    }

    fn matrix_to_tensor(features: &FeatureMatrix) -> Result<Tensor> {
        let data: Vec<f32> = features
            .rows()
            .iter()
            .flat_map(|row| row.iter().map(|v| *v as f32))
            .collect();
        let array = tract_ndarray::Array2::from_shape_vec((features.n_rows(), NUM_FEATURES), data)
            .context("Feature matrix has the wrong shape for the ONNX model")?;
        Ok(array.into())
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if features.n_cols() != NUM_FEATURES {
            anyhow::bail!(
                "X has {} features, but the ONNX model is expecting {} features as input",
                features.n_cols(),
                NUM_FEATURES
            );
        }
        let n_rows = features.n_rows();
        if n_rows == 0 {
            return Ok(Vec::new());
        }

        let input = Self::matrix_to_tensor(features)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.get(0).context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        if view.len() < n_rows {
            anyhow::bail!(
                "Model returned {} values for {} rows",
                view.len(),
                n_rows
            );
        }
        // Regressors emit [N] or [N, 1]; either way the first N values line up with the rows
        Ok(view.iter().take(n_rows).map(|v| *v as f64).collect())
    }

    fn algorithm(&self) -> &str {
        "OnnxModel"
    }
}

/// Inference statistics
#[derive(Debug, Clone, Serialize)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
    pub failed_inferences: u64,
}

/// Full result of a single validated prediction
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub mix: MixDesign,
    pub prediction: f64,
    pub grade: GradeResult,
    pub water_cement_ratio: f64,
    pub total_material: f64,
    pub features: FeatureVector,
}

/// Orchestrates feature derivation, scaling and model prediction
pub struct InferenceEngine {
    artifact: Arc<ModelArtifact>,
    deriver: FeatureDeriver,
    classifier: GradeClassifier,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
    failed_inference_count: AtomicU64,
}

impl InferenceEngine {
    pub fn new(artifact: Arc<ModelArtifact>) -> Self {
        Self {
            artifact,
            deriver: FeatureDeriver::new(),
            classifier: GradeClassifier::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
            failed_inference_count: AtomicU64::new(0),
        }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn classifier(&self) -> &GradeClassifier {
        &self.classifier
    }

    pub fn deriver(&self) -> &FeatureDeriver {
        &self.deriver
    }

    /// Predict strength for one mix, clamped at zero
    pub fn predict_one(&self, mix: &MixDesign) -> Result<f64, StrengthError> {
        let features = self.deriver.derive(mix);
        let predictions = self.run(&[features])?;
        let value = predictions.first().copied().ok_or_else(|| {
            self.record_failure();
            StrengthError::Inference("Model returned no predictions".to_string())
        })?;
        Ok(clamp_strength(value))
    }

    /// Predict strength for every mix in one vectorized call
    pub fn predict_batch(&self, mixes: &[MixDesign]) -> Result<Vec<f64>, StrengthError> {
        if mixes.is_empty() {
            return Ok(Vec::new());
        }
        let features = self.deriver.derive_all(mixes);
        let predictions = self.run(&features)?;
        if predictions.len() != mixes.len() {
            self.record_failure();
            return Err(StrengthError::Inference(format!(
                "Model returned {} predictions for {} rows",
                predictions.len(),
                mixes.len()
            )));
        }
        Ok(predictions.into_iter().map(clamp_strength).collect())
    }

    /// Validate, predict and classify a single mix
    pub fn assess(&self, mix: &MixDesign) -> Result<Assessment, StrengthError> {
        validation::validate(mix)?;
        let prediction = self.predict_one(mix)?;
        Ok(Assessment {
            mix: *mix,
            prediction,
            grade: self.classifier.classify(prediction),
            water_cement_ratio: mix.water_cement_ratio(),
            total_material: mix.total_material(),
            features: self.deriver.derive(mix),
        })
    }

    /// Lay feature vectors out in the artifact's column order
    pub fn to_matrix(&self, features: &[FeatureVector]) -> Result<FeatureMatrix, StrengthError> {
        let schema = self.artifact.schema();
        let rows = features.iter().map(|f| f.ordered(schema.order())).collect();
        FeatureMatrix::new(schema.column_names(), rows)
            .map_err(|e| StrengthError::Inference(format!("{:#}", e)))
    }

    fn run(&self, features: &[FeatureVector]) -> Result<Vec<f64>, StrengthError> {
        let start = Instant::now();
        let matrix = self.to_matrix(features)?;

        let result = self.scale_and_predict(&matrix);
        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(predictions) => {
                if elapsed.as_millis() > MAX_INFERENCE_MS {
                    self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        elapsed_ms = elapsed.as_millis(),
                        rows = matrix.n_rows(),
                        "Inference exceeded {}ms target",
                        MAX_INFERENCE_MS
                    );
                } else {
                    debug!(
                        elapsed_us = elapsed.as_micros(),
                        rows = matrix.n_rows(),
                        "Inference completed"
                    );
                }
                Ok(predictions)
            }
            Err(e) => {
                self.record_failure();
                warn!(error = %e, rows = matrix.n_rows(), "Inference failed");
                Err(StrengthError::Inference(format!("{:#}", e)))
            }
        }
    }

    fn scale_and_predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        match self.artifact.scaler() {
            Some(scaler) => {
                let scaled = scaler.transform(matrix).context("Scaler transform failed")?;
                self.artifact.model().predict(&scaled)
            }
            None => self.artifact.model().predict(matrix),
        }
    }

    fn record_failure(&self) {
        self.failed_inference_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
            failed_inferences: self.failed_inference_count.load(Ordering::Relaxed),
        }
    }
}

/// Negative and NaN model outputs are not physical strengths
fn clamp_strength(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}
