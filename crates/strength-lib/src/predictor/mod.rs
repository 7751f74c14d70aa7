//! ML prediction engine

mod features;
mod grade;
mod inference;

pub use features::FeatureDeriver;
pub use grade::{GradeClassifier, GRADE_TABLE};
pub use inference::{Assessment, InferenceEngine, InferenceStats, OnnxRegressor, MAX_INFERENCE_MS};

use anyhow::Result;

/// Row-major numeric table handed to scalers and models
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix, checking that every row is as wide as the header
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            anyhow::bail!(
                "Row {} has {} values, expected {}",
                idx,
                row.len(),
                columns.len()
            );
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Same header, new values; used by transformers that preserve shape
    pub fn with_rows(&self, rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(self.columns.clone(), rows)
    }
}

/// Trait for regression model implementations
pub trait Regressor: Send + Sync {
    /// Predict one value per matrix row
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Human-readable algorithm name
    fn algorithm(&self) -> &str;

    /// Per-column coefficients, for models that have them
    fn coefficients(&self) -> Option<&[f64]> {
        None
    }
}

/// Trait for feature scalers applied before the model
pub trait Transformer: Send + Sync {
    /// Transform a matrix into one of identical shape
    fn transform(&self, features: &FeatureMatrix) -> Result<FeatureMatrix>;
}
