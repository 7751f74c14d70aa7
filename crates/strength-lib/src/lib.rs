//! Core library for concrete compressive-strength prediction
//!
//! This crate provides:
//! - Mix design validation and feature derivation
//! - Model artifact loading (linear manifests and ONNX models)
//! - Single and batch inference with grade classification
//! - Session-scoped prediction history
//! - Health checks and observability

pub mod artifact;
pub mod batch;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod validation;

pub use artifact::{FeatureSchema, ModelArtifact, ModelMetrics};
pub use batch::{run_batch, template_csv, BatchOutcome, BatchSummary, BatchTable};
pub use error::{StrengthError, ValidationErrors};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use history::{HistoryStore, PredictionHistory};
pub use models::*;
pub use observability::{StrengthMetrics, StructuredLogger};
pub use predictor::{Assessment, GradeClassifier, InferenceEngine, InferenceStats};
