//! Error taxonomy for the strength pipeline
//!
//! Every failure is recovered at the component that detects it and carried
//! as a display-ready message. Nothing here is retried: all variants are
//! deterministic, user-correctable conditions.

use std::fmt;
use thiserror::Error;

use crate::validation::Violation;

/// Errors surfaced by the prediction pipeline
#[derive(Debug, Error)]
pub enum StrengthError {
    /// Raw inputs failed the range checks; the pipeline did not run
    #[error("invalid mix design: {0}")]
    Validation(ValidationErrors),

    /// Batch table lacks required columns after header normalization
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Scaler or model failed, or produced output of the wrong shape
    #[error("Prediction error: {0}")]
    Inference(String),

    /// Model artifact could not be loaded
    #[error("Error loading model: {0}")]
    ArtifactLoad(String),

    /// Batch table could not be read or a cell could not be parsed
    #[error("File read error: {0}")]
    Table(String),
}

impl StrengthError {
    /// Short machine-readable kind, used in API responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            StrengthError::Validation(_) => "validation",
            StrengthError::MissingColumns(_) => "missing_columns",
            StrengthError::Inference(_) => "inference",
            StrengthError::ArtifactLoad(_) => "artifact_load",
            StrengthError::Table(_) => "table",
        }
    }

    /// Individual user-facing messages for this error
    pub fn messages(&self) -> Vec<String> {
        match self {
            StrengthError::Validation(errors) => errors.messages(),
            StrengthError::MissingColumns(columns) => columns
                .iter()
                .map(|c| format!("Missing column: {}", c))
                .collect(),
            other => vec![other.to_string()],
        }
    }
}

/// Non-empty ordered list of validation violations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        debug_assert!(!violations.is_empty());
        Self(violations)
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|v| v.to_string()).collect()
    }

    pub fn contains(&self, violation: Violation) -> bool {
        self.0.contains(&violation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_all() {
        let err = StrengthError::MissingColumns(vec!["Water".to_string(), "Age".to_string()]);
        assert_eq!(err.to_string(), "Missing columns: Water, Age");
        assert_eq!(err.messages().len(), 2);
        assert_eq!(err.kind(), "missing_columns");
    }

    #[test]
    fn test_validation_messages_preserve_order() {
        let errors = ValidationErrors::new(vec![Violation::CementTooLow, Violation::WaterTooLow]);
        let messages = errors.messages();
        assert!(messages[0].starts_with("Cement too low"));
        assert!(messages[1].starts_with("Water too low"));
    }
}
