//! Header normalization for uploaded batch tables

use crate::error::StrengthError;
use crate::models::{Feature, MixDesign, NUM_RAW_FEATURES};

/// Canonical names of the required batch columns, in input order
pub const REQUIRED_COLUMNS: [&str; NUM_RAW_FEATURES] = [
    "Cement",
    "Blast Furnace Slag",
    "Fly Ash",
    "Water",
    "Superplasticizer",
    "Coarse Aggregate",
    "Fine Aggregate",
    "Age",
];

/// Lowercase with all whitespace removed
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Renames batch headers to their canonical spelling
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    required: Vec<&'static str>,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnMapper {
    pub fn new() -> Self {
        Self {
            required: REQUIRED_COLUMNS.to_vec(),
        }
    }

    /// Map headers to canonical names.
    ///
    /// For each canonical name the first header whose normalized form
    /// matches is renamed; all other headers are kept as-is. Fails listing
    /// every canonical name left without a match.
    pub fn map(&self, headers: &[String]) -> Result<ColumnMapping, StrengthError> {
        let mut renamed: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let normalized: Vec<String> = renamed.iter().map(|h| normalize_header(h)).collect();
        let mut indices = Vec::with_capacity(self.required.len());
        let mut missing = Vec::new();

        for canonical in &self.required {
            let key = normalize_header(canonical);
            let found = normalized
                .iter()
                .enumerate()
                .find(|(idx, n)| **n == key && !indices.contains(idx))
                .map(|(idx, _)| idx);
            match found {
                Some(idx) => {
                    renamed[idx] = canonical.to_string();
                    indices.push(idx);
                }
                None => missing.push(canonical.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(StrengthError::MissingColumns(missing));
        }

        Ok(ColumnMapping {
            headers: renamed,
            indices,
        })
    }
}

/// Result of a successful header mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    headers: Vec<String>,
    indices: Vec<usize>,
}

impl ColumnMapping {
    /// Table headers after renaming
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Position of a required column in the table
    pub fn index_of(&self, feature: Feature) -> Option<usize> {
        Feature::ALL[..NUM_RAW_FEATURES]
            .iter()
            .position(|f| *f == feature)
            .and_then(|pos| self.indices.get(pos).copied())
    }

    /// Parse one record into a mix design; `row` is 1-based for messages
    pub fn parse_record(&self, record: &[String], row: usize) -> Result<MixDesign, StrengthError> {
        let value = |pos: usize| -> Result<f64, StrengthError> {
            let column = REQUIRED_COLUMNS[pos];
            let raw = record
                .get(self.indices[pos])
                .map(|s| s.trim())
                .unwrap_or_default();
            raw.parse::<f64>().map_err(|_| {
                StrengthError::Table(format!(
                    "row {}, column '{}': expected a number, got '{}'",
                    row, column, raw
                ))
            })
        };

        let age = value(7)?;
        if !age.is_finite() || age < 0.0 || age.fract() != 0.0 || age > u32::MAX as f64 {
            return Err(StrengthError::Table(format!(
                "row {}, column 'Age': expected a whole number of days, got '{}'",
                row, age
            )));
        }

        Ok(MixDesign {
            cement: value(0)?,
            slag: value(1)?,
            fly_ash: value(2)?,
            water: value(3)?,
            superplasticizer: value(4)?,
            coarse_aggregate: value(5)?,
            fine_aggregate: value(6)?,
            age: age as u32,
        })
    }
}
