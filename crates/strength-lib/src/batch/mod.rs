//! Batch prediction over uploaded tables
//!
//! This module handles the CSV upload path:
//! - Reading the table and normalizing its headers
//! - One vectorized inference call over every row
//! - Output table with strength, grade and W/C ratio columns
//! - Summary statistics and grade distribution

mod columns;

#[cfg(test)]
mod tests;

pub use columns::{normalize_header, ColumnMapper, ColumnMapping, REQUIRED_COLUMNS};

use crate::error::StrengthError;
use crate::models::{GradeResult, MixDesign};
use crate::predictor::{GradeClassifier, InferenceEngine};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Column holding the predicted strength in the output table
pub const PREDICTION_COLUMN: &str = "Predicted Strength (MPa)";
/// Column holding the grade code in the output table
pub const GRADE_COLUMN: &str = "Grade";
/// Column holding the water/cement ratio in the output table
pub const WC_RATIO_COLUMN: &str = "W/C Ratio";

/// Rows of the downloadable template
const TEMPLATE_ROWS: [[f64; 8]; 3] = [
    [540.0, 0.0, 0.0, 162.0, 2.5, 1040.0, 676.0, 28.0],
    [450.0, 100.0, 0.0, 180.0, 3.0, 950.0, 720.0, 28.0],
    [425.0, 106.0, 0.0, 153.0, 4.0, 1000.0, 750.0, 28.0],
];

/// Raw uploaded table, all cells kept as text
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl BatchTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Self { headers, records }
    }

    /// Read a CSV table with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StrengthError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(table_error)?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let records = csv_reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(|c| c.to_string()).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(table_error)?;

        Ok(Self { headers, records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StrengthError> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            StrengthError::Table(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_reader(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-row prediction appended to the output table
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub mix: MixDesign,
    pub prediction: f64,
    pub grade: GradeResult,
    pub water_cement_ratio: f64,
}

/// Count of rows in one grade tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub code: &'static str,
    pub count: usize,
}

/// Summary statistics over a batch of predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Sample standard deviation (n - 1); 0 for fewer than two rows
    pub std_dev: f64,
    pub grades: Vec<GradeCount>,
}

impl BatchSummary {
    pub fn from_predictions(predictions: &[f64]) -> Self {
        let classifier = GradeClassifier::new();
        let grades = classifier
            .grades()
            .map(|grade| GradeCount {
                code: grade.code,
                count: predictions
                    .iter()
                    .filter(|p| classifier.classify(**p).code == grade.code)
                    .count(),
            })
            .collect();

        if predictions.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                max: 0.0,
                min: 0.0,
                std_dev: 0.0,
                grades,
            };
        }

        let n = predictions.len() as f64;
        let mean = predictions.iter().sum::<f64>() / n;
        let max = predictions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = predictions.iter().copied().fold(f64::INFINITY, f64::min);
        let std_dev = if predictions.len() < 2 {
            0.0
        } else {
            let sum_sq: f64 = predictions.iter().map(|p| (p - mean).powi(2)).sum();
            (sum_sq / (n - 1.0)).sqrt()
        };

        Self {
            count: predictions.len(),
            mean,
            max,
            min,
            std_dev,
            grades,
        }
    }
}

/// Completed batch: the mapped input table plus one result per row
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub headers: Vec<String>,
    #[serde(skip)]
    pub records: Vec<Vec<String>>,
    pub rows: Vec<BatchRow>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    /// Write the output table: input columns plus prediction, grade and W/C
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), StrengthError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header: Vec<&str> = self.headers.iter().map(String::as_str).collect();
        header.extend([PREDICTION_COLUMN, GRADE_COLUMN, WC_RATIO_COLUMN]);
        csv_writer.write_record(&header).map_err(table_error)?;

        for (record, row) in self.records.iter().zip(&self.rows) {
            let mut out = record.clone();
            out.push(row.prediction.to_string());
            out.push(row.grade.code.to_string());
            out.push(row.water_cement_ratio.to_string());
            csv_writer.write_record(&out).map_err(table_error)?;
        }

        csv_writer
            .flush()
            .map_err(|e| StrengthError::Table(e.to_string()))
    }

    pub fn to_csv_string(&self) -> Result<String, StrengthError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| StrengthError::Table(e.to_string()))
    }
}

/// Map columns, parse every row and run one batch prediction.
///
/// Any missing column, unparsable cell or model failure aborts the whole
/// batch; no partial results are returned.
pub fn run_batch(
    engine: &InferenceEngine,
    table: &BatchTable,
) -> Result<BatchOutcome, StrengthError> {
    let mapping = ColumnMapper::new().map(table.headers())?;

    if table.is_empty() {
        return Err(StrengthError::Table("CSV contains no data rows".to_string()));
    }

    let mixes = table
        .records()
        .iter()
        .enumerate()
        .map(|(idx, record)| mapping.parse_record(record, idx + 1))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(rows = mixes.len(), "Parsed batch table");

    let predictions = engine.predict_batch(&mixes)?;
    let classifier = engine.classifier();

    let rows: Vec<BatchRow> = mixes
        .iter()
        .zip(&predictions)
        .map(|(mix, prediction)| BatchRow {
            mix: *mix,
            prediction: *prediction,
            grade: classifier.classify(*prediction),
            water_cement_ratio: engine.deriver().derive(mix).water_cement_ratio,
        })
        .collect();

    let summary = BatchSummary::from_predictions(&predictions);
    info!(
        rows = summary.count,
        mean_mpa = summary.mean,
        "Batch prediction completed"
    );

    Ok(BatchOutcome {
        headers: mapping.headers().to_vec(),
        records: table.records().to_vec(),
        rows,
        summary,
    })
}

/// Downloadable CSV template with the required columns
pub fn template_csv() -> String {
    let mut out = REQUIRED_COLUMNS.join(",");
    out.push('\n');
    for row in TEMPLATE_ROWS {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn table_error(err: csv::Error) -> StrengthError {
    StrengthError::Table(err.to_string())
}
