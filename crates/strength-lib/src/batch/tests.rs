//! Tests for the batch prediction path

use super::*;
use crate::artifact::{LinearRegressor, ModelArtifact};
use crate::predictor::{FeatureMatrix, Regressor};
use std::sync::Arc;

/// Predicts the cement column divided by ten
struct CementModel;

impl Regressor for CementModel {
    fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
        Ok(features.rows().iter().map(|r| r[0] / 10.0).collect())
    }

    fn algorithm(&self) -> &str {
        "Cement"
    }
}

fn engine(model: Box<dyn Regressor>) -> InferenceEngine {
    InferenceEngine::new(Arc::new(ModelArtifact::bare(model)))
}

fn table(csv: &str) -> BatchTable {
    BatchTable::from_reader(csv.as_bytes()).unwrap()
}

#[test]
fn test_template_round_trips_through_batch() {
    let outcome = run_batch(&engine(Box::new(CementModel)), &table(&template_csv())).unwrap();
    assert_eq!(outcome.rows.len(), 3);
    assert_eq!(outcome.rows[0].prediction, 54.0);
    assert_eq!(outcome.rows[0].grade.code, "K-400+");
    assert_eq!(outcome.rows[2].prediction, 42.5);
    assert!((outcome.rows[0].water_cement_ratio - 0.3).abs() < 1e-12);
}

#[test]
fn test_headers_are_mapped_before_inference() {
    let csv = " cement ,BLAST FURNACE SLAG,fly ash,WATER,Superplasticizer,coarse aggregate,Fine Aggregate,age\n\
               300,0,0,180,0,950,750,28\n";
    let outcome = run_batch(&engine(Box::new(CementModel)), &table(csv)).unwrap();
    assert_eq!(outcome.headers, REQUIRED_COLUMNS.map(String::from).to_vec());
    assert_eq!(outcome.rows[0].prediction, 30.0);
}

#[test]
fn test_missing_columns_abort_before_inference() {
    let csv = "Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate\n\
               300,0,0,180,0,950,750\n";
    let engine = engine(Box::new(CementModel));
    match run_batch(&engine, &table(csv)) {
        Err(StrengthError::MissingColumns(missing)) => assert_eq!(missing, vec!["Age"]),
        other => panic!("expected missing columns, got {:?}", other),
    }
    assert_eq!(engine.stats().total_inferences, 0);
}

#[test]
fn test_bad_cell_aborts_whole_batch() {
    let csv = "Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate,Age\n\
               300,0,0,180,0,950,750,28\n\
               abc,0,0,180,0,950,750,28\n";
    let err = run_batch(&engine(Box::new(CementModel)), &table(csv)).unwrap_err();
    assert!(matches!(err, StrengthError::Table(_)));
    assert!(err.to_string().contains("row 2"));
}

#[test]
fn test_empty_table_rejected() {
    let csv = "Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate,Age\n";
    assert!(matches!(
        run_batch(&engine(Box::new(CementModel)), &table(csv)),
        Err(StrengthError::Table(_))
    ));
}

#[test]
fn test_ragged_csv_is_table_error() {
    let csv = "Cement,Water\n1,2,3\n";
    assert!(matches!(
        BatchTable::from_reader(csv.as_bytes()),
        Err(StrengthError::Table(_))
    ));
}

#[test]
fn test_zero_cement_row_uses_zero_ratio() {
    let csv = "Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate,Age\n\
               0,0,0,180,0,950,750,28\n";
    let model = LinearRegressor {
        coefficients: vec![0.1; 11],
        intercept: 0.0,
    };
    let outcome = run_batch(&engine(Box::new(model)), &table(csv)).unwrap();
    assert_eq!(outcome.rows[0].water_cement_ratio, 0.0);
    assert!(outcome.rows[0].prediction.is_finite());
}

#[test]
fn test_output_csv_appends_result_columns() {
    let csv = "Mix,Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate,AGE\n\
               A1,150,0,0,180,0,950,750,28\n";
    let outcome = run_batch(&engine(Box::new(CementModel)), &table(csv)).unwrap();
    let out = outcome.to_csv_string().unwrap();
    let mut lines = out.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Mix,Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate,Age,Predicted Strength (MPa),Grade,W/C Ratio"
    );
    assert_eq!(lines.next().unwrap(), "A1,150,0,0,180,0,950,750,28,15,K-175,1.2");
}

#[test]
fn test_summary_statistics() {
    let summary = BatchSummary::from_predictions(&[10.0, 25.0, 35.0, 50.0]);
    assert_eq!(summary.count, 4);
    assert_eq!(summary.mean, 30.0);
    assert_eq!(summary.max, 50.0);
    assert_eq!(summary.min, 10.0);
    // squared deviations sum to 850 over n - 1 = 3
    assert!((summary.std_dev - (850.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    let counts: Vec<usize> = summary.grades.iter().map(|g| g.count).collect();
    assert_eq!(counts, vec![1, 1, 1, 1]);
}

#[test]
fn test_summary_single_and_empty() {
    let single = BatchSummary::from_predictions(&[22.0]);
    assert_eq!(single.std_dev, 0.0);
    assert_eq!(single.grades[1].count, 1);

    let empty = BatchSummary::from_predictions(&[]);
    assert_eq!(empty.count, 0);
    assert_eq!(empty.grades.len(), 4);
}

#[test]
fn test_template_has_required_header() {
    let template = template_csv();
    assert_eq!(
        template.lines().next().unwrap(),
        "Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate,Age"
    );
    assert_eq!(template.lines().count(), 4);
    assert_eq!(template.lines().nth(1).unwrap(), "540,0,0,162,2.5,1040,676,28");
}
