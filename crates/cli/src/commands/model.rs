//! Model artifact information

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use strength_lib::{InferenceEngine, ModelMetrics};
use tabled::Tabled;

use crate::output::{print_json, print_warning, OutputFormat};

/// Row for the feature impact table
#[derive(Tabled, Serialize)]
struct ImpactRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Coefficient")]
    coefficient: String,
}

#[derive(Serialize)]
struct ModelInfo<'a> {
    algorithm: &'a str,
    schema: &'static str,
    feature_count: usize,
    feature_names: Vec<String>,
    has_scaler: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<&'a ModelMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_impact: Option<Vec<(String, f64)>>,
}

/// Show the loaded artifact's algorithm, schema, metrics and feature impact
pub fn show(engine: &InferenceEngine, format: OutputFormat) -> Result<()> {
    let artifact = engine.artifact();
    let feature_names = if artifact.feature_names().is_empty() {
        artifact.schema().column_names()
    } else {
        artifact.feature_names().to_vec()
    };
    let info = ModelInfo {
        algorithm: artifact.algorithm(),
        schema: artifact.schema().label(),
        feature_count: artifact.feature_count(),
        feature_names,
        has_scaler: artifact.has_scaler(),
        metrics: artifact.metrics(),
        feature_impact: artifact.feature_impact(),
    };

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Model Information".bold());
            println!("{}", "=".repeat(50));
            println!("Algorithm:    {}", info.algorithm.cyan());
            println!("Schema:       {}", info.schema);
            println!("Features:     {}", info.feature_count);
            println!("Scaler:       {}", if info.has_scaler { "yes" } else { "no" });

            match info.metrics {
                Some(m) => {
                    if let Some(r2) = m.r2 {
                        println!("R²:           {:.3}", r2);
                    }
                    if let Some(rmse) = m.rmse {
                        println!("RMSE:         {:.2} MPa", rmse);
                    }
                    if let Some(mae) = m.mae {
                        println!("MAE:          {:.2} MPa", mae);
                    }
                }
                None => print_warning("Artifact carries no training metrics"),
            }
            println!();

            match &info.feature_impact {
                Some(impact) => {
                    let rows: Vec<ImpactRow> = impact
                        .iter()
                        .map(|(feature, coefficient)| ImpactRow {
                            feature: feature.clone(),
                            coefficient: format!("{:+.4}", coefficient),
                        })
                        .collect();
                    let table = tabled::Table::new(rows)
                        .with(tabled::settings::Style::rounded())
                        .to_string();
                    println!("{}", "Feature Impact".bold());
                    println!("{}", table);
                }
                None => print_warning("Model does not expose coefficients"),
            }
        }
    }

    Ok(())
}
