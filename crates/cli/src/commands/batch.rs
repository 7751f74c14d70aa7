//! Batch prediction and template export

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use strength_lib::batch::{run_batch, template_csv, BatchOutcome, BatchTable};
use strength_lib::InferenceEngine;
use tabled::Tabled;

use crate::output::{format_mpa, print_info, print_json, print_success, OutputFormat};

/// Row for the grade distribution table
#[derive(Tabled)]
struct GradeRow {
    #[tabled(rename = "Grade")]
    grade: String,
    #[tabled(rename = "Mixes")]
    count: usize,
    #[tabled(rename = "Share")]
    share: String,
}

/// Default output path: `<stem>_predictions.csv` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "batch".to_string());
    input.with_file_name(format!("{}_predictions.csv", stem))
}

/// Run a batch over a CSV file and write the result table
pub fn run(
    engine: &InferenceEngine,
    input: &Path,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let table = BatchTable::from_path(input)?;
    let outcome = run_batch(engine, &table)?;

    let output = output.unwrap_or_else(|| default_output_path(input));
    let file = std::fs::File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    outcome.write_csv(file)?;

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => {
            print_summary(&outcome);
            print_success(&format!("Results written to {}", output.display()));
        }
    }

    Ok(())
}

fn print_summary(outcome: &BatchOutcome) {
    let summary = &outcome.summary;

    println!("{}", "Batch Summary".bold());
    println!("{}", "=".repeat(50));
    println!("Mixes:        {}", summary.count);
    println!("Mean:         {}", format_mpa(summary.mean));
    println!("Max:          {}", format_mpa(summary.max));
    println!("Min:          {}", format_mpa(summary.min));
    println!("Std dev:      {}", format_mpa(summary.std_dev));
    println!();

    let rows: Vec<GradeRow> = summary
        .grades
        .iter()
        .map(|g| GradeRow {
            grade: g.code.to_string(),
            count: g.count,
            share: format!("{:.0}%", g.count as f64 * 100.0 / summary.count.max(1) as f64),
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
}

/// Write the CSV template to a file, or stdout when no path is given
pub fn write_template(output: Option<PathBuf>) -> Result<()> {
    let template = template_csv();
    match output {
        Some(path) => {
            std::fs::write(&path, template)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!("Template written to {}", path.display()));
        }
        None => {
            print!("{}", template);
            print_info("Fill in one mix per row and run `concreteiq batch <file>`");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strength_lib::artifact::{LinearRegressor, ModelArtifact};

    fn engine() -> InferenceEngine {
        let mut coefficients = vec![0.0; 11];
        coefficients[0] = 0.1;
        InferenceEngine::new(Arc::new(ModelArtifact::bare(Box::new(LinearRegressor {
            coefficients,
            intercept: 0.0,
        }))))
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/mixes.csv")),
            PathBuf::from("/data/mixes_predictions.csv")
        );
    }

    #[test]
    fn test_batch_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mixes.csv");
        std::fs::write(&input, template_csv()).unwrap();

        run(&engine(), &input, None, OutputFormat::Table).unwrap();

        let written = std::fs::read_to_string(dir.path().join("mixes_predictions.csv")).unwrap();
        assert_eq!(written.lines().count(), 4);
        assert!(written.lines().nth(1).unwrap().contains("K-400+"));
    }

    #[test]
    fn test_missing_column_reports_names() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mixes.csv");
        std::fs::write(&input, "Cement,Water\n300,180\n").unwrap();

        let err = run(&engine(), &input, None, OutputFormat::Table).unwrap_err();
        assert!(err.to_string().starts_with("Missing columns: Blast Furnace Slag"));
        assert!(!dir.path().join("mixes_predictions.csv").exists());
    }

    #[test]
    fn test_write_template_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.csv");
        write_template(Some(path.clone())).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), template_csv());
    }
}
