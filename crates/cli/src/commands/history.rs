//! Prediction history on a running server

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    format_mpa, format_ratio, print_json, print_success, print_warning, OutputFormat,
};

/// Row for the history table
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Cement")]
    cement: String,
    #[tabled(rename = "Water")]
    water: String,
    #[tabled(rename = "W/C")]
    water_cement_ratio: String,
    #[tabled(rename = "Age")]
    age: u32,
    #[tabled(rename = "Strength")]
    prediction: String,
}

/// Show the session's most recent predictions
pub async fn show(client: &ApiClient, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let view = client.history(limit).await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            println!("{}", "Prediction History".bold());
            println!("{}", "=".repeat(60));
            println!("Session: {}", view.session.cyan());
            println!();

            if view.records.is_empty() {
                print_warning("No predictions recorded for this session");
                return Ok(());
            }

            let rows: Vec<HistoryRow> = view
                .records
                .iter()
                .map(|r| HistoryRow {
                    timestamp: format_timestamp(&r.timestamp),
                    cement: format!("{:.0}", r.mix.cement),
                    water: format!("{:.0}", r.mix.water),
                    water_cement_ratio: format_ratio(r.mix.water_cement_ratio()),
                    age: r.mix.age,
                    prediction: format_mpa(r.prediction),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nShowing {} of {} predictions", view.records.len(), view.total);
        }
    }

    Ok(())
}

/// Clear the session's history
pub async fn clear(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let cleared = client.clear_history().await?;

    match format {
        OutputFormat::Json => print_json(&cleared)?,
        OutputFormat::Table => print_success(&format!(
            "Cleared {} prediction(s) from session {}",
            cleared.removed, cleared.session
        )),
    }

    Ok(())
}

/// Format an RFC 3339 timestamp for display
fn format_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2024-03-01T10:00:00.123456Z"),
            "2024-03-01 10:00:00"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
