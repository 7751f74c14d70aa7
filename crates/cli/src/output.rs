//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use strength_lib::Severity;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message to stderr, keeping stdout pipeable
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a strength in megapascals
pub fn format_mpa(value: f64) -> String {
    format!("{:.2} MPa", value)
}

/// Format a water/cement ratio
pub fn format_ratio(value: f64) -> String {
    format!("{:.2}", value)
}

/// Format a mass per cubic metre
pub fn format_mass(value: f64) -> String {
    format!("{:.1} kg/m³", value)
}

/// Color a grade code by its severity tier
pub fn color_grade(code: &str, severity: Severity) -> String {
    match severity {
        Severity::Low => code.red().to_string(),
        Severity::Medium => code.yellow().to_string(),
        Severity::High => code.green().to_string(),
        Severity::Ultra => code.cyan().bold().to_string(),
    }
}
