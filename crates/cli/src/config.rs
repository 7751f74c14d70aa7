//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Artifact used when neither flag, env var nor config file names one
pub const DEFAULT_ARTIFACT: &str = "concrete_strength_model.json";

/// Server used by the history commands by default
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CLI configuration file (`~/.config/concreteiq/config.json`)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Model artifact path
    pub artifact: Option<String>,
    /// Prediction server URL
    pub api_url: Option<String>,
    /// Default output format
    pub default_format: Option<OutputFormat>,
    /// Session id sent to the server
    pub session: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| {
            home.join(".config")
                .join("concreteiq")
                .join("config.json")
        })
    }

    /// Command-line value, then config file, then built-in default
    pub fn artifact(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.artifact.clone())
            .unwrap_or_else(|| DEFAULT_ARTIFACT.to_string())
    }

    pub fn api_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.default_format).unwrap_or_default()
    }
}
