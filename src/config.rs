//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.abztest.toml` files.

use crate::error::StatsError;
use crate::models::{ConfidenceLevel, GroupSample, StandardErrorMethod};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".abztest.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Experiment inputs.
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Dataset settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "abtest_report.md".to_string()
}

/// Visitor and conversion counts for both arms, and the test settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_visitors")]
    pub control_visitors: u64,

    #[serde(default = "default_control_conversions")]
    pub control_conversions: u64,

    #[serde(default = "default_visitors")]
    pub treatment_visitors: u64,

    #[serde(default = "default_treatment_conversions")]
    pub treatment_conversions: u64,

    /// Confidence level in percent (90, 95 and 99 are the usual choices).
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// Standard error estimate: "control" (default) or "pooled".
    #[serde(default)]
    pub standard_error: StandardErrorMethod,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            control_visitors: default_visitors(),
            control_conversions: default_control_conversions(),
            treatment_visitors: default_visitors(),
            treatment_conversions: default_treatment_conversions(),
            confidence: default_confidence(),
            standard_error: StandardErrorMethod::default(),
        }
    }
}

fn default_visitors() -> u64 {
    5000
}

fn default_control_conversions() -> u64 {
    400
}

fn default_treatment_conversions() -> u64 {
    420
}

fn default_confidence() -> f64 {
    95.0
}

impl ExperimentConfig {
    pub fn control(&self) -> GroupSample {
        GroupSample::new(self.control_visitors, self.control_conversions)
    }

    pub fn treatment(&self) -> GroupSample {
        GroupSample::new(self.treatment_visitors, self.treatment_conversions)
    }

    pub fn confidence_level(&self) -> Result<ConfidenceLevel, StatsError> {
        ConfidenceLevel::new(self.confidence)
    }
}

/// Dataset column and format settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Header of the device category column.
    #[serde(default = "default_device_column")]
    pub device_column: String,

    /// Header of the click count column.
    #[serde(default = "default_clicks_column")]
    pub clicks_column: String,

    /// Field delimiter (single ASCII character).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            device_column: default_device_column(),
            clicks_column: default_clicks_column(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_device_column() -> String {
    "Device".to_string()
}

fn default_clicks_column() -> String {
    "Clicks".to_string()
}

fn default_delimiter() -> char {
    ','
}

impl DatasetConfig {
    /// Delimiter as a byte. `Config::validate` rejects non-ASCII
    /// delimiters, so the fallback only applies to unvalidated values.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Width of the longest bar in the click chart.
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,

    /// Include the click chart in the report and terminal output.
    #[serde(default = "default_true")]
    pub include_chart: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            chart_width: default_chart_width(),
            include_chart: true,
        }
    }
}

fn default_chart_width() -> usize {
    40
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if !self.dataset.delimiter.is_ascii() {
            anyhow::bail!(
                "dataset.delimiter must be a single ASCII character, got '{}'",
                self.dataset.delimiter
            );
        }
        if self.report.chart_width == 0 {
            anyhow::bail!("report.chart_width must be at least 1");
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.abztest.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when they were given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        let experiment = &mut self.experiment;
        if let Some(n) = args.control_visitors {
            experiment.control_visitors = n;
        }
        if let Some(n) = args.control_conversions {
            experiment.control_conversions = n;
        }
        if let Some(n) = args.treatment_visitors {
            experiment.treatment_visitors = n;
        }
        if let Some(n) = args.treatment_conversions {
            experiment.treatment_conversions = n;
        }
        if let Some(confidence) = args.confidence {
            experiment.confidence = confidence;
        }
        if let Some(method) = args.standard_error {
            experiment.standard_error = method;
        }

        if let Some(ref column) = args.device_column {
            self.dataset.device_column = column.clone();
        }
        if let Some(ref column) = args.clicks_column {
            self.dataset.clicks_column = column.clone();
        }
        if let Some(delimiter) = args.delimiter {
            self.dataset.delimiter = delimiter;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(width) = args.chart_width {
            self.report.chart_width = width;
        }
        if args.no_chart {
            self.report.include_chart = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
