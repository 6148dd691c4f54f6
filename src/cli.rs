//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Experiment values left unset fall back to
//! `.abztest.toml` and then to built-in defaults.

use crate::models::StandardErrorMethod;
use clap::Parser;
use std::path::PathBuf;

/// abztest - A/B test significance checker
///
/// Runs a two-sample proportion z-test on control and treatment
/// conversion counts and charts total clicks per device from an
/// experiment dataset. Markdown/JSON reports.
///
/// Examples:
///   abztest --control-visitors 5000 --control-conversions 400 \
///           --treatment-visitors 5000 --treatment-conversions 420
///   abztest --data clicks.csv --confidence 99
///   abztest --data clicks.csv --format json --output report.json
///   abztest --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Click dataset to chart (CSV export with Device and Clicks columns)
    #[arg(short, long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Number of visitors in the control group
    #[arg(long, value_name = "COUNT")]
    pub control_visitors: Option<u64>,

    /// Number of conversions in the control group
    #[arg(long, value_name = "COUNT")]
    pub control_conversions: Option<u64>,

    /// Number of visitors in the treatment group
    #[arg(long, value_name = "COUNT")]
    pub treatment_visitors: Option<u64>,

    /// Number of conversions in the treatment group
    #[arg(long, value_name = "COUNT")]
    pub treatment_conversions: Option<u64>,

    /// Confidence level in percent
    ///
    /// Usual choices are 90, 95 and 99. Any value strictly between
    /// 0 and 100 is accepted. Default: from config or 95.
    #[arg(long, value_name = "PCT", env = "ABZTEST_CONFIDENCE")]
    pub confidence: Option<f64>,

    /// Standard error estimate
    ///
    /// "control" uses the control group's rate only (default);
    /// "pooled" uses the pooled rate of both groups.
    #[arg(long, value_name = "METHOD")]
    pub standard_error: Option<StandardErrorMethod>,

    /// Header of the device column in the dataset
    #[arg(long, value_name = "NAME")]
    pub device_column: Option<String>,

    /// Header of the clicks column in the dataset
    #[arg(long, value_name = "NAME")]
    pub clicks_column: Option<String>,

    /// Field delimiter of the dataset
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Output file path for the report
    ///
    /// Default: from config or abtest_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Width of the longest bar in the click chart
    #[arg(long, value_name = "CHARS")]
    pub chart_width: Option<usize>,

    /// Leave the click chart out of the output
    #[arg(long)]
    pub no_chart: bool,

    /// Print the results without writing a report file
    #[arg(long)]
    pub no_report: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .abztest.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when the result is not significant
    ///
    /// Useful for CI pipelines gating a rollout on a significant result.
    #[arg(long)]
    pub fail_on_indeterminate: bool,

    /// Generate a default .abztest.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate visitor counts
        if self.control_visitors == Some(0) {
            return Err("Control visitors must be at least 1".to_string());
        }
        if self.treatment_visitors == Some(0) {
            return Err("Treatment visitors must be at least 1".to_string());
        }

        // Conversions cannot exceed visitors when both are given
        if let (Some(visitors), Some(conversions)) =
            (self.control_visitors, self.control_conversions)
        {
            if conversions > visitors {
                return Err("Control conversions cannot exceed control visitors".to_string());
            }
        }
        if let (Some(visitors), Some(conversions)) =
            (self.treatment_visitors, self.treatment_conversions)
        {
            if conversions > visitors {
                return Err("Treatment conversions cannot exceed treatment visitors".to_string());
            }
        }

        // Validate confidence range
        if let Some(confidence) = self.confidence {
            if !(confidence > 0.0 && confidence < 100.0) {
                return Err("Confidence must be strictly between 0 and 100".to_string());
            }
        }

        if self.chart_width == Some(0) {
            return Err("Chart width must be at least 1".to_string());
        }

        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err("Delimiter must be a single ASCII character".to_string());
            }
        }

        // Validate dataset path if provided
        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
            if !data.is_file() {
                return Err(format!("Dataset path is not a file: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Level fixed by `--quiet`, `--verbose` or a verbose config. `None`
    /// leaves the choice to `RUST_LOG`.
    pub fn forced_log_level(&self, config_verbose: bool) -> Option<tracing::Level> {
        if self.quiet || self.verbose {
            Some(self.log_level())
        } else if config_verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data: None,
            control_visitors: Some(5000),
            control_conversions: Some(400),
            treatment_visitors: Some(5000),
            treatment_conversions: Some(420),
            confidence: Some(95.0),
            standard_error: None,
            device_column: None,
            clicks_column: None,
            delimiter: None,
            output: None,
            format: OutputFormat::Markdown,
            chart_width: None,
            no_chart: false,
            no_report: false,
            config: None,
            verbose: false,
            quiet: false,
            fail_on_indeterminate: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_zero_visitors() {
        let mut args = make_args();
        args.control_visitors = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conversions_exceed_visitors() {
        let mut args = make_args();
        args.treatment_conversions = Some(6000);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_confidence_range() {
        let mut args = make_args();
        args.confidence = Some(100.0);
        assert!(args.validate().is_err());

        args.confidence = Some(80.0);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_dataset() {
        let mut args = make_args();
        args.data = Some(PathBuf::from("/definitely/not/here.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.control_visitors = Some(0);
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "abztest",
            "--control-visitors",
            "100",
            "--confidence",
            "99",
            "--standard-error",
            "pooled",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.control_visitors, Some(100));
        assert_eq!(args.control_conversions, None);
        assert_eq!(args.confidence, Some(99.0));
        assert_eq!(args.standard_error, Some(StandardErrorMethod::Pooled));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_negative_counts_rejected_by_parser() {
        let result = Args::try_parse_from(["abztest", "--control-visitors", "-5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_forced_log_level() {
        let mut args = make_args();
        assert_eq!(args.forced_log_level(false), None);
        assert_eq!(args.forced_log_level(true), Some(tracing::Level::DEBUG));

        args.quiet = true;
        assert_eq!(args.forced_log_level(true), Some(tracing::Level::ERROR));

        args.quiet = false;
        args.verbose = true;
        assert_eq!(args.forced_log_level(false), Some(tracing::Level::DEBUG));
    }
}
