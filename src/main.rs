//! abztest - A/B test significance checker
//!
//! A CLI tool that runs a two-sample proportion z-test on control and
//! treatment conversion counts, and charts total clicks per device from
//! an experiment dataset.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid input, unreadable dataset, degenerate sample, etc.)
//!   2 - Result is Indeterminate and --fail-on-indeterminate was set

use abztest::cli::{Args, OutputFormat};
use abztest::config::{self, Config};
use abztest::models::{
    ConfidenceLevel, DeviceTotals, Report, ReportMetadata, RowWarning, TestOutcome,
};
use abztest::{analysis, dataset, report};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `general.verbose` can take effect
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&args, &config);

    info!("abztest v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .abztest.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   Edit it to set experiment counts, confidence and dataset columns.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Without `-v`, `-q` or `general.verbose`, `RUST_LOG` picks the filter
/// (INFO when unset).
fn init_logging(args: &Args, config: &Config) {
    let filter = match args.forced_log_level(config.general.verbose) {
        Some(level) => EnvFilter::default().add_directive(LevelFilter::from_level(level).into()),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the chart and test workflow. Returns the exit code (0 or 2).
fn run(args: Args, mut config: Config) -> Result<i32> {
    config.merge_with_args(&args);

    // Step 1: Load and aggregate the click dataset
    let mut metadata = ReportMetadata {
        generated_at: Utc::now(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        data_source: None,
        rows_processed: 0,
        rows_skipped: 0,
    };
    let mut warnings: Vec<RowWarning> = Vec::new();
    let mut device_totals: Option<DeviceTotals> = None;

    if let Some(ref data_path) = args.data {
        println!("📥 Loading dataset: {}", data_path.display());
        let settings = dataset::DatasetSettings::from(&config.dataset);
        let output = dataset::load_click_records(data_path, &settings)
            .with_context(|| format!("Failed to load dataset {}", data_path.display()))?;

        info!(
            "Read {} rows ({} skipped)",
            output.total_rows_processed, output.skipped_rows
        );
        debug!("Detected columns: {:?}", output.detected_columns);

        let totals = analysis::aggregate(&output.records);
        print_device_totals(&totals, &config);

        metadata.data_source = Some(data_path.display().to_string());
        metadata.rows_processed = output.total_rows_processed;
        metadata.rows_skipped = output.skipped_rows;
        warnings = output.warnings;
        device_totals = Some(totals);
    }

    // Step 2: Validate the experiment inputs
    let experiment = &config.experiment;
    let control = experiment.control();
    let treatment = experiment.treatment();
    control.validate("control")?;
    treatment.validate("treatment")?;
    let confidence = experiment.confidence_level()?;
    if !ConfidenceLevel::STANDARD.contains(&confidence) {
        warn!("Using non-standard confidence level {}", confidence);
    }

    // Step 3: Run the hypothesis test
    println!("\n🔬 Running hypothesis test...");
    println!("   Standard error: {}", experiment.standard_error);
    let result = analysis::evaluate(&control, &treatment, confidence, experiment.standard_error)?;
    println!("{}", report::terminal_summary(&result));

    let outcome = result.outcome;

    // Step 4: Write the report
    if !args.no_report {
        let report = Report {
            metadata,
            device_totals,
            warnings,
            test: result,
        };

        let output = match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
        };

        let output_path = PathBuf::from(&config.general.output);
        std::fs::write(&output_path, &output)
            .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

        println!("\n✅ Report saved to: {}", output_path.display());
    }

    if args.fail_on_indeterminate && outcome == TestOutcome::Indeterminate {
        eprintln!("\n⛔ Result is not significant at {}. Failing (exit code 2).", confidence);
        return Ok(2);
    }

    Ok(0)
}

/// Print the device totals and, if enabled, the bar chart.
fn print_device_totals(totals: &DeviceTotals, config: &Config) {
    println!(
        "\n📊 Clicks by device ({} devices, {} clicks)",
        totals.len(),
        analysis::total_clicks(totals)
    );

    if config.report.include_chart {
        println!();
        println!("{}", analysis::render_bar_chart(totals, config.report.chart_width));
    } else {
        for (device, clicks) in totals.iter() {
            println!("   {}: {}", device, clicks);
        }
    }
}

/// Load configuration from file or use defaults.
///
/// A missing default file means defaults; one that exists but does not
/// parse or validate is an error, same as an explicit `--config`.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}
