//! Markdown, JSON and terminal report generation.
//!
//! This module renders the click breakdown and the z-test result of a
//! run into a report file, and into the short summary printed at the end.

use crate::analysis::{click_share, render_bar_chart, top_device, total_clicks};
use crate::config::ReportConfig;
use crate::models::{DeviceTotals, Report, ReportMetadata, RowWarning, ZTestResult};
use anyhow::Result;

/// Maximum number of skipped-row warnings listed in the Markdown report.
const MAX_LISTED_WARNINGS: usize = 20;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, settings: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# A/B Test Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    if let Some(ref totals) = report.device_totals {
        output.push_str(&generate_clicks_section(totals, settings));
    }

    output.push_str(&generate_warnings_section(&report.warnings));
    output.push_str(&generate_test_section(&report.test));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Tool Version:** {}\n", metadata.tool_version));
    if let Some(ref source) = metadata.data_source {
        section.push_str(&format!("- **Dataset:** `{}`\n", source));
        section.push_str(&format!(
            "- **Rows Processed:** {}\n",
            metadata.rows_processed
        ));
        if metadata.rows_skipped > 0 {
            section.push_str(&format!("- **Rows Skipped:** {}\n", metadata.rows_skipped));
        }
    }
    section.push('\n');

    section
}

/// Generate the clicks-by-device section.
fn generate_clicks_section(totals: &DeviceTotals, settings: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Total Clicks by Device\n\n");

    if totals.is_empty() {
        section.push_str("The dataset contains no usable rows.\n\n");
        return section;
    }

    section.push_str("| Device | Clicks | Share |\n");
    section.push_str("|:---|---:|---:|\n");

    let shares = click_share(totals);
    for (device, clicks) in totals.iter() {
        let share = shares
            .iter()
            .find(|(d, _)| d == device)
            .map(|(_, s)| format!("{:.1}%", s))
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!("| {} | {} | {} |\n", device, clicks, share));
    }
    section.push_str(&format!("| **Total** | **{}** | |\n\n", total_clicks(totals)));

    if let Some((device, clicks)) = top_device(totals) {
        section.push_str(&format!("Most clicks: **{}** ({}).\n\n", device, clicks));
    }

    if settings.include_chart {
        section.push_str("```text\n");
        section.push_str(&render_bar_chart(totals, settings.chart_width));
        section.push_str("\n```\n\n");
    }

    section
}

/// Generate the skipped-rows section.
fn generate_warnings_section(warnings: &[RowWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Skipped Rows\n\n");
    for warning in warnings.iter().take(MAX_LISTED_WARNINGS) {
        section.push_str(&format!("- Line {}: {}\n", warning.line, warning.message));
    }
    if warnings.len() > MAX_LISTED_WARNINGS {
        section.push_str(&format!(
            "- ... and {} more\n",
            warnings.len() - MAX_LISTED_WARNINGS
        ));
    }
    section.push('\n');

    section
}

/// Generate the hypothesis test section.
fn generate_test_section(result: &ZTestResult) -> String {
    let mut section = String::new();

    section.push_str("## Hypothesis Test\n\n");

    section.push_str("| Group | Visitors | Conversions | Rate |\n");
    section.push_str("|:---|---:|---:|---:|\n");
    section.push_str(&format!(
        "| Control | {} | {} | {:.4}% |\n",
        result.control.visitors,
        result.control.conversions,
        result.control_rate * 100.0
    ));
    section.push_str(&format!(
        "| Treatment | {} | {} | {:.4}% |\n\n",
        result.treatment.visitors,
        result.treatment.conversions,
        result.treatment_rate * 100.0
    ));

    section.push_str("| Statistic | Value |\n");
    section.push_str("|:---|---:|\n");
    section.push_str(&format!("| Confidence level | {} |\n", result.confidence));
    section.push_str(&format!("| Standard error method | {} |\n", result.method));
    section.push_str(&format!(
        "| Rate difference | {:+.4} pp |\n",
        result.difference * 100.0
    ));
    if let Some(lift) = result.relative_lift {
        section.push_str(&format!("| Relative lift | {:+.2}% |\n", lift * 100.0));
    }
    section.push_str(&format!(
        "| Standard error | {:.6} |\n",
        result.standard_error
    ));
    section.push_str(&format!("| z-score | {:.4} |\n", result.z_score));
    section.push_str(&format!("| Critical z | ±{:.4} |\n", result.z_critical));
    section.push_str(&format!("| p-value | {:.4} |\n\n", result.p_value));

    section.push_str(&format!(
        "**Result:** {} {}\n\n",
        result.outcome.emoji(),
        result.outcome
    ));

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by abztest*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Short plain-text summary for the terminal.
pub fn terminal_summary(result: &ZTestResult) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "   Control:   {:.4}% ({}/{})",
        result.control_rate * 100.0,
        result.control.conversions,
        result.control.visitors
    ));
    lines.push(format!(
        "   Treatment: {:.4}% ({}/{})",
        result.treatment_rate * 100.0,
        result.treatment.conversions,
        result.treatment.visitors
    ));
    lines.push(format!(
        "   z = {:.4} | critical = ±{:.4} at {} | p = {:.4}",
        result.z_score, result.z_critical, result.confidence, result.p_value
    ));
    lines.push(format!(
        "   Result: {} {}",
        result.outcome.emoji(),
        result.outcome
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{aggregate, evaluate};
    use crate::models::{
        ClickRecord, ConfidenceLevel, GroupSample, StandardErrorMethod, TestOutcome,
    };
    use chrono::Utc;

    fn create_test_result() -> ZTestResult {
        evaluate(
            &GroupSample::new(5000, 400),
            &GroupSample::new(5000, 420),
            ConfidenceLevel::NINETY_FIVE,
            StandardErrorMethod::ControlOnly,
        )
        .unwrap()
    }

    fn create_test_report() -> Report {
        let records = vec![
            ClickRecord::new("Mobile", 3),
            ClickRecord::new("Mobile", 2),
            ClickRecord::new("Desktop", 5),
        ];

        Report {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                tool_version: "1.0.0".to_string(),
                data_source: Some("clicks.csv".to_string()),
                rows_processed: 4,
                rows_skipped: 1,
            },
            device_totals: Some(aggregate(&records)),
            warnings: vec![RowWarning {
                line: 5,
                message: "invalid Clicks value 'x'".to_string(),
            }],
            test: create_test_result(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# A/B Test Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Total Clicks by Device"));
        assert!(markdown.contains("| Mobile | 5 | 50.0% |"));
        assert!(markdown.contains("| **Total** | **10** | |"));
        assert!(markdown.contains("Total Clicks by Device\nDesktop | "));
        assert!(markdown.contains("## Skipped Rows"));
        assert!(markdown.contains("Line 5: invalid Clicks value 'x'"));
        assert!(markdown.contains("## Hypothesis Test"));
        assert!(markdown.contains("**Result:** ⚪ Indeterminate"));
    }

    #[test]
    fn test_chart_can_be_disabled() {
        let report = create_test_report();
        let settings = ReportConfig {
            include_chart: false,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &settings);

        assert!(markdown.contains("| Desktop | 5 | 50.0% |"));
        assert!(!markdown.contains("```text"));
    }

    #[test]
    fn test_report_without_dataset() {
        let mut report = create_test_report();
        report.device_totals = None;
        report.warnings.clear();
        report.metadata.data_source = None;

        let markdown = generate_markdown_report(&report, &ReportConfig::default());
        assert!(!markdown.contains("## Total Clicks by Device"));
        assert!(!markdown.contains("**Dataset:**"));
        assert!(markdown.contains("## Hypothesis Test"));
    }

    #[test]
    fn test_warnings_are_capped() {
        let warnings: Vec<RowWarning> = (0..25)
            .map(|i| RowWarning {
                line: i + 2,
                message: "bad row".to_string(),
            })
            .collect();

        let section = generate_warnings_section(&warnings);
        assert_eq!(section.matches("bad row").count(), MAX_LISTED_WARNINGS);
        assert!(section.contains("and 5 more"));
    }

    #[test]
    fn test_generate_test_section() {
        let section = generate_test_section(&create_test_result());

        assert!(section.contains("| Control | 5000 | 400 | 8.0000% |"));
        assert!(section.contains("| Treatment | 5000 | 420 | 8.4000% |"));
        assert!(section.contains("| z-score | 1.04"));
        assert!(section.contains("| Critical z | ±1.9600 |"));
        assert!(section.contains("control rate only"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"device_totals\""));
        assert!(json.contains("\"Mobile\": 5"));
        assert!(json.contains("\"outcome\": \"indeterminate\""));
        assert!(json.contains("\"method\": \"control\""));

        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.test.outcome, TestOutcome::Indeterminate);
    }

    #[test]
    fn test_terminal_summary() {
        let summary = terminal_summary(&create_test_result());
        assert!(summary.contains("Control:   8.0000% (400/5000)"));
        assert!(summary.contains("Result: ⚪ Indeterminate"));
    }
}
