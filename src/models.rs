//! Data models for the A/B test checker.
//!
//! This module contains the core data structures used throughout
//! the application: click records, experiment samples, test outcomes
//! and the report written at the end of a run.

use crate::analysis::normal::inverse_normal_cdf;
use crate::error::StatsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One row of the click dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickRecord {
    /// Device category, e.g. "Mobile", "Desktop", "Tablet".
    pub device: String,
    /// Number of clicks recorded on this row.
    pub clicks: u64,
}

impl ClickRecord {
    pub fn new(device: impl Into<String>, clicks: u64) -> Self {
        Self {
            device: device.into(),
            clicks,
        }
    }
}

/// Total clicks per device category, sorted by device name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTotals(BTreeMap<String, u64>);

impl DeviceTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add clicks to a device, creating the entry if needed.
    pub fn add(&mut self, device: &str, clicks: u64) {
        let total = self.0.entry(device.to_string()).or_insert(0);
        *total = total.saturating_add(clicks);
    }

    pub fn get(&self, device: &str) -> Option<u64> {
        self.0.get(device).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(device, clicks)` pairs in device-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(device, clicks)| (device.as_str(), *clicks))
    }
}

impl FromIterator<(String, u64)> for DeviceTotals {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut totals = DeviceTotals::new();
        for (device, clicks) in iter {
            totals.add(&device, clicks);
        }
        totals
    }
}

/// Visitors and conversions for one arm of the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSample {
    pub visitors: u64,
    pub conversions: u64,
}

impl GroupSample {
    pub fn new(visitors: u64, conversions: u64) -> Self {
        Self {
            visitors,
            conversions,
        }
    }

    /// Check that the sample is usable: at least one visitor and no more
    /// conversions than visitors. `group` names the arm in the error.
    pub fn validate(&self, group: &str) -> Result<(), StatsError> {
        if self.visitors == 0 {
            return Err(StatsError::invalid_sample(
                group,
                "visitor count must be positive",
            ));
        }
        if self.conversions > self.visitors {
            return Err(StatsError::invalid_sample(
                group,
                format!(
                    "conversions ({}) exceed visitors ({})",
                    self.conversions, self.visitors
                ),
            ));
        }
        Ok(())
    }

    /// Observed conversion rate. Callers must ensure `visitors > 0`.
    pub fn rate(&self) -> f64 {
        self.conversions as f64 / self.visitors as f64
    }
}

/// Two-tailed confidence level, expressed as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    pub const NINETY: ConfidenceLevel = ConfidenceLevel(90.0);
    pub const NINETY_FIVE: ConfidenceLevel = ConfidenceLevel(95.0);
    pub const NINETY_NINE: ConfidenceLevel = ConfidenceLevel(99.0);

    /// The levels offered by default.
    pub const STANDARD: [ConfidenceLevel; 3] = [Self::NINETY, Self::NINETY_FIVE, Self::NINETY_NINE];

    /// Any percentage strictly between 0 and 100 is accepted.
    pub fn new(percent: f64) -> Result<Self, StatsError> {
        if percent.is_finite() && percent > 0.0 && percent < 100.0 {
            Ok(Self(percent))
        } else {
            Err(StatsError::InvalidConfidence(percent))
        }
    }

    pub fn percent(&self) -> f64 {
        self.0
    }

    /// Significance level `alpha = 1 - confidence / 100`.
    pub fn alpha(&self) -> f64 {
        1.0 - self.0 / 100.0
    }

    /// Two-tailed critical z-value, `Φ⁻¹(1 - alpha / 2)`.
    pub fn z_critical(&self) -> f64 {
        inverse_normal_cdf(1.0 - self.alpha() / 2.0)
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self::NINETY_FIVE
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = StatsError;

    fn try_from(percent: f64) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<ConfidenceLevel> for f64 {
    fn from(level: ConfidenceLevel) -> Self {
        level.0
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// How the standard error of the rate difference is estimated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StandardErrorMethod {
    /// `sqrt(p_c (1 - p_c) / n_c)` using the control rate only (default)
    #[default]
    #[serde(rename = "control")]
    #[value(name = "control")]
    ControlOnly,
    /// `sqrt(p (1 - p) (1/n_c + 1/n_t))` with the pooled rate `p`
    Pooled,
}

impl fmt::Display for StandardErrorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandardErrorMethod::ControlOnly => write!(f, "control rate only"),
            StandardErrorMethod::Pooled => write!(f, "pooled rate"),
        }
    }
}

/// Result of a proportion test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    TreatmentBetter,
    ControlBetter,
    Indeterminate,
}

impl TestOutcome {
    pub fn is_significant(&self) -> bool {
        !matches!(self, TestOutcome::Indeterminate)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TestOutcome::TreatmentBetter => "🟢",
            TestOutcome::ControlBetter => "🔴",
            TestOutcome::Indeterminate => "⚪",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::TreatmentBetter => write!(f, "Experiment Group is Better"),
            TestOutcome::ControlBetter => write!(f, "Control Group is Better"),
            TestOutcome::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// Full breakdown of a single z-test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZTestResult {
    pub control: GroupSample,
    pub treatment: GroupSample,
    pub confidence: ConfidenceLevel,
    pub method: StandardErrorMethod,
    pub control_rate: f64,
    pub treatment_rate: f64,
    /// `treatment_rate - control_rate`.
    pub difference: f64,
    /// Difference relative to the control rate; `None` when the control rate is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_lift: Option<f64>,
    pub standard_error: f64,
    pub z_score: f64,
    pub z_critical: f64,
    /// Two-tailed p-value of the z-score.
    pub p_value: f64,
    pub outcome: TestOutcome,
}

/// A dataset row that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    /// 1-based line number in the file, header included.
    pub line: usize,
    pub message: String,
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    /// Path of the click dataset, if one was loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    pub rows_processed: usize,
    pub rows_skipped: usize,
}

/// The complete report of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Clicks per device; `None` when no dataset was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_totals: Option<DeviceTotals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RowWarning>,
    pub test: ZTestResult,
}
