//! abztest - A/B test significance checker
//!
//! The statistics core is [`analysis::aggregate`] (clicks per device) and
//! [`analysis::run_test`] / [`analysis::evaluate`] (two-sample proportion
//! z-test). The remaining modules provide the CLI around them.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod report;

pub use analysis::{aggregate, evaluate, run_test};
pub use error::{DatasetError, StatsError};
pub use models::{ClickRecord, ConfidenceLevel, DeviceTotals, GroupSample, TestOutcome};
