//! Analysis modules.
//!
//! Click aggregation for the device chart and the proportion z-test.

pub mod aggregator;
pub mod normal;
pub mod ztest;

pub use aggregator::*;
pub use ztest::{evaluate, run_test};
