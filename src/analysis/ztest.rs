//! Two-sample proportion z-test.
//!
//! The default standard error uses the control rate alone,
//! `sqrt(p_c (1 - p_c) / n_c)`, rather than a pooled estimate. Results
//! are therefore not symmetric under swapping control and treatment.
//! The pooled estimate is only used when asked for explicitly.

use crate::analysis::normal::normal_cdf;
use crate::error::StatsError;
use crate::models::{ConfidenceLevel, GroupSample, StandardErrorMethod, TestOutcome, ZTestResult};
use tracing::debug;

/// Run the test with the control-rate standard error and return only the outcome.
pub fn run_test(
    control: &GroupSample,
    treatment: &GroupSample,
    confidence: ConfidenceLevel,
) -> Result<TestOutcome, StatsError> {
    evaluate(
        control,
        treatment,
        confidence,
        StandardErrorMethod::ControlOnly,
    )
    .map(|result| result.outcome)
}

/// Run the test and return the full breakdown.
///
/// Fails with `DivisionByZero` when either arm has no visitors or when the
/// standard error is zero (control rate of exactly 0 or 1), and with
/// `InvalidSample` when an arm has more conversions than visitors.
pub fn evaluate(
    control: &GroupSample,
    treatment: &GroupSample,
    confidence: ConfidenceLevel,
    method: StandardErrorMethod,
) -> Result<ZTestResult, StatsError> {
    if control.visitors == 0 {
        return Err(StatsError::DivisionByZero(
            "control group has zero visitors".to_string(),
        ));
    }
    if treatment.visitors == 0 {
        return Err(StatsError::DivisionByZero(
            "treatment group has zero visitors".to_string(),
        ));
    }
    control.validate("control")?;
    treatment.validate("treatment")?;

    let control_rate = control.rate();
    let treatment_rate = treatment.rate();
    let standard_error = standard_error(control, treatment, method)?;

    let difference = treatment_rate - control_rate;
    let z_score = difference / standard_error;
    let z_critical = confidence.z_critical();
    let p_value = 2.0 * (1.0 - normal_cdf(z_score.abs()));
    let outcome = classify(z_score, z_critical);

    debug!(
        control_rate,
        treatment_rate,
        standard_error,
        z_score,
        z_critical,
        "z-test evaluated"
    );

    Ok(ZTestResult {
        control: *control,
        treatment: *treatment,
        confidence,
        method,
        control_rate,
        treatment_rate,
        difference,
        relative_lift: (control_rate > 0.0).then(|| difference / control_rate),
        standard_error,
        z_score,
        z_critical,
        p_value: p_value.clamp(0.0, 1.0),
        outcome,
    })
}

/// Standard error of the rate difference. Both samples must have visitors.
pub fn standard_error(
    control: &GroupSample,
    treatment: &GroupSample,
    method: StandardErrorMethod,
) -> Result<f64, StatsError> {
    let se = match method {
        StandardErrorMethod::ControlOnly => {
            let p = control.rate();
            (p * (1.0 - p) / control.visitors as f64).sqrt()
        }
        StandardErrorMethod::Pooled => {
            let n_c = control.visitors as f64;
            let n_t = treatment.visitors as f64;
            let p = (control.conversions + treatment.conversions) as f64 / (n_c + n_t);
            (p * (1.0 - p) * (1.0 / n_c + 1.0 / n_t)).sqrt()
        }
    };

    if se > 0.0 && se.is_finite() {
        Ok(se)
    } else {
        Err(StatsError::DivisionByZero(format!(
            "standard error is zero ({} estimate is 0 or 1)",
            match method {
                StandardErrorMethod::ControlOnly => "control rate",
                StandardErrorMethod::Pooled => "pooled rate",
            }
        )))
    }
}

/// Classify a z-score against a two-tailed critical value.
pub fn classify(z_score: f64, z_critical: f64) -> TestOutcome {
    if z_score > z_critical {
        TestOutcome::TreatmentBetter
    } else if z_score < -z_critical {
        TestOutcome::ControlBetter
    } else {
        TestOutcome::Indeterminate
    }
}
