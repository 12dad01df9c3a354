//! Optional validators for timestamps, factors and uncertainty bounds
//!
//! Not part of the default chain. Use the functions directly, or register
//! the rule wrappers with [`PredictionValidator::add_validation_rule`].
//!
//! [`PredictionValidator::add_validation_rule`]: super::PredictionValidator::add_validation_rule

use super::rules::ValidationRule;
use super::types::{Factor, PredictionInput, PredictionOutput, RuleOutcome, UncertaintyBounds};
use chrono::{DateTime, Utc};

const AUXILIARY_PRIORITY: u32 = 5;

/// Timestamp (epoch millis) must be finite and not in the future
pub fn validate_timestamp(timestamp_ms: f64, now: DateTime<Utc>) -> RuleOutcome {
    let mut errors = vec![];

    if !timestamp_ms.is_finite() {
        errors.push(format!("Timestamp must be a finite number, got {timestamp_ms}"));
    } else if timestamp_ms > now.timestamp_millis() as f64 {
        errors.push(format!("Timestamp {timestamp_ms} cannot be in the future"));
    }

    RuleOutcome::from_messages(errors, vec![])
}

/// Every factor needs a name and finite weight/impact
pub fn validate_factors(factors: &[Factor]) -> RuleOutcome {
    let mut errors = vec![];

    for (i, factor) in factors.iter().enumerate() {
        if factor.name.trim().is_empty() {
            errors.push(format!("Factor at index {i} is missing a name"));
        }
        if !factor.weight.is_finite() {
            errors.push(format!(
                "Factor '{}' has invalid weight: {}",
                factor.name, factor.weight
            ));
        }
        if !factor.impact.is_finite() {
            errors.push(format!(
                "Factor '{}' has invalid impact: {}",
                factor.name, factor.impact
            ));
        }
    }

    RuleOutcome::from_messages(errors, vec![])
}

/// Bounds must be finite, ordered, and contain the point prediction
pub fn validate_uncertainty_bounds(bounds: &UncertaintyBounds, predicted: f64) -> RuleOutcome {
    let UncertaintyBounds { lower, upper } = *bounds;

    if !lower.is_finite() || !upper.is_finite() {
        return RuleOutcome::from_messages(
            vec![format!(
                "Uncertainty bounds must be finite numbers, got [{lower}, {upper}]"
            )],
            vec![],
        );
    }
    if lower > upper {
        return RuleOutcome::from_messages(
            vec![format!(
                "Uncertainty lower bound {lower} exceeds upper bound {upper}"
            )],
            vec![],
        );
    }
    if !(lower..=upper).contains(&predicted) {
        return RuleOutcome::from_messages(
            vec![format!(
                "Predicted value {predicted} lies outside uncertainty bounds [{lower}, {upper}]"
            )],
            vec![],
        );
    }

    RuleOutcome::pass()
}

/// Checks `output.timestamp` when present
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampRule;

impl ValidationRule for TimestampRule {
    fn name(&self) -> &str {
        "timestampValidation"
    }

    fn priority(&self) -> u32 {
        AUXILIARY_PRIORITY
    }

    fn validate(
        &self,
        _input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        Ok(match output.timestamp {
            Some(ts) => validate_timestamp(ts, Utc::now()),
            None => RuleOutcome::pass(),
        })
    }
}

/// Checks `output.factors` when present
#[derive(Debug, Clone, Copy, Default)]
pub struct FactorRule;

impl ValidationRule for FactorRule {
    fn name(&self) -> &str {
        "factorValidation"
    }

    fn priority(&self) -> u32 {
        AUXILIARY_PRIORITY
    }

    fn validate(
        &self,
        _input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        Ok(match &output.factors {
            Some(factors) => validate_factors(factors),
            None => RuleOutcome::pass(),
        })
    }
}

/// Checks `output.uncertainty` against the predicted value when present
#[derive(Debug, Clone, Copy, Default)]
pub struct UncertaintyRule;

impl ValidationRule for UncertaintyRule {
    fn name(&self) -> &str {
        "uncertaintyValidation"
    }

    fn priority(&self) -> u32 {
        AUXILIARY_PRIORITY
    }

    fn validate(
        &self,
        _input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        Ok(match &output.uncertainty {
            Some(bounds) => validate_uncertainty_bounds(bounds, output.predicted_value),
            None => RuleOutcome::pass(),
        })
    }
}
