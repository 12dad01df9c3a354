//! Validation rules
//!
//! The four default rules plus a closure-backed rule for ad-hoc checks.

use super::types::{PredictionInput, PredictionOutput, RuleOutcome};
use crate::config::ValidatorConfig;

/// Trait for validation rules
///
/// Rules run in ascending priority order; lower numbers are more fundamental.
pub trait ValidationRule: Send + Sync {
    /// Unique rule name, used for context keys and statistics
    fn name(&self) -> &str;
    /// Evaluation order (ascending)
    fn priority(&self) -> u32;
    /// Evaluate the rule
    fn validate(
        &self,
        input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome>;
    /// Key under which the outcome may be memoized; `None` disables caching
    fn cache_key(&self, _input: &PredictionInput, _output: &PredictionOutput) -> Option<String> {
        None
    }
}

/// Feature map must be non-empty and finite
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureRule;

impl ValidationRule for FeatureRule {
    fn name(&self) -> &str {
        "featureValidation"
    }

    fn priority(&self) -> u32 {
        1
    }

    fn validate(
        &self,
        input: &PredictionInput,
        _output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        if input.features.is_empty() {
            return Ok(RuleOutcome::from_messages(
                vec!["Features cannot be empty".to_string()],
                vec![],
            ));
        }

        let errors = input
            .features
            .iter()
            .filter(|(_, value)| !value.is_finite())
            .map(|(name, value)| format!("Invalid value for feature {name}: {value}"))
            .collect();

        Ok(RuleOutcome::from_messages(errors, vec![]))
    }
}

/// Predicted value must be a probability
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionRangeRule;

impl ValidationRule for PredictionRangeRule {
    fn name(&self) -> &str {
        "predictionRangeValidation"
    }

    fn priority(&self) -> u32 {
        2
    }

    fn validate(
        &self,
        _input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        let value = output.predicted_value;
        let mut errors = vec![];

        if !value.is_finite() {
            errors.push(format!("Predicted value must be a finite number, got {value}"));
        } else if !(0.0..=1.0).contains(&value) {
            errors.push(format!(
                "Predicted value {value} is out of range, must be between 0 and 1"
            ));
        }

        Ok(RuleOutcome::from_messages(errors, vec![]))
    }
}

/// Confidence must be a probability; low confidence warns
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceRule {
    pub min_confidence: f64,
}

impl ConfidenceRule {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

impl Default for ConfidenceRule {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl ValidationRule for ConfidenceRule {
    fn name(&self) -> &str {
        "confidenceValidation"
    }

    fn priority(&self) -> u32 {
        3
    }

    fn validate(
        &self,
        _input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        let confidence = output.confidence;
        let mut errors = vec![];
        let mut warnings = vec![];

        if !confidence.is_finite() {
            errors.push(format!("Confidence must be a finite number, got {confidence}"));
        } else if !(0.0..=1.0).contains(&confidence) {
            errors.push(format!(
                "Confidence {confidence} is out of range, must be between 0 and 1"
            ));
        } else if confidence < self.min_confidence {
            warnings.push(format!(
                "Confidence {confidence:.2} is below minimum threshold {:.2}",
                self.min_confidence
            ));
        }

        Ok(RuleOutcome::from_messages(errors, warnings))
    }
}

/// Data quality checks; only ever warns
#[derive(Debug, Clone, Copy)]
pub struct MetadataRule {
    pub min_data_freshness: f64,
    pub min_signal_quality: f64,
}

impl MetadataRule {
    pub fn new(min_data_freshness: f64, min_signal_quality: f64) -> Self {
        Self {
            min_data_freshness,
            min_signal_quality,
        }
    }
}

impl Default for MetadataRule {
    fn default() -> Self {
        Self::new(0.8, 0.6)
    }
}

impl ValidationRule for MetadataRule {
    fn name(&self) -> &str {
        "metadataValidation"
    }

    fn priority(&self) -> u32 {
        4
    }

    fn validate(
        &self,
        _input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        let mut warnings = vec![];

        if let Some(freshness) = output.data_freshness() {
            if freshness < self.min_data_freshness {
                warnings.push(format!(
                    "Data freshness {freshness:.2} is below threshold {:.2}",
                    self.min_data_freshness
                ));
            }
        }
        if let Some(quality) = output.signal_quality() {
            if quality < self.min_signal_quality {
                warnings.push(format!(
                    "Signal quality {quality:.2} is below threshold {:.2}",
                    self.min_signal_quality
                ));
            }
        }

        Ok(RuleOutcome::from_messages(vec![], warnings))
    }
}

/// The default rule chain for a validator configuration
pub fn default_rules(config: &ValidatorConfig) -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(FeatureRule),
        Box::new(PredictionRangeRule),
        Box::new(ConfidenceRule::new(config.min_confidence)),
        Box::new(MetadataRule::new(
            config.min_data_freshness,
            config.min_signal_quality,
        )),
    ]
}

type CheckFn =
    dyn Fn(&PredictionInput, &PredictionOutput) -> anyhow::Result<RuleOutcome> + Send + Sync;
type KeyFn = dyn Fn(&PredictionInput, &PredictionOutput) -> String + Send + Sync;

/// Rule backed by closures
pub struct FnRule {
    name: String,
    priority: u32,
    check: Box<CheckFn>,
    key: Option<Box<KeyFn>>,
}

impl FnRule {
    /// Create a rule from a check function
    pub fn new<F>(name: impl Into<String>, priority: u32, check: F) -> Self
    where
        F: Fn(&PredictionInput, &PredictionOutput) -> anyhow::Result<RuleOutcome>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            priority,
            check: Box::new(check),
            key: None,
        }
    }

    /// Memoize outcomes under the key produced by `key`
    pub fn with_cache_key<K>(mut self, key: K) -> Self
    where
        K: Fn(&PredictionInput, &PredictionOutput) -> String + Send + Sync + 'static,
    {
        self.key = Some(Box::new(key));
        self
    }
}

impl std::fmt::Debug for FnRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("cached", &self.key.is_some())
            .finish()
    }
}

impl ValidationRule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn validate(
        &self,
        input: &PredictionInput,
        output: &PredictionOutput,
    ) -> anyhow::Result<RuleOutcome> {
        (self.check)(input, output)
    }

    fn cache_key(&self, input: &PredictionInput, output: &PredictionOutput) -> Option<String> {
        self.key.as_ref().map(|key| key(input, output))
    }
}
