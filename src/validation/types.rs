//! Validation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Model input: named numeric features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

impl PredictionInput {
    /// Build an input from `(name, value)` pairs
    pub fn from_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Data quality indicators attached to a prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetadata {
    #[serde(default)]
    pub data_freshness: Option<f64>,
    #[serde(default)]
    pub signal_quality: Option<f64>,
}

/// A factor contributing to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub weight: f64,
    pub impact: f64,
}

/// Interval around a point prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBounds {
    pub lower: f64,
    pub upper: f64,
}

/// Model output under validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    /// Opaque identifier used for event correlation
    pub prediction_id: String,
    /// Predicted probability, expected within [0, 1]
    pub predicted_value: f64,
    /// Model confidence, expected within [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Option<PredictionMetadata>,
    /// Prediction time in epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub factors: Option<Vec<Factor>>,
    #[serde(default)]
    pub uncertainty: Option<UncertaintyBounds>,
}

impl PredictionOutput {
    /// Create an output with no optional fields set
    pub fn new(prediction_id: impl Into<String>, predicted_value: f64, confidence: f64) -> Self {
        Self {
            prediction_id: prediction_id.into(),
            predicted_value,
            confidence,
            metadata: None,
            timestamp: None,
            factors: None,
            uncertainty: None,
        }
    }

    /// Attach data quality metadata
    pub fn with_metadata(mut self, data_freshness: f64, signal_quality: f64) -> Self {
        self.metadata = Some(PredictionMetadata {
            data_freshness: Some(data_freshness),
            signal_quality: Some(signal_quality),
        });
        self
    }

    pub fn data_freshness(&self) -> Option<f64> {
        self.metadata.as_ref().and_then(|m| m.data_freshness)
    }

    pub fn signal_quality(&self) -> Option<f64> {
        self.metadata.as_ref().and_then(|m| m.signal_quality)
    }
}

/// Result of a single rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl RuleOutcome {
    /// A passing outcome with no messages
    pub fn pass() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    /// Build an outcome from collected messages; valid iff no errors
    pub fn from_messages(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            context: None,
        }
    }

    /// Attach a context payload
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Per-rule record retained with each validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleReport {
    pub rule: String,
    pub priority: u32,
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    /// Served from the rule cache
    pub cached: bool,
}

/// Quality snapshot of a validated prediction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub confidence: f64,
    pub data_freshness: f64,
    pub signal_quality: f64,
}

/// Aggregate result of running the rule chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: ValidationMetrics,
    /// Context payloads keyed by rule name
    pub context: BTreeMap<String, Value>,
    /// Rules that ran, in order
    pub rule_results: Vec<RuleReport>,
}

/// A retained validation
#[derive(Debug, Clone, Serialize)]
pub struct ValidationHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub input: PredictionInput,
    pub output: PredictionOutput,
    pub result: ValidationResult,
}

/// Pass/fail tally for one rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    pub passed: usize,
    pub failed: usize,
}

/// Aggregate statistics over retained history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStats {
    pub total_validations: usize,
    pub valid_predictions: usize,
    pub invalid_predictions: usize,
    /// valid / total, 0 when empty
    pub validation_rate: f64,
    /// Averages over valid predictions only
    pub average_metrics: ValidationMetrics,
    pub rule_stats: BTreeMap<String, RuleStats>,
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A rule could not be evaluated
    #[error("Validation rule '{rule}' failed: {source}")]
    RuleFailed {
        rule: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
