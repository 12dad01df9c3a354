//! Prediction validation module
//!
//! Prioritized rule chain over model inputs and outputs

mod auxiliary;
mod rules;
mod types;
mod validator;

pub use auxiliary::{
    validate_factors, validate_timestamp, validate_uncertainty_bounds, FactorRule, TimestampRule,
    UncertaintyRule,
};
pub use rules::{
    default_rules, ConfidenceRule, FeatureRule, FnRule, MetadataRule, PredictionRangeRule,
    ValidationRule,
};
pub use types::{
    Factor, PredictionInput, PredictionMetadata, PredictionOutput, RuleOutcome, RuleReport,
    RuleStats, UncertaintyBounds, ValidationError, ValidationHistoryEntry, ValidationMetrics,
    ValidationResult, ValidationStats,
};
pub use validator::{PredictionValidator, VALIDATED_EVENT};
