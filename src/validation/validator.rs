//! Prediction validator
//!
//! Runs the rule chain, memoizes cacheable rule outcomes, keeps a bounded
//! history and reports aggregate statistics.

use super::rules::{default_rules, ValidationRule};
use super::types::{
    PredictionInput, PredictionOutput, RuleOutcome, RuleReport, RuleStats, ValidationError,
    ValidationHistoryEntry, ValidationMetrics, ValidationResult, ValidationStats,
};
use crate::cache::ExpiringCache;
use crate::config::{ConfigError, ValidatorConfig};
use crate::monitor::{
    ErrorCategory, ErrorContext, ErrorReporter, EventBus, Severity, TracingErrorReporter,
    TracingEventBus,
};
use crate::telemetry::{increment_counter, record_latency, CounterMetric, LatencyMetric};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Event emitted after every completed validation
pub const VALIDATED_EVENT: &str = "prediction:validated";

/// A failing rule at or above this priority ends the chain
const EARLY_EXIT_PRIORITY: u32 = 3;

const COMPONENT: &str = "PredictionValidator";

/// Rule-based prediction validator
pub struct PredictionValidator {
    config: ValidatorConfig,
    rules: Vec<Box<dyn ValidationRule>>,
    cache: ExpiringCache<String, RuleOutcome>,
    history: VecDeque<ValidationHistoryEntry>,
    events: Arc<dyn EventBus>,
    reporter: Arc<dyn ErrorReporter>,
}

impl PredictionValidator {
    /// Create a validator with the default rule chain
    pub fn new(
        config: ValidatorConfig,
        events: Arc<dyn EventBus>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let rules = default_rules(&config);
        let history = VecDeque::with_capacity(config.history_capacity);

        Ok(Self {
            config,
            rules,
            cache: ExpiringCache::new(),
            history,
            events,
            reporter,
        })
    }

    /// Default configuration with log-only collaborators
    pub fn with_defaults() -> Self {
        Self {
            rules: default_rules(&ValidatorConfig::default()),
            config: ValidatorConfig::default(),
            cache: ExpiringCache::new(),
            history: VecDeque::new(),
            events: Arc::new(TracingEventBus),
            reporter: Arc::new(TracingErrorReporter),
        }
    }

    /// Register a rule, keeping the chain ordered by priority
    ///
    /// Rules with equal priority keep their insertion order.
    pub fn add_validation_rule(&mut self, rule: Box<dyn ValidationRule>) {
        tracing::debug!(rule = rule.name(), priority = rule.priority(), "Adding validation rule");
        self.rules.push(rule);
        self.rules.sort_by_key(|r| r.priority());
    }

    /// Remove every rule with the given name
    pub fn remove_validation_rule(&mut self, name: &str) {
        let before = self.rules.len();
        self.rules.retain(|r| r.name() != name);
        tracing::debug!(
            rule = name,
            removed = before - self.rules.len(),
            "Removed validation rule"
        );
    }

    /// Names of the registered rules in evaluation order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate a prediction against the rule chain
    pub fn validate_prediction(
        &mut self,
        input: &PredictionInput,
        output: &PredictionOutput,
    ) -> Result<ValidationResult, ValidationError> {
        self.validate_prediction_at(input, output, Instant::now())
    }

    /// Validate as of `now`, which decides rule-cache freshness
    pub fn validate_prediction_at(
        &mut self,
        input: &PredictionInput,
        output: &PredictionOutput,
        now: Instant,
    ) -> Result<ValidationResult, ValidationError> {
        let started = Instant::now();
        let ttl = Duration::from_secs(self.config.rule_cache_ttl_secs);

        let mut errors = vec![];
        let mut warnings = vec![];
        let mut context = BTreeMap::new();
        let mut rule_results = vec![];

        for rule in &self.rules {
            let cache_key = rule
                .cache_key(input, output)
                .map(|key| format!("{}:{}", rule.name(), key));

            let cached = cache_key
                .as_ref()
                .and_then(|key| self.cache.get_at(key, now));
            let from_cache = cached.is_some();

            let outcome = match cached {
                Some(outcome) => {
                    increment_counter(CounterMetric::RuleCacheHits);
                    outcome
                }
                None => {
                    let outcome = match rule.validate(input, output) {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            let error = ValidationError::RuleFailed {
                                rule: rule.name().to_string(),
                                source: e.into(),
                            };
                            self.report(&error, input, output, &context);
                            return Err(error);
                        }
                    };
                    if let Some(key) = cache_key {
                        self.cache.insert_at(key, outcome.clone(), ttl, now);
                    }
                    outcome
                }
            };

            rule_results.push(RuleReport {
                rule: rule.name().to_string(),
                priority: rule.priority(),
                is_valid: outcome.is_valid,
                error_count: outcome.errors.len(),
                warning_count: outcome.warnings.len(),
                cached: from_cache,
            });

            errors.extend(outcome.errors);
            warnings.extend(outcome.warnings);
            if let Some(payload) = outcome.context {
                context.insert(rule.name().to_string(), payload);
            }

            if !outcome.is_valid && rule.priority() >= EARLY_EXIT_PRIORITY {
                tracing::debug!(rule = rule.name(), "Stopping rule chain on failure");
                break;
            }
        }

        let result = ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            metrics: ValidationMetrics {
                confidence: output.confidence,
                data_freshness: output.data_freshness().unwrap_or(1.0),
                signal_quality: output.signal_quality().unwrap_or(1.0),
            },
            context,
            rule_results,
        };

        self.record(input, output, &result);

        self.events.emit(
            VALIDATED_EVENT,
            json!({
                "predictionId": output.prediction_id,
                "isValid": result.is_valid,
                "errors": result.errors,
                "warnings": result.warnings,
                "metrics": result.metrics,
                "context": result.context,
            }),
        );

        increment_counter(CounterMetric::Validations);
        if !result.is_valid {
            increment_counter(CounterMetric::InvalidPredictions);
        }
        record_latency(LatencyMetric::Validation, started.elapsed());
        tracing::debug!(
            prediction_id = %output.prediction_id,
            is_valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Prediction validated"
        );

        Ok(result)
    }

    fn record(&mut self, input: &PredictionInput, output: &PredictionOutput, result: &ValidationResult) {
        self.history.push_back(ValidationHistoryEntry {
            timestamp: Utc::now(),
            input: input.clone(),
            output: output.clone(),
            result: result.clone(),
        });
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }
    }

    fn report(
        &self,
        error: &ValidationError,
        input: &PredictionInput,
        output: &PredictionOutput,
        context: &BTreeMap<String, Value>,
    ) {
        increment_counter(CounterMetric::RuleErrors);
        let descriptor = ErrorContext {
            code: "VALIDATION_ERROR".to_string(),
            message: format!("Error validating prediction {}", output.prediction_id),
            category: ErrorCategory::Validation,
            severity: Severity::High,
            timestamp: Utc::now(),
            component: COMPONENT.to_string(),
            details: json!({
                "input": input,
                "output": output,
                "context": context,
            }),
        };
        self.reporter.report_error(error, &descriptor);
    }

    /// Aggregate statistics over the retained history
    pub fn get_validation_stats(&self) -> ValidationStats {
        let total = self.history.len();
        let valid: Vec<&ValidationHistoryEntry> =
            self.history.iter().filter(|e| e.result.is_valid).collect();

        let mut rule_stats: BTreeMap<String, RuleStats> = self
            .rules
            .iter()
            .map(|r| (r.name().to_string(), RuleStats::default()))
            .collect();
        for entry in &self.history {
            for report in &entry.result.rule_results {
                let stats = rule_stats.entry(report.rule.clone()).or_default();
                if report.is_valid {
                    stats.passed += 1;
                } else {
                    stats.failed += 1;
                }
            }
        }

        let average_metrics = if valid.is_empty() {
            ValidationMetrics::default()
        } else {
            let n = valid.len() as f64;
            ValidationMetrics {
                confidence: valid.iter().map(|e| e.result.metrics.confidence).sum::<f64>() / n,
                data_freshness: valid
                    .iter()
                    .map(|e| e.result.metrics.data_freshness)
                    .sum::<f64>()
                    / n,
                signal_quality: valid
                    .iter()
                    .map(|e| e.result.metrics.signal_quality)
                    .sum::<f64>()
                    / n,
            }
        };

        ValidationStats {
            total_validations: total,
            valid_predictions: valid.len(),
            invalid_predictions: total - valid.len(),
            validation_rate: if total == 0 {
                0.0
            } else {
                valid.len() as f64 / total as f64
            },
            average_metrics,
            rule_stats,
        }
    }

    /// Retained validations, oldest first
    pub fn history(&self) -> impl Iterator<Item = &ValidationHistoryEntry> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Drop every memoized rule outcome
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for PredictionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionValidator")
            .field("config", &self.config)
            .field("rules", &self.rule_names())
            .field("cached_outcomes", &self.cache.len())
            .field("history", &self.history.len())
            .finish()
    }
}
