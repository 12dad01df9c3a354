//! Prediction validator integration tests

use edge_kelly::config::ValidatorConfig;
use edge_kelly::monitor::{ChannelEventBus, TracingErrorReporter};
use edge_kelly::validation::{
    FnRule, PredictionInput, PredictionOutput, PredictionValidator, RuleOutcome,
    VALIDATED_EVENT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn features() -> PredictionInput {
    PredictionInput::from_features([("home_form", 0.62), ("away_form", 0.41)])
}

#[test]
fn test_history_keeps_latest_thousand() {
    let mut validator = PredictionValidator::with_defaults();
    let input = features();

    for i in 0..1500 {
        let output = PredictionOutput::new(format!("p{i}"), 0.55, 0.9);
        validator.validate_prediction(&input, &output).unwrap();
    }

    let ids: Vec<&str> = validator
        .history()
        .map(|e| e.output.prediction_id.as_str())
        .collect();
    assert_eq!(ids.len(), 1000);
    assert_eq!(ids[0], "p500");
    assert_eq!(ids[999], "p1499");
    assert_eq!(validator.get_validation_stats().total_validations, 1000);
}

#[test]
fn test_empty_features_are_invalid() {
    let mut validator = PredictionValidator::with_defaults();
    let output = PredictionOutput::new("p", 0.55, 0.9);

    let result = validator
        .validate_prediction(&PredictionInput::default(), &output)
        .unwrap();

    assert!(!result.is_valid);
    assert!(result.errors.contains(&"Features cannot be empty".to_string()));
}

#[test]
fn test_low_confidence_only_warns() {
    let mut validator = PredictionValidator::with_defaults();
    let output = PredictionOutput::new("p", 0.55, 0.5);

    let result = validator.validate_prediction(&features(), &output).unwrap();

    assert!(result.is_valid);
    assert!(result
        .warnings
        .contains(&"Confidence 0.50 is below minimum threshold 0.70".to_string()));
}

#[test]
fn test_out_of_range_prediction_is_invalid() {
    let mut validator = PredictionValidator::with_defaults();
    let output = PredictionOutput::new("p", 1.5, 0.9);

    let result = validator.validate_prediction(&features(), &output).unwrap();

    assert!(!result.is_valid);
    assert!(result.errors.iter().any(|e| e.contains("out of range")));
}

#[test]
fn test_cached_rule_is_idempotent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let rule = FnRule::new("marketCheck", 5, move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(RuleOutcome::from_messages(vec![], vec!["thin market".into()]))
    })
    .with_cache_key(|_, output| output.prediction_id.clone());

    let mut validator = PredictionValidator::with_defaults();
    validator.add_validation_rule(Box::new(rule));
    let output = PredictionOutput::new("match-1", 0.55, 0.9);

    let first = validator.validate_prediction(&features(), &output).unwrap();
    let second = validator.validate_prediction(&features(), &output).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.is_valid, second.is_valid);
    assert_eq!(first.errors, second.errors);
    assert_eq!(first.warnings, second.warnings);
    let report = second.rule_results.last().unwrap();
    assert_eq!(report.rule, "marketCheck");
    assert!(report.cached);
}

#[test]
fn test_failing_rule_aborts_validation() {
    let mut validator = PredictionValidator::with_defaults();
    validator.add_validation_rule(Box::new(FnRule::new("oddsFeed", 5, |_, _| {
        anyhow::bail!("odds feed unavailable")
    })));
    let output = PredictionOutput::new("p", 0.55, 0.9);

    let err = validator.validate_prediction(&features(), &output).unwrap_err();

    assert!(err.to_string().contains("oddsFeed"));
    assert_eq!(validator.history().count(), 0);
}

#[tokio::test]
async fn test_validated_event_is_broadcast() {
    let bus = Arc::new(ChannelEventBus::new(16));
    let mut rx = bus.subscribe();
    let mut validator = PredictionValidator::new(
        ValidatorConfig::default(),
        bus.clone(),
        Arc::new(TracingErrorReporter),
    )
    .unwrap();

    let output = PredictionOutput::new("match-7", 0.55, 0.9);
    validator.validate_prediction(&features(), &output).unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.name, VALIDATED_EVENT);
    assert_eq!(event.payload["predictionId"], "match-7");
    assert_eq!(event.payload["isValid"], true);
}

#[test]
fn test_stats_average_valid_only() {
    let mut validator = PredictionValidator::with_defaults();
    let good = PredictionOutput::new("a", 0.55, 0.8).with_metadata(0.9, 0.7);
    let bad = PredictionOutput::new("b", 1.5, 0.2).with_metadata(0.1, 0.1);

    validator.validate_prediction(&features(), &good).unwrap();
    validator.validate_prediction(&features(), &bad).unwrap();

    let stats = validator.get_validation_stats();
    assert_eq!(stats.valid_predictions, 1);
    assert_eq!(stats.invalid_predictions, 1);
    assert!((stats.validation_rate - 0.5).abs() < 1e-12);
    assert!((stats.average_metrics.confidence - 0.8).abs() < 1e-12);
    assert!((stats.average_metrics.data_freshness - 0.9).abs() < 1e-12);
}
