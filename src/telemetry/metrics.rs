//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Full rule chain evaluation
    Validation,
    /// Kelly batch analysis
    KellyAnalysis,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Predictions validated
    Validations,
    /// Predictions that failed validation
    InvalidPredictions,
    /// Rule outcomes served from cache
    RuleCacheHits,
    /// Rules that raised an internal error
    RuleErrors,
    /// Trades recorded into Kelly state
    TradesRecorded,
    /// State persistence failures
    PersistenceFailures,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current bankroll
    Bankroll,
    /// Historical win rate
    WinRate,
    /// Maximum drawdown over trade history
    MaxDrawdown,
    /// Latest adjusted Kelly fraction
    KellyFraction,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Validation => "edge_kelly_validation_latency_ms",
        LatencyMetric::KellyAnalysis => "edge_kelly_analysis_latency_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
    tracing::trace!(
        metric = metric_name,
        value_ms = duration.as_millis(),
        "Recording latency"
    );
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    let metric_name = match metric {
        CounterMetric::Validations => "edge_kelly_validations_total",
        CounterMetric::InvalidPredictions => "edge_kelly_invalid_predictions_total",
        CounterMetric::RuleCacheHits => "edge_kelly_rule_cache_hits_total",
        CounterMetric::RuleErrors => "edge_kelly_rule_errors_total",
        CounterMetric::TradesRecorded => "edge_kelly_trades_recorded_total",
        CounterMetric::PersistenceFailures => "edge_kelly_persistence_failures_total",
    };

    metrics::counter!(metric_name).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::Bankroll => "edge_kelly_bankroll",
        GaugeMetric::WinRate => "edge_kelly_win_rate",
        GaugeMetric::MaxDrawdown => "edge_kelly_max_drawdown",
        GaugeMetric::KellyFraction => "edge_kelly_fraction",
    };

    metrics::gauge!(metric_name).set(value);
    tracing::trace!(metric = metric_name, value = value, "Setting gauge");
}
