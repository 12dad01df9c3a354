//! Kelly criterion bet sizing
//!
//! Sizes bets from a batch of categorical predictions and their labels,
//! tempered by the running performance of past bets.

use super::analysis::{kelly_fraction, BatchStats};
use super::limits::{check_halt, HaltReason};
use super::sizing::{clamp_stake, create_sizer, raw_stake, PositionSizer, SizingContext};
use super::state::{to_f64, KellyState, PerformanceMetrics, TradeRecord};
use super::{KellyError, KellyMetrics};
use crate::cache::StateCache;
use crate::config::KellyConfig;
use crate::monitor::{ErrorCategory, ErrorContext, ErrorReporter, Severity, TracingErrorReporter};
use crate::telemetry::{
    increment_counter, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

/// Cache key under which strategy state is persisted
pub const STATE_CACHE_KEY: &str = "kelly_criterion_state";

const COMPONENT: &str = "KellyCriterion";

/// Kelly criterion strategy with persistent trade state
pub struct KellyCriterion {
    config: KellyConfig,
    sizer: Box<dyn PositionSizer>,
    state: Arc<RwLock<KellyState>>,
    cache: Arc<dyn StateCache>,
    reporter: Arc<dyn ErrorReporter>,
    ready: watch::Receiver<bool>,
}

impl KellyCriterion {
    /// Create a strategy and start restoring cached state in the background
    ///
    /// Must be called within a tokio runtime. Await [`ready`](Self::ready)
    /// before relying on restored state.
    pub fn new(config: KellyConfig, cache: Arc<dyn StateCache>) -> Result<Self, KellyError> {
        Self::with_reporter(config, cache, Arc::new(TracingErrorReporter))
    }

    /// Like [`new`](Self::new), sending analysis and persistence failures to `reporter`
    pub fn with_reporter(
        config: KellyConfig,
        cache: Arc<dyn StateCache>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, KellyError> {
        config.validate()?;

        let state = Arc::new(RwLock::new(KellyState::new(
            config.bankroll_management.initial_size,
        )));
        let (ready_tx, ready_rx) = watch::channel(false);

        let restore_state = state.clone();
        let restore_cache = cache.clone();
        let restore_reporter = reporter.clone();
        let risk_free_rate = config.risk_free_rate;
        tokio::spawn(async move {
            restore(restore_cache, restore_reporter, restore_state, risk_free_rate).await;
            let _ = ready_tx.send(true);
        });

        Ok(Self {
            sizer: create_sizer(&config.position_sizing),
            config,
            state,
            cache,
            reporter,
            ready: ready_rx,
        })
    }

    /// Create a strategy and wait for the cache restore to finish
    pub async fn load(config: KellyConfig, cache: Arc<dyn StateCache>) -> Result<Self, KellyError> {
        let strategy = Self::new(config, cache)?;
        strategy.ready().await;
        Ok(strategy)
    }

    /// Resolves once the restore attempt has completed, successfully or not
    pub async fn ready(&self) {
        let mut rx = self.ready.clone();
        // Err only if the restore task panicked; state is still usable
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Whether the restore attempt has completed
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// Analyze a batch of predictions against their labels
    pub async fn analyze(
        &self,
        predictions: &[Vec<f64>],
        labels: &[Vec<f64>],
    ) -> Result<KellyMetrics, KellyError> {
        let started = Instant::now();

        let batch = match BatchStats::from_batch(predictions, labels) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "Kelly analysis failed");
                report(
                    self.reporter.as_ref(),
                    &e,
                    ErrorDescriptor {
                        code: "KELLY_ANALYSIS_ERROR",
                        message: "Error analyzing prediction batch",
                        category: ErrorCategory::Strategy,
                        severity: Severity::Low,
                        details: json!({
                            "predictions": predictions.len(),
                            "labels": labels.len(),
                        }),
                    },
                );
                return Err(e);
            }
        };
        let performance = self.state.read().await.performance.clone();
        let metrics = self.metrics_for(&batch, &performance);

        set_gauge(GaugeMetric::KellyFraction, metrics.fraction);
        record_latency(LatencyMetric::KellyAnalysis, started.elapsed());
        tracing::debug!(
            samples = batch.samples,
            win_prob = batch.win_prob,
            odds = batch.odds,
            fraction = metrics.fraction,
            expected_value = metrics.expected_value,
            "Kelly analysis complete"
        );

        Ok(metrics)
    }

    /// Turn batch statistics and past performance into a recommendation
    pub fn metrics_for(&self, batch: &BatchStats, performance: &PerformanceMetrics) -> KellyMetrics {
        let raw = kelly_fraction(batch.win_prob, batch.odds).min(self.config.max_fraction);
        let fraction = self.adjust_fraction(raw, batch.volatility, performance);

        let sharpe_ratio = if batch.volatility > 0.0 {
            (fraction - self.config.risk_free_rate) / batch.volatility
        } else {
            0.0
        };

        let p = batch.win_prob;
        let expected_value = p * (batch.odds - 1.0) * fraction - (1.0 - p) * fraction;
        let risk_adjusted_return = if fraction > 0.0 {
            expected_value / fraction
        } else {
            0.0
        };

        KellyMetrics {
            fraction,
            expected_value,
            risk_adjusted_return,
            optimal_stake: fraction * expected_value,
            confidence: batch.confidence,
            uncertainty: batch.uncertainty,
            volatility: batch.volatility,
            sharpe_ratio,
            max_drawdown: performance.max_drawdown,
            win_rate: performance.win_rate,
            profit_factor: performance.profit_factor,
        }
    }

    /// Temper a raw Kelly fraction by volatility and track record, then size it
    fn adjust_fraction(&self, kelly: f64, volatility: f64, perf: &PerformanceMetrics) -> f64 {
        let mut fraction = kelly * (1.0 - volatility).max(0.0);

        if perf.max_drawdown > self.config.drawdown_limit {
            fraction *= 1.0 - perf.max_drawdown;
        }
        if perf.win_rate < 0.5 {
            fraction *= perf.win_rate;
        }

        let context = SizingContext {
            win_rate: perf.win_rate,
            profit_factor: perf.profit_factor,
            volatility,
            sharpe_ratio: perf.sharpe_ratio,
        };
        let fraction = self.sizer.scale(fraction, &context);

        let sizing = &self.config.position_sizing;
        fraction.clamp(sizing.min_size, sizing.max_size)
    }

    /// Whether every betting condition holds
    pub fn should_place_bet(&self, metrics: &KellyMetrics) -> bool {
        let config = &self.config;
        metrics.confidence >= config.min_confidence
            && metrics.expected_value > 0.0
            && metrics.risk_adjusted_return > 0.0
            && metrics.uncertainty <= config.risk_tolerance
            && metrics.volatility <= config.volatility_threshold
            && metrics.max_drawdown <= config.drawdown_limit
            && metrics.win_rate >= config.min_win_rate
            && metrics.profit_factor >= config.min_profit_factor
    }

    /// Stake for a bet, zero when the bet should not be placed
    ///
    /// Never exceeds `bankroll * max_risk_per_trade`.
    pub fn get_bet_size(&self, metrics: &KellyMetrics, bankroll: Decimal) -> Decimal {
        if bankroll <= Decimal::ZERO || !self.should_place_bet(metrics) {
            return Decimal::ZERO;
        }

        let bankroll_config = &self.config.bankroll_management;
        let sizing = &self.config.position_sizing;
        let stake = raw_stake(bankroll, metrics, bankroll_config, sizing);
        let size = clamp_stake(stake, bankroll, bankroll_config, sizing);

        tracing::debug!(
            method = ?bankroll_config.method,
            raw = %stake,
            size = %size,
            "Bet sized"
        );
        size
    }

    /// Record a settled bet and persist the new state
    pub async fn update_state(
        &self,
        bet_size: Decimal,
        outcome: bool,
        profit: Decimal,
        metrics: KellyMetrics,
    ) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.record_trade(
                TradeRecord {
                    id: Uuid::new_v4(),
                    timestamp: Utc::now(),
                    bet_size,
                    outcome,
                    profit,
                    metrics,
                },
                self.config.risk_free_rate,
            );
            state.clone()
        };

        increment_counter(CounterMetric::TradesRecorded);
        set_gauge(GaugeMetric::Bankroll, to_f64(snapshot.bankroll));
        set_gauge(GaugeMetric::WinRate, snapshot.performance.win_rate);
        set_gauge(GaugeMetric::MaxDrawdown, snapshot.performance.max_drawdown);
        tracing::info!(
            %bet_size,
            %profit,
            bankroll = %snapshot.bankroll,
            trades = snapshot.performance.total_trades,
            "Trade recorded"
        );

        self.persist(&snapshot).await;
    }

    /// Discard all trades and start over from the initial bankroll
    pub async fn reset(&self) {
        let snapshot = {
            let mut state = self.state.write().await;
            *state = KellyState::new(self.config.bankroll_management.initial_size);
            state.clone()
        };
        tracing::info!(bankroll = %snapshot.bankroll, "Kelly state reset");
        self.persist(&snapshot).await;
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> KellyState {
        self.state.read().await.clone()
    }

    pub async fn bankroll(&self) -> Decimal {
        self.state.read().await.bankroll
    }

    /// Bankroll-level reason to stop betting, if any
    pub async fn halt_reason(&self) -> Option<HaltReason> {
        let state = self.state.read().await;
        check_halt(&state, &self.config)
    }

    /// Write state to the cache; failures are logged, never returned
    async fn persist(&self, state: &KellyState) {
        let ttl = Duration::from_secs(self.config.state_ttl_secs);
        let result = match serde_json::to_value(state) {
            Ok(value) => self.cache.set(STATE_CACHE_KEY, value, ttl).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            increment_counter(CounterMetric::PersistenceFailures);
            tracing::error!(error = %e, "Failed to save Kelly state");
            report(
                self.reporter.as_ref(),
                &*e,
                ErrorDescriptor {
                    code: "STATE_SAVE_ERROR",
                    message: "Failed to save Kelly state",
                    category: ErrorCategory::Persistence,
                    severity: Severity::High,
                    details: json!({
                        "key": STATE_CACHE_KEY,
                        "bankroll": state.bankroll,
                        "trades": state.trades.len(),
                    }),
                },
            );
        }
    }
}

struct ErrorDescriptor {
    code: &'static str,
    message: &'static str,
    category: ErrorCategory,
    severity: Severity,
    details: Value,
}

fn report(
    reporter: &dyn ErrorReporter,
    error: &(dyn std::error::Error + 'static),
    descriptor: ErrorDescriptor,
) {
    let context = ErrorContext {
        code: descriptor.code.to_string(),
        message: descriptor.message.to_string(),
        category: descriptor.category,
        severity: descriptor.severity,
        timestamp: Utc::now(),
        component: COMPONENT.to_string(),
        details: descriptor.details,
    };
    reporter.report_error(error, &context);
}

fn load_failure(code: &'static str, message: &'static str) -> ErrorDescriptor {
    ErrorDescriptor {
        code,
        message,
        category: ErrorCategory::Persistence,
        severity: Severity::Medium,
        details: json!({ "key": STATE_CACHE_KEY }),
    }
}

/// Overlay cached state onto freshly seeded state
async fn restore(
    cache: Arc<dyn StateCache>,
    reporter: Arc<dyn ErrorReporter>,
    state: Arc<RwLock<KellyState>>,
    risk_free_rate: f64,
) {
    let blob = match cache.get(STATE_CACHE_KEY).await {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            tracing::debug!("No cached Kelly state");
            return;
        }
        Err(e) => {
            increment_counter(CounterMetric::PersistenceFailures);
            tracing::error!(error = %e, "Failed to load Kelly state");
            report(
                reporter.as_ref(),
                &*e,
                load_failure("STATE_LOAD_ERROR", "Failed to load Kelly state"),
            );
            return;
        }
    };

    let mut cached: KellyState = match serde_json::from_value(blob) {
        Ok(cached) => cached,
        Err(e) => {
            tracing::error!(error = %e, "Failed to decode cached Kelly state");
            report(
                reporter.as_ref(),
                &e,
                load_failure("STATE_DECODE_ERROR", "Failed to decode cached Kelly state"),
            );
            return;
        }
    };
    cached.recompute(risk_free_rate);

    let mut current = state.write().await;
    if !current.trades.is_empty() {
        tracing::warn!(
            recorded = current.trades.len(),
            "Trades recorded before restore completed, keeping in-memory state"
        );
        return;
    }
    tracing::info!(
        bankroll = %cached.bankroll,
        trades = cached.trades.len(),
        "Restored Kelly state"
    );
    *current = cached;
}

impl std::fmt::Debug for KellyCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KellyCriterion")
            .field("config", &self.config)
            .field("sizer", &self.sizer.mode_name())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStateCache;
    use crate::config::{BankrollMethod, PositionSizingMethod};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio::sync::Notify;

    struct FailingCache;

    /// Serves a fixed blob once `gate` is notified; writes are dropped
    struct GatedCache {
        blob: Value,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl StateCache for GatedCache {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<Value>> {
            self.gate.notified().await;
            Ok(Some(self.blob.clone()))
        }

        async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl StateCache for FailingCache {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<Value>> {
            anyhow::bail!("cache offline")
        }

        async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> anyhow::Result<()> {
            anyhow::bail!("cache offline")
        }
    }

    fn batch(win_prob_rows: usize, rows: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let predictions = vec![vec![0.5, 0.5]; rows];
        let labels = (0..rows)
            .map(|i| {
                if i < win_prob_rows {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect();
        (predictions, labels)
    }

    fn good_metrics() -> KellyMetrics {
        KellyMetrics {
            fraction: 0.05,
            expected_value: 0.01,
            risk_adjusted_return: 0.2,
            optimal_stake: 0.0005,
            confidence: 0.8,
            uncertainty: 0.4,
            volatility: 0.1,
            sharpe_ratio: 0.3,
            max_drawdown: 0.05,
            win_rate: 0.6,
            profit_factor: 1.5,
        }
    }

    async fn strategy(config: KellyConfig) -> KellyCriterion {
        KellyCriterion::load(config, Arc::new(MemoryStateCache::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_state() {
        let kelly = strategy(KellyConfig::default()).await;
        let state = kelly.state().await;

        assert!(kelly.is_ready());
        assert_eq!(state.bankroll, dec!(1000));
        assert!(state.trades.is_empty());
        assert_eq!(state.performance, PerformanceMetrics::default());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = KellyConfig::default();
        config.position_sizing.min_size = 0.5;
        let result = KellyCriterion::new(config, Arc::new(MemoryStateCache::new()));
        assert!(matches!(result, Err(KellyError::Config(_))));
    }

    #[tokio::test]
    async fn test_analyze_fraction_within_bounds() {
        let kelly = strategy(KellyConfig::default()).await;
        let (predictions, labels) = batch(6, 10);

        let metrics = kelly.analyze(&predictions, &labels).await.unwrap();
        let sizing = &kelly.config().position_sizing;
        assert!(metrics.fraction >= sizing.min_size);
        assert!(metrics.fraction <= sizing.max_size);
        assert_eq!(metrics.volatility, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert!((metrics.uncertainty - std::f64::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn test_metrics_for_known_batch() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();

        let mut config = KellyConfig::default();
        config.position_sizing.method = PositionSizingMethod::Dynamic;
        let kelly = KellyCriterion::new(config, Arc::new(MemoryStateCache::new())).unwrap();

        let batch = BatchStats {
            win_prob: 0.6,
            odds: 2.0,
            uncertainty: 0.3,
            volatility: 0.0,
            confidence: 0.7,
            samples: 10,
        };
        let performance = PerformanceMetrics {
            win_rate: 0.5,
            profit_factor: 1.5,
            ..Default::default()
        };

        // Raw 0.2, no volatility or drawdown haircut, dynamic x1.0, capped at 0.1
        let metrics = kelly.metrics_for(&batch, &performance);
        assert!((metrics.fraction - 0.1).abs() < 1e-12);
        // 0.6 * 1 * 0.1 - 0.4 * 0.1
        assert!((metrics.expected_value - 0.02).abs() < 1e-12);
        assert!((metrics.risk_adjusted_return - 0.2).abs() < 1e-9);
        assert!((metrics.optimal_stake - 0.002).abs() < 1e-12);
        assert_eq!(metrics.win_rate, 0.5);
        assert_eq!(metrics.profit_factor, 1.5);
    }

    /// Strategy with a wide size band so adjustments are not clamped
    fn unclamped(method: PositionSizingMethod) -> KellyCriterion {
        let mut config = KellyConfig::default();
        config.position_sizing.method = method;
        config.position_sizing.min_size = 0.0;
        config.position_sizing.max_size = 1.0;
        KellyCriterion::new(config, Arc::new(MemoryStateCache::new())).unwrap()
    }

    /// Even-money batch with a raw Kelly fraction of 0.2
    fn even_money(volatility: f64) -> BatchStats {
        BatchStats {
            win_prob: 0.6,
            odds: 2.0,
            uncertainty: 0.3,
            volatility,
            confidence: 0.7,
            samples: 10,
        }
    }

    fn history(win_rate: f64, profit_factor: f64, max_drawdown: f64) -> PerformanceMetrics {
        PerformanceMetrics {
            win_rate,
            profit_factor,
            max_drawdown,
            ..Default::default()
        }
    }

    #[test]
    fn test_volatility_haircut() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let kelly = unclamped(PositionSizingMethod::Dynamic);

        // 0.2 * (1 - 0.25), dynamic x1.0 at a 50% win rate
        let metrics = kelly.metrics_for(&even_money(0.25), &history(0.5, 1.5, 0.0));
        assert!((metrics.fraction - 0.15).abs() < 1e-12);

        // Volatility above 1 floors the multiplier at zero
        let metrics = kelly.metrics_for(&even_money(1.5), &history(0.5, 1.5, 0.0));
        assert_eq!(metrics.fraction, 0.0);
    }

    #[test]
    fn test_drawdown_haircut_above_limit_only() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let kelly = unclamped(PositionSizingMethod::Dynamic);

        // 0.2 * (1 - 0.3)
        let metrics = kelly.metrics_for(&even_money(0.0), &history(0.5, 1.5, 0.3));
        assert!((metrics.fraction - 0.14).abs() < 1e-12);

        // At the 0.2 limit there is no haircut
        let metrics = kelly.metrics_for(&even_money(0.0), &history(0.5, 1.5, 0.2));
        assert!((metrics.fraction - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_win_rate_haircut_below_half() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let kelly = unclamped(PositionSizingMethod::Dynamic);

        // 0.2 * 0.4, then dynamic x(1 + 0.4 - 0.5)
        let metrics = kelly.metrics_for(&even_money(0.0), &history(0.4, 1.5, 0.0));
        assert!((metrics.fraction - 0.072).abs() < 1e-12);
    }

    #[test]
    fn test_adjustments_compose_in_order() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let kelly = unclamped(PositionSizingMethod::Dynamic);

        // 0.2 * 0.9 * 0.7 * 0.4 * 0.9
        let metrics = kelly.metrics_for(&even_money(0.1), &history(0.4, 1.5, 0.3));
        assert!((metrics.fraction - 0.04536).abs() < 1e-12);
    }

    #[test]
    fn test_adaptive_sizer_multiplier() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let kelly = unclamped(PositionSizingMethod::Adaptive);

        let performance = PerformanceMetrics {
            sharpe_ratio: 0.5,
            ..history(0.6, 2.0, 0.0)
        };
        // 0.2 * 0.75 = 0.15, then x(0.6 * 2.0 + 1 / 1.25 + 0.5) / 3
        let metrics = kelly.metrics_for(&even_money(0.25), &performance);
        assert!((metrics.fraction - 0.125).abs() < 1e-12);

        // Negative Sharpe contributes nothing
        let performance = PerformanceMetrics {
            sharpe_ratio: -1.0,
            ..history(0.6, 2.0, 0.0)
        };
        let metrics = kelly.metrics_for(&even_money(0.25), &performance);
        assert!((metrics.fraction - 0.15 * 2.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_trade_before_restore_keeps_memory_state() {
        let gate = Arc::new(Notify::new());
        let stale = KellyState::new(dec!(5000));
        let cache = GatedCache {
            blob: serde_json::to_value(&stale).unwrap(),
            gate: gate.clone(),
        };

        let kelly = KellyCriterion::new(KellyConfig::default(), Arc::new(cache)).unwrap();
        assert!(!kelly.is_ready());
        kelly
            .update_state(dec!(20), true, dec!(18), good_metrics())
            .await;

        gate.notify_one();
        kelly.ready().await;

        let state = kelly.state().await;
        assert_eq!(state.bankroll, dec!(1018));
        assert_eq!(state.trades.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_applies_when_no_trades_recorded() {
        let gate = Arc::new(Notify::new());
        let stale = KellyState::new(dec!(5000));
        let cache = GatedCache {
            blob: serde_json::to_value(&stale).unwrap(),
            gate: gate.clone(),
        };

        let kelly = KellyCriterion::new(KellyConfig::default(), Arc::new(cache)).unwrap();
        gate.notify_one();
        kelly.ready().await;

        assert_eq!(kelly.bankroll().await, dec!(5000));
    }

    #[test]
    fn test_fixed_sizing_uses_base_size() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();

        let mut config = KellyConfig::default();
        config.position_sizing.method = PositionSizingMethod::Fixed;
        let kelly = KellyCriterion::new(config, Arc::new(MemoryStateCache::new())).unwrap();

        let batch = BatchStats {
            win_prob: 0.9,
            odds: 3.0,
            uncertainty: 0.1,
            volatility: 0.05,
            confidence: 0.9,
            samples: 5,
        };
        let metrics = kelly.metrics_for(&batch, &PerformanceMetrics::default());
        assert_eq!(metrics.fraction, 0.02);
    }

    #[tokio::test]
    async fn test_analyze_error_propagates() {
        let kelly = strategy(KellyConfig::default()).await;
        let result = kelly.analyze(&[vec![0.5, 0.5]], &[]).await;
        assert!(matches!(result, Err(KellyError::ShapeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_should_place_bet() {
        let kelly = strategy(KellyConfig::default()).await;
        assert!(kelly.should_place_bet(&good_metrics()));

        let zero_ev = KellyMetrics {
            expected_value: 0.0,
            ..good_metrics()
        };
        assert!(!kelly.should_place_bet(&zero_ev));

        let low_confidence = KellyMetrics {
            confidence: 0.5,
            ..good_metrics()
        };
        assert!(!kelly.should_place_bet(&low_confidence));

        let poor_history = KellyMetrics {
            profit_factor: 1.1,
            ..good_metrics()
        };
        assert!(!kelly.should_place_bet(&poor_history));

        let volatile = KellyMetrics {
            volatility: 0.5,
            ..good_metrics()
        };
        assert!(!kelly.should_place_bet(&volatile));
    }

    #[tokio::test]
    async fn test_bet_size_zero_when_gate_fails() {
        let kelly = strategy(KellyConfig::default()).await;
        let metrics = KellyMetrics {
            win_rate: 0.3,
            ..good_metrics()
        };
        assert_eq!(kelly.get_bet_size(&metrics, dec!(1000)), dec!(0));
    }

    #[tokio::test]
    async fn test_bet_size_respects_risk_cap() {
        let mut config = KellyConfig::default();
        config.bankroll_management.method = BankrollMethod::Progressive;
        config.bankroll_management.max_risk_per_trade = dec!(0.03);
        let kelly = strategy(config).await;

        let metrics = KellyMetrics {
            fraction: 0.1,
            ..good_metrics()
        };
        // 1000 * 0.1 * 1.6 = 160, capped at 30
        assert_eq!(kelly.get_bet_size(&metrics, dec!(1000)), dec!(30));
    }

    #[tokio::test]
    async fn test_bet_size_floor() {
        let mut config = KellyConfig::default();
        config.bankroll_management.method = BankrollMethod::Adaptive;
        let kelly = strategy(config).await;

        let metrics = KellyMetrics {
            fraction: 0.01,
            uncertainty: 0.6,
            ..good_metrics()
        };
        // Tiny adaptive stake is lifted to min_size (1%)
        let size = kelly.get_bet_size(&metrics, dec!(1000));
        assert!((size - dec!(10)).abs() < dec!(0.000001));
    }

    #[tokio::test]
    async fn test_update_state_roundtrip() {
        let kelly = strategy(KellyConfig::default()).await;
        let before = kelly.state().await;

        kelly
            .update_state(dec!(25), true, dec!(22.5), good_metrics())
            .await;

        let after = kelly.state().await;
        assert_eq!(
            after.performance.total_trades,
            before.performance.total_trades + 1
        );
        assert_eq!(after.bankroll, before.bankroll + dec!(22.5));
        assert_eq!(after.trades[0].metrics, good_metrics());
    }

    #[tokio::test]
    async fn test_state_persisted_and_restored() {
        let cache = Arc::new(MemoryStateCache::new());
        let first = KellyCriterion::load(KellyConfig::default(), cache.clone())
            .await
            .unwrap();
        first
            .update_state(dec!(20), true, dec!(18), good_metrics())
            .await;
        first
            .update_state(dec!(20), false, dec!(-20), good_metrics())
            .await;

        let second = KellyCriterion::load(KellyConfig::default(), cache)
            .await
            .unwrap();
        let state = second.state().await;
        assert_eq!(state.bankroll, dec!(998));
        assert_eq!(state.trades.len(), 2);
        assert_eq!(state.performance.losing_trades, 1);
    }

    #[tokio::test]
    async fn test_cache_failures_are_not_fatal() {
        let kelly = KellyCriterion::load(KellyConfig::default(), Arc::new(FailingCache))
            .await
            .unwrap();

        kelly
            .update_state(dec!(10), true, dec!(9), good_metrics())
            .await;
        assert_eq!(kelly.bankroll().await, dec!(1009));
    }

    #[derive(Default)]
    struct RecordingReporter {
        reports: std::sync::Mutex<Vec<(String, ErrorCategory, Severity)>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report_error(&self, _error: &(dyn std::error::Error + 'static), context: &ErrorContext) {
            assert_eq!(context.component, "KellyCriterion");
            self.reports.lock().unwrap().push((
                context.code.clone(),
                context.category,
                context.severity,
            ));
        }
    }

    #[tokio::test]
    async fn test_failures_are_reported() {
        let reporter = Arc::new(RecordingReporter::default());
        let kelly = KellyCriterion::with_reporter(
            KellyConfig::default(),
            Arc::new(FailingCache),
            reporter.clone(),
        )
        .unwrap();
        kelly.ready().await;

        kelly
            .update_state(dec!(10), true, dec!(9), good_metrics())
            .await;
        assert!(kelly.analyze(&[], &[]).await.is_err());

        let reports = reporter.reports.lock().unwrap().clone();
        assert_eq!(
            reports,
            vec![
                (
                    "STATE_LOAD_ERROR".to_string(),
                    ErrorCategory::Persistence,
                    Severity::Medium
                ),
                (
                    "STATE_SAVE_ERROR".to_string(),
                    ErrorCategory::Persistence,
                    Severity::High
                ),
                (
                    "KELLY_ANALYSIS_ERROR".to_string(),
                    ErrorCategory::Strategy,
                    Severity::Low
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_reset() {
        let kelly = strategy(KellyConfig::default()).await;
        kelly
            .update_state(dec!(10), false, dec!(-10), good_metrics())
            .await;
        kelly.reset().await;

        let state = kelly.state().await;
        assert_eq!(state.bankroll, dec!(1000));
        assert!(state.trades.is_empty());
    }

    #[tokio::test]
    async fn test_halt_reason() {
        let kelly = strategy(KellyConfig::default()).await;
        assert_eq!(kelly.halt_reason().await, None);

        kelly
            .update_state(dec!(50), false, dec!(-150), good_metrics())
            .await;
        assert!(matches!(
            kelly.halt_reason().await,
            Some(HaltReason::StopLossHit(_))
        ));
    }
}
