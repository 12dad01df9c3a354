//! Kelly criterion integration tests

use edge_kelly::cache::{MemoryStateCache, StateCache};
use edge_kelly::config::KellyConfig;
use edge_kelly::risk::{kelly_fraction, HaltReason, KellyCriterion, KellyMetrics, STATE_CACHE_KEY};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn favourable(fraction: f64) -> KellyMetrics {
    KellyMetrics {
        fraction,
        expected_value: 0.05,
        risk_adjusted_return: 0.4,
        optimal_stake: fraction * 0.05,
        confidence: 0.8,
        uncertainty: 0.3,
        volatility: 0.1,
        sharpe_ratio: 1.0,
        max_drawdown: 0.05,
        win_rate: 0.6,
        profit_factor: 1.8,
    }
}

async fn strategy(cache: &MemoryStateCache) -> KellyCriterion {
    KellyCriterion::load(KellyConfig::default(), Arc::new(cache.clone()))
        .await
        .unwrap()
}

#[test]
fn test_kelly_fraction_even_money() {
    assert!((kelly_fraction(0.6, 2.0) - 0.2).abs() < 1e-12);
}

#[tokio::test]
async fn test_zero_expected_value_never_bets() {
    let kelly = strategy(&MemoryStateCache::new()).await;
    let metrics = KellyMetrics {
        expected_value: 0.0,
        ..favourable(0.1)
    };

    assert!(!kelly.should_place_bet(&metrics));
    assert_eq!(kelly.get_bet_size(&metrics, dec!(1000)), Decimal::ZERO);
}

#[tokio::test]
async fn test_bet_size_never_exceeds_risk_cap() {
    let kelly = strategy(&MemoryStateCache::new()).await;
    let bankrolls = [dec!(1), dec!(50), dec!(1000), dec!(250000)];
    let fractions = [0.0, 0.01, 0.05, 0.1, 0.3, 0.5];

    for bankroll in bankrolls {
        let cap = bankroll * dec!(0.05);
        for fraction in fractions {
            let size = kelly.get_bet_size(&favourable(fraction), bankroll);
            assert!(size >= Decimal::ZERO);
            assert!(size <= cap, "size {size} above cap {cap} at fraction {fraction}");
        }
    }
}

#[tokio::test]
async fn test_state_survives_restart() {
    let cache = MemoryStateCache::new();
    let first = strategy(&cache).await;

    first
        .update_state(dec!(40), true, dec!(36), favourable(0.04))
        .await;
    first
        .update_state(dec!(40), false, dec!(-40), favourable(0.04))
        .await;
    assert!(cache.get(STATE_CACHE_KEY).await.unwrap().is_some());

    let second = strategy(&cache).await;
    let state = second.state().await;
    assert_eq!(state.bankroll, dec!(996));
    assert_eq!(state.trades.len(), 2);
    assert_eq!(state.performance.winning_trades, 1);
    assert_eq!(state.performance.losing_trades, 1);
    assert!((state.performance.win_rate - 0.5).abs() < 1e-12);
}

#[tokio::test]
async fn test_analyze_then_settle() {
    let kelly = strategy(&MemoryStateCache::new()).await;
    let predictions = vec![vec![0.7, 0.3], vec![0.6, 0.4], vec![0.2, 0.8]];
    let labels = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];

    let metrics = kelly.analyze(&predictions, &labels).await.unwrap();
    assert!(metrics.fraction >= 0.01 && metrics.fraction <= 0.1);

    kelly.update_state(dec!(20), true, dec!(18), metrics).await;
    assert_eq!(kelly.bankroll().await, dec!(1018));
    assert_eq!(kelly.state().await.performance.total_trades, 1);
}

#[tokio::test]
async fn test_stop_loss_halts() {
    let kelly = strategy(&MemoryStateCache::new()).await;
    assert!(kelly.halt_reason().await.is_none());

    kelly
        .update_state(dec!(50), false, dec!(-150), favourable(0.05))
        .await;

    assert!(matches!(
        kelly.halt_reason().await,
        Some(HaltReason::StopLossHit(loss)) if (loss - 0.15).abs() < 1e-9
    ));

    kelly.reset().await;
    assert_eq!(kelly.bankroll().await, dec!(1000));
    assert!(kelly.halt_reason().await.is_none());
}
