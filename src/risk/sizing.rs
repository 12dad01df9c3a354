//! Position sizing implementations
//!
//! Position sizers rescale a risk-adjusted Kelly fraction according to the
//! configured method. Stake sizing turns a fraction into an amount of
//! bankroll.

use rust_decimal::Decimal;

use super::KellyMetrics;
use crate::config::{BankrollConfig, BankrollMethod, PositionSizingConfig, PositionSizingMethod};

/// Historical and batch inputs available to a position sizer
#[derive(Debug, Clone, Copy, Default)]
pub struct SizingContext {
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Batch volatility of top probabilities
    pub volatility: f64,
    /// Sharpe ratio of past trades
    pub sharpe_ratio: f64,
}

/// Trait for position sizing implementations
pub trait PositionSizer: Send + Sync {
    /// Rescale a fraction of bankroll
    fn scale(&self, fraction: f64, context: &SizingContext) -> f64;

    /// Get the sizing mode name
    fn mode_name(&self) -> &'static str;
}

/// Ignores the Kelly fraction and bets a fixed share
#[derive(Debug, Clone)]
pub struct FixedSizer {
    pub base_size: f64,
}

impl PositionSizer for FixedSizer {
    fn scale(&self, _fraction: f64, _context: &SizingContext) -> f64 {
        self.base_size
    }

    fn mode_name(&self) -> &'static str {
        "fixed"
    }
}

/// Leans in when winning more than half the time, out otherwise
#[derive(Debug, Clone, Default)]
pub struct DynamicSizer;

impl PositionSizer for DynamicSizer {
    fn scale(&self, fraction: f64, context: &SizingContext) -> f64 {
        fraction * (1.0 + context.win_rate - 0.5)
    }

    fn mode_name(&self) -> &'static str {
        "dynamic"
    }
}

/// Blends edge quality, stability and risk-adjusted return
#[derive(Debug, Clone, Default)]
pub struct AdaptiveSizer;

impl AdaptiveSizer {
    /// Mean of `win_rate * profit_factor`, `1 / (1 + volatility)` and `max(0, sharpe)`
    pub fn multiplier(context: &SizingContext) -> f64 {
        let edge = context.win_rate * context.profit_factor;
        let stability = 1.0 / (1.0 + context.volatility);
        let reward = context.sharpe_ratio.max(0.0);
        (edge + stability + reward) / 3.0
    }
}

impl PositionSizer for AdaptiveSizer {
    fn scale(&self, fraction: f64, context: &SizingContext) -> f64 {
        fraction * Self::multiplier(context)
    }

    fn mode_name(&self) -> &'static str {
        "adaptive"
    }
}

/// Create a position sizer based on configuration
pub fn create_sizer(config: &PositionSizingConfig) -> Box<dyn PositionSizer> {
    match config.method {
        PositionSizingMethod::Fixed => Box::new(FixedSizer {
            base_size: config.base_size,
        }),
        PositionSizingMethod::Dynamic => Box::new(DynamicSizer),
        PositionSizingMethod::Adaptive => Box::new(AdaptiveSizer),
    }
}

pub(crate) fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// Stake before risk caps, per bankroll management method
pub fn raw_stake(
    bankroll: Decimal,
    metrics: &KellyMetrics,
    bankroll_config: &BankrollConfig,
    sizing: &PositionSizingConfig,
) -> Decimal {
    match bankroll_config.method {
        BankrollMethod::Fixed => bankroll * to_decimal(sizing.base_size),
        BankrollMethod::Progressive => {
            bankroll * to_decimal(metrics.fraction * (1.0 + metrics.win_rate))
        }
        BankrollMethod::Adaptive => {
            let mut scale = metrics.fraction
                * metrics.confidence
                * (1.0 - metrics.uncertainty)
                * (1.0 - metrics.volatility);
            if metrics.sharpe_ratio > 0.0 {
                scale *= 1.0 + metrics.sharpe_ratio;
            }
            bankroll * to_decimal(scale)
        }
        BankrollMethod::Proportional => bankroll * to_decimal(metrics.fraction),
    }
}

/// Apply the per-trade risk cap, then the position size band
pub fn clamp_stake(
    stake: Decimal,
    bankroll: Decimal,
    bankroll_config: &BankrollConfig,
    sizing: &PositionSizingConfig,
) -> Decimal {
    let risk_cap = bankroll * bankroll_config.max_risk_per_trade;
    let lower = bankroll * to_decimal(sizing.min_size);
    let upper = bankroll * to_decimal(sizing.max_size);

    stake.min(risk_cap).max(lower).min(upper)
}
