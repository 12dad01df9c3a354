//! Trade log and derived performance

use super::KellyMetrics;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A settled bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub bet_size: Decimal,
    /// Whether the bet won
    pub outcome: bool,
    /// Realized profit (negative for losses)
    pub profit: Decimal,
    /// Analysis the bet was sized from
    pub metrics: KellyMetrics,
}

/// Aggregate performance over the trade log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_profit: Decimal,
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
}

/// Strategy state persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyState {
    pub bankroll: Decimal,
    /// Highest bankroll seen
    #[serde(default)]
    pub peak_bankroll: Decimal,
    pub trades: Vec<TradeRecord>,
    pub performance: PerformanceMetrics,
}

impl KellyState {
    /// Fresh state with the given starting capital
    pub fn new(initial_bankroll: Decimal) -> Self {
        Self {
            bankroll: initial_bankroll,
            peak_bankroll: initial_bankroll,
            trades: vec![],
            performance: PerformanceMetrics::default(),
        }
    }

    /// Append a trade and update bankroll and performance
    pub fn record_trade(&mut self, trade: TradeRecord, risk_free_rate: f64) {
        self.bankroll = accumulate(self.bankroll, trade.profit, "bankroll");
        self.peak_bankroll = self.peak_bankroll.max(self.bankroll);

        let perf = &mut self.performance;
        perf.total_trades += 1;
        perf.total_profit = accumulate(perf.total_profit, trade.profit, "total_profit");
        if trade.profit > Decimal::ZERO {
            perf.winning_trades += 1;
        } else if trade.profit < Decimal::ZERO {
            perf.losing_trades += 1;
        }

        self.trades.push(trade);
        self.refresh_derived(risk_free_rate);
    }

    /// Recompute every aggregate from the trade log
    ///
    /// Used after restoring a cached blob so the aggregates cannot drift
    /// from the log they summarize.
    pub fn recompute(&mut self, risk_free_rate: f64) {
        let perf = &mut self.performance;
        perf.total_trades = self.trades.len();
        perf.winning_trades = self
            .trades
            .iter()
            .filter(|t| t.profit > Decimal::ZERO)
            .count();
        perf.losing_trades = self
            .trades
            .iter()
            .filter(|t| t.profit < Decimal::ZERO)
            .count();
        perf.total_profit = self
            .trades
            .iter()
            .fold(Decimal::ZERO, |acc, t| accumulate(acc, t.profit, "total_profit"));
        self.peak_bankroll = self.peak_bankroll.max(self.bankroll);
        self.refresh_derived(risk_free_rate);
    }

    fn refresh_derived(&mut self, risk_free_rate: f64) {
        let profits: Vec<f64> = self.trades.iter().map(|t| to_f64(t.profit)).collect();
        let (max_drawdown, current_drawdown) = trade_drawdowns(&profits);

        let perf = &mut self.performance;
        perf.win_rate = if perf.total_trades == 0 {
            0.0
        } else {
            perf.winning_trades as f64 / perf.total_trades as f64
        };
        perf.profit_factor = profit_factor(&profits);
        perf.max_drawdown = max_drawdown;
        perf.current_drawdown = current_drawdown;
        perf.sharpe_ratio = trade_sharpe(&self.trades, risk_free_rate);
    }
}

/// Add `delta`, saturating at the Decimal range on overflow
fn accumulate(total: Decimal, delta: Decimal, field: &'static str) -> Decimal {
    total.checked_add(delta).unwrap_or_else(|| {
        tracing::warn!(field, %total, %delta, "Decimal overflow, saturating");
        total.saturating_add(delta)
    })
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    f64::try_from(value).unwrap_or(0.0)
}

/// Gross profit over absolute gross loss, 0 when nothing was lost
pub fn profit_factor(profits: &[f64]) -> f64 {
    let gross_profit: f64 = profits.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = profits.iter().filter(|p| **p < 0.0).sum::<f64>().abs();
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else {
        0.0
    }
}

/// Worst and latest relative drop from the best single-trade profit
pub fn trade_drawdowns(profits: &[f64]) -> (f64, f64) {
    let mut peak = 0.0_f64;
    let mut max_drawdown = 0.0_f64;
    let mut current = 0.0;

    for &profit in profits {
        peak = peak.max(profit);
        current = if peak > 0.0 {
            (peak - profit) / peak
        } else {
            0.0
        };
        max_drawdown = max_drawdown.max(current);
    }

    (max_drawdown, current)
}

/// Sharpe ratio of per-trade returns (profit / stake)
fn trade_sharpe(trades: &[TradeRecord], risk_free_rate: f64) -> f64 {
    let returns: Vec<f64> = trades
        .iter()
        .filter(|t| t.bet_size > Decimal::ZERO)
        .filter_map(|t| match t.profit.checked_div(t.bet_size) {
            Some(ret) => Some(to_f64(ret)),
            None => {
                tracing::warn!(
                    trade_id = %t.id,
                    bet_size = %t.bet_size,
                    profit = %t.profit,
                    "Trade return out of range, excluded from Sharpe ratio"
                );
                None
            }
        })
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let std = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 {
        return 0.0;
    }
    (mean - risk_free_rate) / std
}
