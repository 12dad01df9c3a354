//! Bankroll limits and halt conditions

use super::state::{to_f64, KellyState};
use crate::config::KellyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reason for halting new bets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HaltReason {
    /// Cumulative return reached the profit target
    ProfitTargetReached(f64),
    /// Cumulative loss reached the stop loss
    StopLossHit(f64),
    /// Bankroll fell too far below its peak
    MaxDrawdownReached(f64),
}

/// Cumulative return relative to the starting bankroll
pub fn total_return(state: &KellyState, initial_bankroll: Decimal) -> f64 {
    if initial_bankroll <= Decimal::ZERO {
        return 0.0;
    }
    relative_change(state.bankroll, initial_bankroll)
}

/// Bankroll drawdown from its peak
pub fn bankroll_drawdown(state: &KellyState) -> f64 {
    if state.peak_bankroll <= Decimal::ZERO {
        return 0.0;
    }
    -relative_change(state.bankroll, state.peak_bankroll)
}

/// `(value - base) / base`, in f64 when the Decimal result is out of range
fn relative_change(value: Decimal, base: Decimal) -> f64 {
    match value.checked_sub(base).and_then(|d| d.checked_div(base)) {
        Some(change) => to_f64(change),
        None => (to_f64(value) - to_f64(base)) / to_f64(base),
    }
}

/// Check whether betting should stop
pub fn check_halt(state: &KellyState, config: &KellyConfig) -> Option<HaltReason> {
    let ret = total_return(state, config.bankroll_management.initial_size);
    if ret >= config.profit_target {
        return Some(HaltReason::ProfitTargetReached(ret));
    }
    if -ret >= config.stop_loss {
        return Some(HaltReason::StopLossHit(-ret));
    }

    let drawdown = bankroll_drawdown(state);
    if drawdown > config.bankroll_management.max_drawdown {
        return Some(HaltReason::MaxDrawdownReached(drawdown));
    }

    None
}
