//! Risk management module
//!
//! Kelly criterion sizing, trade state and bankroll limits

mod analysis;
mod kelly;
mod limits;
mod sizing;
mod state;
mod types;

pub use analysis::{argmax, kelly_fraction, shannon_entropy, std_dev, BatchStats};
pub use kelly::{KellyCriterion, STATE_CACHE_KEY};
pub use limits::{bankroll_drawdown, check_halt, total_return, HaltReason};
pub use sizing::{
    clamp_stake, create_sizer, raw_stake, AdaptiveSizer, DynamicSizer, FixedSizer, PositionSizer,
    SizingContext,
};
pub use state::{profit_factor, trade_drawdowns, KellyState, PerformanceMetrics, TradeRecord};
pub use types::{KellyError, KellyMetrics};
