//! edge-kelly: Prediction validation and Kelly-criterion bet sizing
//!
//! This library provides the core components for:
//! - A prioritized, cached rule chain that validates model predictions
//! - Batch analysis of class probabilities into win probability and odds
//! - Kelly fraction sizing with volatility, drawdown and win-rate adjustments
//! - Trade history, performance metrics and bankroll limits
//! - Pluggable state persistence, event emission and error reporting
//! - Full observability stack

pub mod cache;
pub mod cli;
pub mod config;
pub mod monitor;
pub mod risk;
pub mod telemetry;
pub mod validation;
