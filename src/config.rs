//! Configuration types for edge-kelly

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub kelly: KellyConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A value that must be a fraction lies outside [0, 1]
    #[error("{field} must be within [0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: f64 },
    /// Position sizing bounds are inconsistent
    #[error("position sizing requires min_size <= base_size <= max_size ({min} / {base} / {max})")]
    SizingBounds { min: f64, base: f64, max: f64 },
    /// Minimum position exceeds the per-trade risk cap
    #[error("position_sizing.min_size {min} exceeds bankroll_management.max_risk_per_trade {cap}")]
    MinSizeAboveRiskCap { min: f64, cap: Decimal },
    /// Starting bankroll must be positive
    #[error("bankroll_management.initial_size must be positive, got {0}")]
    NonPositiveBankroll(Decimal),
    /// History capacity of zero
    #[error("validator.history_capacity must be at least 1")]
    EmptyHistory,
}

/// Prediction validator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidatorConfig {
    /// Confidence below this yields a warning
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Data freshness below this yields a warning
    #[serde(default = "default_min_data_freshness")]
    pub min_data_freshness: f64,

    /// Signal quality below this yields a warning
    #[serde(default = "default_min_signal_quality")]
    pub min_signal_quality: f64,

    /// Lifetime of a memoized rule result (seconds)
    #[serde(default = "default_rule_cache_ttl_secs")]
    pub rule_cache_ttl_secs: u64,

    /// Number of validations retained for statistics
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_min_confidence() -> f64 {
    0.7
}
fn default_min_data_freshness() -> f64 {
    0.8
}
fn default_min_signal_quality() -> f64 {
    0.6
}
fn default_rule_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}
fn default_history_capacity() -> usize {
    1000
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            min_data_freshness: default_min_data_freshness(),
            min_signal_quality: default_min_signal_quality(),
            rule_cache_ttl_secs: default_rule_cache_ttl_secs(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl ValidatorConfig {
    /// Check the thresholds are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("validator.min_confidence", self.min_confidence)?;
        check_fraction("validator.min_data_freshness", self.min_data_freshness)?;
        check_fraction("validator.min_signal_quality", self.min_signal_quality)?;
        if self.history_capacity == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        Ok(())
    }
}

/// How the Kelly fraction is rescaled into a position size
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PositionSizingMethod {
    /// Always use `base_size`
    Fixed,
    /// Scale by recent win rate
    Dynamic,
    /// Scale by a blend of win rate, volatility and Sharpe ratio
    #[default]
    Adaptive,
}

/// How a bet fraction is turned into a stake against the bankroll
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BankrollMethod {
    /// Fixed share of bankroll
    Fixed,
    /// Grows with win rate
    Progressive,
    /// Scaled by confidence, uncertainty, volatility and Sharpe ratio
    #[default]
    Adaptive,
    /// Plain `bankroll * fraction`
    Proportional,
}

/// Position sizing bounds (fractions of bankroll)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionSizingConfig {
    #[serde(default)]
    pub method: PositionSizingMethod,
    #[serde(default = "default_base_size")]
    pub base_size: f64,
    #[serde(default = "default_max_size")]
    pub max_size: f64,
    #[serde(default = "default_min_size")]
    pub min_size: f64,
}

fn default_base_size() -> f64 {
    0.02
}
fn default_max_size() -> f64 {
    0.1
}
fn default_min_size() -> f64 {
    0.01
}

impl Default for PositionSizingConfig {
    fn default() -> Self {
        Self {
            method: PositionSizingMethod::Adaptive,
            base_size: default_base_size(),
            max_size: default_max_size(),
            min_size: default_min_size(),
        }
    }
}

/// Bankroll management configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BankrollConfig {
    #[serde(default)]
    pub method: BankrollMethod,
    /// Starting capital
    #[serde(default = "default_initial_size")]
    pub initial_size: Decimal,
    /// Hard cap on a single stake as a share of bankroll
    #[serde(default = "default_max_risk_per_trade")]
    pub max_risk_per_trade: Decimal,
    #[serde(default = "default_bankroll_max_drawdown")]
    pub max_drawdown: f64,
}

fn default_initial_size() -> Decimal {
    Decimal::new(1000, 0)
}
fn default_max_risk_per_trade() -> Decimal {
    Decimal::new(5, 2) // 0.05 = 5%
}
fn default_bankroll_max_drawdown() -> f64 {
    0.2
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            method: BankrollMethod::Adaptive,
            initial_size: default_initial_size(),
            max_risk_per_trade: default_max_risk_per_trade(),
            max_drawdown: default_bankroll_max_drawdown(),
        }
    }
}

/// Kelly criterion strategy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KellyConfig {
    /// Ceiling on the raw Kelly fraction
    #[serde(default = "default_max_fraction")]
    pub max_fraction: f64,
    #[serde(default = "default_kelly_min_confidence")]
    pub min_confidence: f64,
    /// Maximum acceptable mean prediction entropy
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: f64,
    #[serde(default = "default_volatility_threshold")]
    pub volatility_threshold: f64,
    #[serde(default = "default_drawdown_limit")]
    pub drawdown_limit: f64,
    #[serde(default = "default_profit_target")]
    pub profit_target: f64,
    #[serde(default = "default_stop_loss")]
    pub stop_loss: f64,
    /// Historical win rate required before betting
    #[serde(default = "default_min_win_rate")]
    pub min_win_rate: f64,
    /// Historical profit factor required before betting
    #[serde(default = "default_min_profit_factor")]
    pub min_profit_factor: f64,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Lifetime of the persisted state blob (seconds)
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
    #[serde(default)]
    pub position_sizing: PositionSizingConfig,
    #[serde(default)]
    pub bankroll_management: BankrollConfig,
}

fn default_max_fraction() -> f64 {
    0.5
}
fn default_kelly_min_confidence() -> f64 {
    0.6
}
fn default_risk_tolerance() -> f64 {
    0.7
}
fn default_volatility_threshold() -> f64 {
    0.2
}
fn default_drawdown_limit() -> f64 {
    0.2
}
fn default_profit_target() -> f64 {
    0.5
}
fn default_stop_loss() -> f64 {
    0.1
}
fn default_min_win_rate() -> f64 {
    0.4
}
fn default_min_profit_factor() -> f64 {
    1.2
}
fn default_risk_free_rate() -> f64 {
    0.02
}
fn default_state_ttl_secs() -> u64 {
    3600 // 1 hour
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            max_fraction: default_max_fraction(),
            min_confidence: default_kelly_min_confidence(),
            risk_tolerance: default_risk_tolerance(),
            volatility_threshold: default_volatility_threshold(),
            drawdown_limit: default_drawdown_limit(),
            profit_target: default_profit_target(),
            stop_loss: default_stop_loss(),
            min_win_rate: default_min_win_rate(),
            min_profit_factor: default_min_profit_factor(),
            risk_free_rate: default_risk_free_rate(),
            state_ttl_secs: default_state_ttl_secs(),
            position_sizing: PositionSizingConfig::default(),
            bankroll_management: BankrollConfig::default(),
        }
    }
}

impl KellyConfig {
    /// Check the configuration is internally consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("kelly.max_fraction", self.max_fraction)?;
        check_fraction("kelly.min_confidence", self.min_confidence)?;
        check_fraction("kelly.drawdown_limit", self.drawdown_limit)?;
        check_fraction("kelly.min_win_rate", self.min_win_rate)?;
        check_fraction(
            "kelly.bankroll_management.max_drawdown",
            self.bankroll_management.max_drawdown,
        )?;

        let sizing = &self.position_sizing;
        check_fraction("kelly.position_sizing.min_size", sizing.min_size)?;
        check_fraction("kelly.position_sizing.max_size", sizing.max_size)?;
        if !(sizing.min_size <= sizing.base_size && sizing.base_size <= sizing.max_size) {
            return Err(ConfigError::SizingBounds {
                min: sizing.min_size,
                base: sizing.base_size,
                max: sizing.max_size,
            });
        }

        let bankroll = &self.bankroll_management;
        if bankroll.initial_size <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveBankroll(bankroll.initial_size));
        }
        let min_size = Decimal::try_from(sizing.min_size).unwrap_or(Decimal::MAX);
        if min_size > bankroll.max_risk_per_trade {
            return Err(ConfigError::MinSizeAboveRiskCap {
                min: sizing.min_size,
                cap: bankroll.max_risk_per_trade,
            });
        }

        Ok(())
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { field, value })
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port; metrics are not exported when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable output
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validator.validate()?;
        config.kelly.validate()?;
        Ok(config)
    }
}
