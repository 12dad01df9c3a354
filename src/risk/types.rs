//! Risk management types

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kelly strategy errors
#[derive(Debug, Error, PartialEq)]
pub enum KellyError {
    /// Strategy configuration is inconsistent
    #[error("Invalid Kelly configuration: {0}")]
    Config(#[from] ConfigError),
    /// No examples to analyze
    #[error("Prediction batch is empty")]
    EmptyBatch,
    /// Predictions and labels differ in length
    #[error("Batch shape mismatch: {predictions} predictions vs {labels} labels")]
    ShapeMismatch { predictions: usize, labels: usize },
    /// A probability vector has no entries
    #[error("Empty probability vector at index {0}")]
    EmptyDistribution(usize),
    /// Prediction and label vectors differ in class count
    #[error("Class count mismatch at index {index}: prediction has {prediction}, label has {label}")]
    ClassMismatch {
        index: usize,
        prediction: usize,
        label: usize,
    },
    /// Probability vector with negative, non-finite or all-zero entries
    #[error("Invalid probability vector at index {0}")]
    InvalidProbabilities(usize),
}

/// Sizing recommendation produced by one analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KellyMetrics {
    /// Adjusted bet fraction
    pub fraction: f64,
    pub expected_value: f64,
    pub risk_adjusted_return: f64,
    pub optimal_stake: f64,
    /// Mean top probability over correctly classified examples
    pub confidence: f64,
    /// Mean prediction entropy (nats)
    pub uncertainty: f64,
    /// Std-dev of top probabilities
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
}
