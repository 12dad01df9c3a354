//! Batch statistics over categorical predictions

use super::KellyError;

/// Stabilizes entropy for zero probabilities
const ENTROPY_EPSILON: f64 = 1e-10;

/// Per-batch statistics feeding the Kelly calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchStats {
    /// Share of examples whose top class matches the label
    pub win_prob: f64,
    /// Mean implied decimal odds, `1 / max(prediction)`
    pub odds: f64,
    /// Mean Shannon entropy of the predictions
    pub uncertainty: f64,
    /// Population std-dev of per-example top probability
    pub volatility: f64,
    /// Mean top probability over correct examples, 0 if none
    pub confidence: f64,
    pub samples: usize,
}

impl BatchStats {
    /// Compute statistics from equal-length batches of probability vectors
    pub fn from_batch(predictions: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<Self, KellyError> {
        if predictions.len() != labels.len() {
            return Err(KellyError::ShapeMismatch {
                predictions: predictions.len(),
                labels: labels.len(),
            });
        }
        if predictions.is_empty() {
            return Err(KellyError::EmptyBatch);
        }

        let n = predictions.len();
        let mut wins = 0usize;
        let mut odds_sum = 0.0;
        let mut entropy_sum = 0.0;
        let mut correct_conf_sum = 0.0;
        let mut max_probs = Vec::with_capacity(n);

        for (i, (pred, label)) in predictions.iter().zip(labels).enumerate() {
            check_row(i, pred, label)?;

            let (pred_class, max_prob) = argmax(pred);
            let (label_class, _) = argmax(label);

            if pred_class == label_class {
                wins += 1;
                correct_conf_sum += max_prob;
            }
            odds_sum += 1.0 / max_prob;
            entropy_sum += shannon_entropy(pred);
            max_probs.push(max_prob);
        }

        Ok(Self {
            win_prob: wins as f64 / n as f64,
            odds: odds_sum / n as f64,
            uncertainty: entropy_sum / n as f64,
            volatility: std_dev(&max_probs),
            confidence: if wins == 0 {
                0.0
            } else {
                correct_conf_sum / wins as f64
            },
            samples: n,
        })
    }
}

fn check_row(index: usize, pred: &[f64], label: &[f64]) -> Result<(), KellyError> {
    if pred.is_empty() || label.is_empty() {
        return Err(KellyError::EmptyDistribution(index));
    }
    if pred.len() != label.len() {
        return Err(KellyError::ClassMismatch {
            index,
            prediction: pred.len(),
            label: label.len(),
        });
    }
    let valid = |v: &[f64]| v.iter().all(|p| p.is_finite() && *p >= 0.0) && v.iter().any(|p| *p > 0.0);
    if !valid(pred) || !valid(label) {
        return Err(KellyError::InvalidProbabilities(index));
    }
    Ok(())
}

/// Index and value of the largest entry; first wins on ties
pub fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
}

/// Shannon entropy in nats of a normalized, epsilon-stabilized distribution
pub fn shannon_entropy(values: &[f64]) -> f64 {
    let total: f64 = values.iter().map(|v| v + ENTROPY_EPSILON).sum();
    values
        .iter()
        .map(|v| {
            let p = (v + ENTROPY_EPSILON) / total;
            -p * p.ln()
        })
        .sum()
}

/// Population standard deviation, 0 for fewer than two values
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Raw Kelly fraction `(b·p − q) / b` with `b = odds − 1`, floored at zero
pub fn kelly_fraction(win_prob: f64, odds: f64) -> f64 {
    let b = odds - 1.0;
    if b <= 0.0 {
        return 0.0;
    }
    let q = 1.0 - win_prob;
    ((b * win_prob - q) / b).max(0.0)
}
