//! Analyze command implementation

use crate::cache::{MemoryStateCache, StateCache};
use crate::config::KellyConfig;
use crate::risk::{KellyCriterion, KellyMetrics, KellyState, STATE_CACHE_KEY};
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// JSON file holding `{"predictions": [[..]], "labels": [[..]]}`
    #[arg(long)]
    pub file: PathBuf,

    /// Bankroll to size against (defaults to the state's bankroll)
    #[arg(long)]
    pub bankroll: Option<Decimal>,

    /// Saved Kelly state (bankroll and trade history) to size against.
    /// Without it the history is empty and the win-rate gate declines every bet.
    #[arg(long)]
    pub state: Option<PathBuf>,
}

/// A batch of class-probability vectors with one-hot labels
#[derive(Debug, Deserialize)]
pub struct Batch {
    pub predictions: Vec<Vec<f64>>,
    pub labels: Vec<Vec<f64>>,
}

/// Printed analysis outcome
#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub metrics: KellyMetrics,
    pub place_bet: bool,
    pub bet_size: Decimal,
    pub bankroll: Decimal,
}

impl AnalyzeArgs {
    pub async fn execute(&self, config: &KellyConfig) -> anyhow::Result<()> {
        let content = tokio::fs::read_to_string(&self.file).await?;
        let batch: Batch = serde_json::from_str(&content)?;

        let cache = MemoryStateCache::new();
        if let Some(path) = &self.state {
            seed_state(&cache, path, config).await?;
        }

        let strategy = KellyCriterion::load(config.clone(), Arc::new(cache)).await?;
        let bankroll = match self.bankroll {
            Some(bankroll) => bankroll,
            None => strategy.bankroll().await,
        };

        let recommendation = recommend(&strategy, &batch, bankroll).await?;
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
        Ok(())
    }
}

/// Load a saved state file into the cache the strategy restores from
async fn seed_state(
    cache: &MemoryStateCache,
    path: &Path,
    config: &KellyConfig,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(path).await?;
    let state: KellyState = serde_json::from_str(&content)?;
    tracing::info!(
        trades = state.trades.len(),
        bankroll = %state.bankroll,
        "Seeding Kelly state"
    );

    let ttl = Duration::from_secs(config.state_ttl_secs);
    cache
        .set(STATE_CACHE_KEY, serde_json::to_value(&state)?, ttl)
        .await
}

async fn recommend(
    strategy: &KellyCriterion,
    batch: &Batch,
    bankroll: Decimal,
) -> anyhow::Result<Recommendation> {
    let metrics = strategy.analyze(&batch.predictions, &batch.labels).await?;
    let place_bet = strategy.should_place_bet(&metrics);
    let bet_size = strategy.get_bet_size(&metrics, bankroll);

    tracing::info!(place_bet, %bet_size, fraction = metrics.fraction, "Analysis complete");
    Ok(Recommendation {
        metrics,
        place_bet,
        bet_size,
        bankroll,
    })
}
