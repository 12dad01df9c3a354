//! CLI interface for edge-kelly
//!
//! Provides subcommands for:
//! - `validate`: Run the validation rule chain over a prediction
//! - `analyze`: Size a bet from a batch of predictions and labels
//! - `config`: Show the effective configuration

mod analyze;
mod validate;

pub use analyze::AnalyzeArgs;
pub use validate::ValidateArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "edge-kelly")]
#[command(about = "Prediction validation and Kelly-criterion bet sizing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a prediction read from a JSON file
    Validate(ValidateArgs),
    /// Analyze a prediction batch and size a bet
    Analyze(AnalyzeArgs),
    /// Show configuration
    Config,
}
