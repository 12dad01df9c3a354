use clap::Parser;
use edge_kelly::cli::{Cli, Commands};
use edge_kelly::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _telemetry = edge_kelly::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Validate(args) => {
            tracing::info!(file = %args.file.display(), "Validating predictions");
            args.execute(&config.validator).await?;
        }
        Commands::Analyze(args) => {
            tracing::info!(file = %args.file.display(), "Analyzing prediction batch");
            args.execute(&config.kelly).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Validator: min_confidence={}, min_data_freshness={}, min_signal_quality={}",
                config.validator.min_confidence,
                config.validator.min_data_freshness,
                config.validator.min_signal_quality
            );
            println!(
                "  Kelly: max_fraction={}, min_win_rate={}, min_profit_factor={}",
                config.kelly.max_fraction, config.kelly.min_win_rate, config.kelly.min_profit_factor
            );
            println!(
                "  Sizing: {:?} base={} range=[{}, {}]",
                config.kelly.position_sizing.method,
                config.kelly.position_sizing.base_size,
                config.kelly.position_sizing.min_size,
                config.kelly.position_sizing.max_size
            );
            println!(
                "  Bankroll: {:?} initial={} max_risk={}%",
                config.kelly.bankroll_management.method,
                config.kelly.bankroll_management.initial_size,
                config.kelly.bankroll_management.max_risk_per_trade * rust_decimal_macros::dec!(100)
            );
        }
    }

    Ok(())
}
