//! Chaos AutoML - Main Entry Point
//!
//! Chaos-driven hyperparameter search and risk prediction from the command line.

use chaos_automl::cli::{cmd_info, cmd_predict, cmd_train, Cli, Commands};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chaos_automl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => {
            cmd_train(&args)?;
        }
        Commands::Predict { models, target, features, data, output } => {
            cmd_predict(&models, &target, features.as_deref(), data.as_deref(), output.as_deref())?;
        }
        Commands::Info { data, rows } => {
            cmd_info(data.as_deref(), rows)?;
        }
    }

    Ok(())
}
