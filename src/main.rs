//! Retail Analytics - Main Entry Point

use clap::Parser;
use retail_analytics::cli::{cmd_basket, cmd_forecast, cmd_info, cmd_rfm, cmd_run, show_help, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retail_analytics=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { data, output, config }) => {
            cmd_run(&data, &output, config.as_deref())?;
        }
        Some(Commands::Rfm { data, output, exclude_guests }) => {
            cmd_rfm(&data, output.as_deref(), exclude_guests)?;
        }
        Some(Commands::Basket { data, output, min_support, min_lift, max_len, top }) => {
            cmd_basket(&data, output.as_deref(), min_support, min_lift, max_len, top)?;
        }
        Some(Commands::Forecast { data, output }) => {
            cmd_forecast(&data, output.as_deref())?;
        }
        Some(Commands::Info { data }) => {
            cmd_info(&data)?;
        }
        None => show_help(),
    }

    Ok(())
}
