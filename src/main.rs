use clap::Parser;
use premarket_scanner::cli::{Cli, Commands};
use premarket_scanner::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal before anything is scheduled
    let config = Config::load(&cli.config)
        .map_err(|e| anyhow::anyhow!("invalid configuration {}: {}", cli.config, e))?;

    let _telemetry = premarket_scanner::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting scanner");
            args.execute(&config).await?;
        }
        Commands::Capture(args) => {
            tracing::info!("Starting data capture mode");
            args.execute(&config).await?;
        }
        Commands::Backtest(args) => {
            tracing::info!("Starting backtest");
            args.execute(&config).await?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
