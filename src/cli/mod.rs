//! CLI interface for premarket-scanner
//!
//! Provides subcommands for:
//! - `run`: Live scanning
//! - `capture`: Bar capture only
//! - `backtest`: Replay captured bars through the tiers
//! - `config`: Show the effective configuration

mod backtest;
mod capture;
mod run;

pub use backtest::BacktestArgs;
pub use capture::CaptureArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "premarket-scanner")]
#[command(about = "Four-tier pre-market equities scanner")]
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
    /// Stream the feed and run the tiers
    Run(RunArgs),
    /// Record bars to Parquet (no scanning)
    Capture(CaptureArgs),
    /// Run backtest on captured bars
    Backtest(BacktestArgs),
    /// Print the validated configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backtest_args() {
        let cli = Cli::parse_from([
            "premarket-scanner",
            "--config",
            "scanner.toml",
            "backtest",
            "--data-dir",
            "/tmp/bars",
            "--start",
            "2024-01-02T09:00:00Z",
        ]);
        assert_eq!(cli.config, "scanner.toml");
        match cli.command {
            Commands::Backtest(args) => {
                assert_eq!(args.data_dir.to_str(), Some("/tmp/bars"));
                assert!(args.start.is_some());
                assert!(args.end.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_capture_output() {
        let cli = Cli::parse_from(["premarket-scanner", "capture", "-o", "./bars"]);
        assert!(matches!(cli.command, Commands::Capture(CaptureArgs { output: Some(_) })));
    }
}
